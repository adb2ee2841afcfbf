//! Monitor Configuration Module
//!
//! Provides the service configuration loaded from TOML files with
//! environment-variable overrides.
//!
//! ## Loading Order
//!
//! 1. `CONFUSION_MONITOR_CONFIG` environment variable (path to TOML file)
//! 2. `monitor_config.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! Environment overrides (`CONFUSION_THRESHOLD`, `SAMPLING_RATE`, ...) are
//! applied on top of whichever source won, then the result is validated.
//!
//! ## Usage
//!
//! The config is loaded once in `main()` and passed down explicitly:
//!
//! ```ignore
//! let config = Arc::new(MonitorConfig::load(None)?);
//! let registry = SessionRegistry::new(config.clone(), hub.clone(), classifier);
//! ```

mod monitor_config;
pub mod defaults;
pub mod validation;

pub use monitor_config::*;
