//! Session Pipeline Module
//!
//! ## Per-Session Stages
//!
//! ```text
//! STAGE 1: Signal Conditioner   (per sample: filters + artifact flag)
//! STAGE 2: Window Aggregator    (per window: band powers or drop)
//! STAGE 3: Confusion Classifier (per window: score in [0, 1])
//! STAGE 4: Session Tracker      (smoothing, threshold, cooldown)
//! STAGE 5: Event Fan-out        (shared hub, all sessions)
//! ```
//!
//! Stages 1-4 run in one task per session ([`SessionRunner`]); the
//! [`SessionRegistry`] starts, observes and stops those tasks.

mod registry;
mod runner;
mod session;
pub mod source;

pub use registry::{RegistryError, SessionInfo, SessionRegistry};
pub use runner::{EndReason, SessionReport, SessionRunner, SessionStatus};
pub use session::{PipelineError, PipelineStats, SampleOutcome, SessionPipeline};
pub use source::{
    LineSource, ReplaySource, SampleEvent, SampleSource, SimulatedSource, SourceError, StdinSource,
};
