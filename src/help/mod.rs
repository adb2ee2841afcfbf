//! Help generation - turns threshold events into suggestions
//!
//! ## Architecture
//!
//! - **ContextProvider**: captures what the learner is looking at. The real
//!   collaborator (screen capture + vision model) lives outside this crate;
//!   [`StaticContextProvider`] stands in for it.
//! - **HelpGenerator**: produces ranked suggestions for a confusion level and
//!   context. [`TemplateHelpGenerator`] answers from built-in templates.
//! - **HelpDispatcher**: subscribes to threshold events on the hub and
//!   publishes the answer as a `help_suggestion` event.

mod context;
mod dispatcher;
mod templates;

pub use context::{ContextProvider, StaticContextProvider};
pub use dispatcher::HelpDispatcher;
pub use templates::{ConfusionCategory, HelpRecord, HelpStatistics, TemplateHelpGenerator};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::types::SessionId;

/// Suggestion used whenever generation fails or times out.
pub const FALLBACK_SUGGESTION: &str = "Take a moment to breathe and approach this step by step.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HelpError {
    #[error("Help generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Context capture failed: {0}")]
    Context(String),

    #[error("Help generation failed: {0}")]
    Generation(String),
}

/// Input to one help-generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct HelpRequest {
    pub session_id: SessionId,
    pub confusion_level: f64,
    /// Opaque context from the [`ContextProvider`]
    pub context: serde_json::Value,
}

impl HelpRequest {
    /// `context.subject` if present, else `"general"`.
    pub fn subject(&self) -> &str {
        self.context
            .get("subject")
            .and_then(|s| s.as_str())
            .unwrap_or("general")
    }
}

/// Unified trait for help backends
#[async_trait]
pub trait HelpGenerator: Send + Sync {
    /// Ranked suggestions, best first.
    async fn generate(&self, request: &HelpRequest) -> Result<Vec<String>, HelpError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
