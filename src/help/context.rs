//! Learner-context capture

use async_trait::async_trait;
use serde_json::json;

use crate::types::SessionId;

use super::HelpError;

/// Captures the learner's current working context for a session.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn capture(&self, session: SessionId) -> Result<serde_json::Value, HelpError>;

    fn name(&self) -> &'static str;
}

/// Reports a fixed subject. Used when no screen-analysis service is wired in.
#[derive(Debug, Clone)]
pub struct StaticContextProvider {
    subject: String,
}

impl StaticContextProvider {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl ContextProvider for StaticContextProvider {
    async fn capture(&self, _session: SessionId) -> Result<serde_json::Value, HelpError> {
        Ok(json!({
            "subject": self.subject,
            "source": "static",
        }))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
