//! Help Dispatcher - threshold events in, help suggestions out
//!
//! Subscribes to threshold events only. The tracker already limits those to
//! one per cooldown interval per session, so each event triggers exactly one
//! generation call. Calls run concurrently so a slow answer for one session
//! never delays another; each is bounded by a timeout and falls back to a
//! canned suggestion.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::HelpConfig;
use crate::fanout::{ConsumerFilter, EventHub, Subscription};
use crate::types::{HelpSuggestion, MonitorEvent, ThresholdEvent};

use super::{
    ContextProvider, HelpError, HelpGenerator, HelpRequest, FALLBACK_SUGGESTION,
};

pub struct HelpDispatcher {
    hub: Arc<EventHub>,
    generator: Arc<dyn HelpGenerator>,
    context: Arc<dyn ContextProvider>,
    timeout: Duration,
    max_suggestions: usize,
}

impl HelpDispatcher {
    pub fn new(
        hub: Arc<EventHub>,
        generator: Arc<dyn HelpGenerator>,
        context: Arc<dyn ContextProvider>,
        config: &HelpConfig,
    ) -> Self {
        Self {
            hub,
            generator,
            context,
            timeout: Duration::from_secs(config.timeout_secs),
            max_suggestions: config.max_suggestions.max(1),
        }
    }

    /// Register on the hub. Call before the first session starts so no
    /// threshold event is missed.
    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe(ConsumerFilter::threshold_events())
    }

    /// Process threshold events until cancelled or the hub shuts down.
    pub async fn run(self, mut events: Subscription, cancel: CancellationToken) {
        info!(
            generator = self.generator.name(),
            context = self.context.name(),
            timeout_secs = self.timeout.as_secs(),
            "[HelpDispatcher] Started"
        );
        let this = Arc::new(self);
        let mut in_flight: JoinSet<()> = JoinSet::new();
        let mut handled: u64 = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[HelpDispatcher] Shutdown requested");
                    break;
                }
                event = events.recv() => {
                    match event {
                        Some(MonitorEvent::ThresholdExceeded(trigger)) => {
                            handled += 1;
                            let this = Arc::clone(&this);
                            in_flight.spawn(async move { this.respond(trigger).await });
                        }
                        Some(other) => debug!(kind = other.kind(), "[HelpDispatcher] Ignoring event"),
                        None => {
                            info!("[HelpDispatcher] Event stream closed");
                            break;
                        }
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "[HelpDispatcher] Help task failed");
                    }
                }
            }
        }

        in_flight.abort_all();
        info!(handled, "[HelpDispatcher] Stopped");
    }

    /// Generate help for one threshold event and publish it.
    pub async fn respond(&self, trigger: ThresholdEvent) {
        let suggestion = self.generate(&trigger).await;
        let delivered = self.hub.publish(MonitorEvent::HelpSuggestion(suggestion));
        debug!(session = %trigger.session_id, delivered, "[HelpDispatcher] Help published");
    }

    async fn generate(&self, trigger: &ThresholdEvent) -> HelpSuggestion {
        let context = match self.context.capture(trigger.session_id).await {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!(session = %trigger.session_id, error = %e, "[HelpDispatcher] Context capture failed");
                serde_json::json!({})
            }
        };
        let request = HelpRequest {
            session_id: trigger.session_id,
            confusion_level: trigger.level,
            context,
        };

        let outcome = tokio::time::timeout(self.timeout, self.generator.generate(&request))
            .await
            .unwrap_or(Err(HelpError::Timeout(self.timeout)));

        let mut suggestions = match outcome {
            Ok(s) if !s.is_empty() => s,
            Ok(_) => vec![FALLBACK_SUGGESTION.to_string()],
            Err(e) => {
                warn!(session = %trigger.session_id, error = %e, "[HelpDispatcher] Using fallback suggestion");
                vec![FALLBACK_SUGGESTION.to_string()]
            }
        };
        suggestions.truncate(self.max_suggestions);

        HelpSuggestion {
            session_id: trigger.session_id,
            suggestions,
            confusion_level: trigger.level,
            context: request.context,
            timestamp: trigger.timestamp,
        }
    }
}
