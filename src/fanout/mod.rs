//! Event Fan-out - broadcast of monitor events to registered consumers
//!
//! Each consumer owns a bounded queue. Publishing never blocks: when a
//! queue is full the oldest event is discarded and the consumer's dropped
//! counter increments, so a stalled dashboard cannot back-pressure the
//! pipeline or delay other consumers.

mod hub;

pub use hub::{ConsumerFilter, ConsumerId, EventHub, HubStats, Subscription};
