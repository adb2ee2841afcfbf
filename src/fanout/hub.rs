//! Broadcast hub with per-consumer drop-oldest queues
//!
//! Locking: the consumer table sits behind an `RwLock`. A publish holds the
//! read lock for its whole broadcast; unsubscribe and session close take
//! the write lock, so they wait for any in-flight broadcast and then purge
//! what it delivered. Once either returns, the affected events can no
//! longer reach the consumer.
//!
//! Closed sessions are remembered for a retention window, long enough for
//! any in-flight help task for that session to finish or time out, and
//! pruned on the next close after that.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::defaults::CLOSED_SESSION_RETENTION_SECS;
use crate::types::{MonitorEvent, SessionId};

pub type ConsumerId = u64;

/// Which events a consumer wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerFilter {
    /// Only events for this session, plus process-wide notices
    pub session: Option<SessionId>,
    /// Only `threshold_exceeded` events
    pub threshold_only: bool,
}

impl ConsumerFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn session(id: SessionId) -> Self {
        Self {
            session: Some(id),
            threshold_only: false,
        }
    }

    pub fn threshold_events() -> Self {
        Self {
            session: None,
            threshold_only: true,
        }
    }

    fn accepts(&self, event: &MonitorEvent) -> bool {
        if self.threshold_only && !matches!(event, MonitorEvent::ThresholdExceeded(_)) {
            return false;
        }
        match (self.session, event.subject_session()) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => true,
        }
    }
}

#[derive(Debug, Default)]
struct ConsumerQueue {
    events: VecDeque<MonitorEvent>,
    dropped: u64,
    closed: bool,
}

#[derive(Debug)]
struct ConsumerSlot {
    filter: ConsumerFilter,
    capacity: usize,
    queue: Mutex<ConsumerQueue>,
    notify: Notify,
}

impl ConsumerSlot {
    fn lock(&self) -> std::sync::MutexGuard<'_, ConsumerQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn deliver(&self, event: &MonitorEvent) {
        {
            let mut q = self.lock();
            if q.closed {
                return;
            }
            if q.events.len() >= self.capacity {
                q.events.pop_front();
                q.dropped += 1;
            }
            q.events.push_back(event.clone());
        }
        self.notify.notify_one();
    }

    /// Mark closed. With `purge` the queue is emptied, otherwise the
    /// consumer may still drain what was queued.
    fn close(&self, purge: bool) {
        {
            let mut q = self.lock();
            q.closed = true;
            if purge {
                q.events.clear();
            }
        }
        self.notify.notify_one();
    }
}

#[derive(Debug, Default)]
struct HubInner {
    consumers: HashMap<ConsumerId, Arc<ConsumerSlot>>,
    /// Ended sessions and when they were closed
    closed_sessions: HashMap<SessionId, Instant>,
}

/// Hub statistics for status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    pub consumers: usize,
    pub published: u64,
    pub suppressed: u64,
    pub closed_sessions: usize,
}

/// Shared broadcast point for every session and consumer.
#[derive(Debug)]
pub struct EventHub {
    inner: RwLock<HubInner>,
    capacity: usize,
    retention: Duration,
    next_id: AtomicU64,
    published: AtomicU64,
    suppressed: AtomicU64,
}

impl EventHub {
    /// Create a hub whose consumers each buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Arc<Self> {
        Self::with_retention(capacity, Duration::from_secs(CLOSED_SESSION_RETENTION_SECS))
    }

    /// Like [`new`](Self::new), keeping closed sessions suppressed for `retention`.
    pub fn with_retention(capacity: usize, retention: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(HubInner::default()),
            capacity: capacity.max(1),
            retention,
            next_id: AtomicU64::new(1),
            published: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HubInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HubInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a consumer. It sees only events published after this call.
    pub fn subscribe(self: &Arc<Self>, filter: ConsumerFilter) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(ConsumerSlot {
            filter,
            capacity: self.capacity,
            queue: Mutex::new(ConsumerQueue::default()),
            notify: Notify::new(),
        });
        self.write().consumers.insert(id, Arc::clone(&slot));
        debug!(consumer = id, ?filter, "Consumer registered");
        Subscription {
            id,
            slot,
            hub: Arc::clone(self),
        }
    }

    /// Deliver an event to every matching consumer. Never blocks on a
    /// consumer. Returns the number of consumers it was queued for.
    pub fn publish(&self, event: MonitorEvent) -> usize {
        let inner = self.read();
        if let Some(session) = event.session_id() {
            if inner.closed_sessions.contains_key(&session) {
                self.suppressed.fetch_add(1, Ordering::Relaxed);
                return 0;
            }
        }
        self.published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0;
        for slot in inner.consumers.values() {
            if slot.filter.accepts(&event) {
                slot.deliver(&event);
                delivered += 1;
            }
        }
        delivered
    }

    /// Stop all delivery for a session and purge its queued events.
    pub fn close_session(&self, session: SessionId) {
        let now = Instant::now();
        let retention = self.retention;
        let mut inner = self.write();
        let before = inner.closed_sessions.len();
        inner
            .closed_sessions
            .retain(|_, closed_at| now.saturating_duration_since(*closed_at) < retention);
        let pruned = before - inner.closed_sessions.len();
        if pruned > 0 {
            debug!(pruned, "Forgot expired closed sessions");
        }
        inner.closed_sessions.insert(session, now);
        for slot in inner.consumers.values() {
            slot.lock()
                .events
                .retain(|e| e.session_id() != Some(session));
        }
        debug!(session = %session, "Session closed on hub");
    }

    pub fn is_session_closed(&self, session: SessionId) -> bool {
        self.read().closed_sessions.contains_key(&session)
    }

    fn unsubscribe(&self, id: ConsumerId) {
        let removed = self.write().consumers.remove(&id);
        if let Some(slot) = removed {
            slot.close(true);
            debug!(consumer = id, "Consumer deregistered");
        }
    }

    /// Close every consumer. `recv` drains what is queued, then returns `None`.
    pub fn shutdown(&self) {
        let drained: Vec<_> = self.write().consumers.drain().collect();
        if !drained.is_empty() {
            warn!(consumers = drained.len(), "Closing remaining consumers");
        }
        for (_, slot) in drained {
            slot.close(false);
        }
    }

    pub fn consumer_count(&self) -> usize {
        self.read().consumers.len()
    }

    pub fn stats(&self) -> HubStats {
        let inner = self.read();
        HubStats {
            consumers: inner.consumers.len(),
            published: self.published.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            closed_sessions: inner.closed_sessions.len(),
        }
    }
}

/// A registered consumer. Dropping it deregisters.
#[derive(Debug)]
pub struct Subscription {
    id: ConsumerId,
    slot: Arc<ConsumerSlot>,
    hub: Arc<EventHub>,
}

impl Subscription {
    pub fn id(&self) -> ConsumerId {
        self.id
    }

    pub fn filter(&self) -> ConsumerFilter {
        self.slot.filter
    }

    /// Wait for the next event. `None` once the consumer is closed.
    pub async fn recv(&mut self) -> Option<MonitorEvent> {
        loop {
            {
                let mut q = self.slot.lock();
                if let Some(event) = q.events.pop_front() {
                    return Some(event);
                }
                if q.closed {
                    return None;
                }
            }
            self.slot.notify.notified().await;
        }
    }

    /// Next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<MonitorEvent> {
        self.slot.lock().events.pop_front()
    }

    /// Events currently queued.
    pub fn pending(&self) -> usize {
        self.slot.lock().events.len()
    }

    /// Events discarded because this consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.slot.lock().dropped
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }

    /// Deregister now. Equivalent to dropping.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConfusionTrend, ConfusionUpdate, ThresholdEvent};

    fn update(session: SessionId, level: f64) -> MonitorEvent {
        MonitorEvent::ConfusionUpdate(ConfusionUpdate {
            session_id: session,
            level,
            timestamp: level,
            threshold_exceeded: false,
            raw_score: level,
            trend: ConfusionTrend::Stable,
        })
    }

    fn exceeded(session: SessionId) -> MonitorEvent {
        MonitorEvent::ThresholdExceeded(ThresholdEvent {
            session_id: session,
            level: 0.9,
            timestamp: 0.0,
        })
    }

    #[test]
    fn test_no_replay_for_late_subscribers() {
        let hub = EventHub::new(8);
        let s = SessionId::new();
        hub.publish(update(s, 0.1));
        let mut sub = hub.subscribe(ConsumerFilter::all());
        assert!(sub.try_recv().is_none());
        hub.publish(update(s, 0.2));
        assert_eq!(sub.try_recv(), Some(update(s, 0.2)));
    }

    #[test]
    fn test_drop_oldest_on_overflow() {
        let hub = EventHub::new(2);
        let s = SessionId::new();
        let mut sub = hub.subscribe(ConsumerFilter::all());
        for i in 0..5 {
            hub.publish(update(s, f64::from(i) / 10.0));
        }
        assert_eq!(sub.dropped(), 3);
        assert_eq!(sub.try_recv(), Some(update(s, 0.3)));
        assert_eq!(sub.try_recv(), Some(update(s, 0.4)));
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_filters() {
        let hub = EventHub::new(8);
        let (a, b) = (SessionId::new(), SessionId::new());
        let mut only_a = hub.subscribe(ConsumerFilter::session(a));
        let mut only_thresholds = hub.subscribe(ConsumerFilter::threshold_events());

        hub.publish(update(a, 0.5));
        hub.publish(update(b, 0.5));
        hub.publish(exceeded(b));

        assert_eq!(only_a.pending(), 1);
        assert_eq!(only_thresholds.try_recv(), Some(exceeded(b)));
        assert!(only_thresholds.try_recv().is_none());
        assert_eq!(only_a.try_recv(), Some(update(a, 0.5)));
    }

    #[test]
    fn test_close_session_purges_and_suppresses() {
        let hub = EventHub::new(8);
        let (a, b) = (SessionId::new(), SessionId::new());
        let mut sub = hub.subscribe(ConsumerFilter::all());
        hub.publish(update(a, 0.1));
        hub.publish(update(b, 0.1));
        hub.close_session(a);
        assert_eq!(hub.publish(update(a, 0.2)), 0);

        assert_eq!(sub.try_recv(), Some(update(b, 0.1)));
        assert!(sub.try_recv().is_none());
        assert_eq!(hub.stats().suppressed, 1);
    }

    #[test]
    fn test_closed_sessions_are_bounded_by_retention() {
        let hub = EventHub::with_retention(8, Duration::ZERO);
        for _ in 0..10_000 {
            hub.close_session(SessionId::new());
        }
        assert_eq!(hub.stats().closed_sessions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_session_suppressed_until_retention_expires() {
        let hub = EventHub::with_retention(8, Duration::from_secs(30));
        let (old, newer) = (SessionId::new(), SessionId::new());
        let _sub = hub.subscribe(ConsumerFilter::all());
        hub.close_session(old);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(hub.publish(update(old, 0.5)), 0);

        tokio::time::advance(Duration::from_secs(2)).await;
        hub.close_session(newer);
        assert!(!hub.is_session_closed(old));
        assert!(hub.is_session_closed(newer));
        assert_eq!(hub.stats().closed_sessions, 1);
    }

    #[test]
    fn test_drop_deregisters() {
        let hub = EventHub::new(8);
        let sub = hub.subscribe(ConsumerFilter::all());
        assert_eq!(hub.consumer_count(), 1);
        drop(sub);
        assert_eq!(hub.consumer_count(), 0);
        assert_eq!(hub.publish(update(SessionId::new(), 0.1)), 0);
    }

    #[tokio::test]
    async fn test_recv_wakes_on_publish_and_ends_on_shutdown() {
        let hub = EventHub::new(8);
        let mut sub = hub.subscribe(ConsumerFilter::all());
        let s = SessionId::new();

        let publisher = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                hub.publish(update(s, 0.7));
                hub.shutdown();
            })
        };

        assert_eq!(sub.recv().await, Some(update(s, 0.7)));
        assert_eq!(sub.recv().await, None);
        publisher.await.unwrap();
    }
}
