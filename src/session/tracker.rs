//! Per-session confusion state machine
//!
//! ```text
//! Idle ──first score──▶ Monitoring ──level ≥ threshold──▶ Cooldown
//!                            ▲                               │
//!                            └──────── deadline passes ──────┘
//! any ──end()──▶ Ended
//! ```
//!
//! Re-trigger policy is level-triggered: once cooldown expires, a level that
//! is still at or above the threshold fires again on the next update. The
//! tracker never reads the clock itself; callers pass `now` so the runner's
//! timer and tests share one time source.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::{defaults, DetectionConfig};
use crate::types::{
    clamp_unit, ConfusionScore, ConfusionTrend, ConfusionUpdate, SessionId, SessionPhase,
    ThresholdEvent,
};

use super::Smoother;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Session {0} has ended")]
    Ended(SessionId),
}

/// Everything one score update produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerUpdate {
    /// Clamped classifier output
    pub raw: ConfusionScore,
    /// Smoothed level after this update
    pub level: f64,
    /// `level >= threshold`, regardless of cooldown
    pub threshold_exceeded: bool,
    /// Set only when a new threshold event fired
    pub event: Option<ThresholdEvent>,
    pub trend: ConfusionTrend,
}

impl TrackerUpdate {
    pub fn to_confusion_update(&self, session_id: SessionId) -> ConfusionUpdate {
        ConfusionUpdate {
            session_id,
            level: self.level,
            timestamp: self.raw.timestamp,
            threshold_exceeded: self.threshold_exceeded,
            raw_score: self.raw.value(),
            trend: self.trend,
        }
    }
}

/// Read-only view of a tracker, published for status queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub phase: SessionPhase,
    pub level: f64,
    pub last_raw_score: Option<f64>,
    pub trend: ConfusionTrend,
    pub cooldown_active: bool,
    pub cooldown_remaining_secs: Option<f64>,
    pub updates: u64,
    pub threshold_events: u64,
    /// Window timestamp of the most recent threshold event
    pub last_event_timestamp: Option<f64>,
}

#[derive(Debug)]
pub struct SessionTracker {
    session_id: SessionId,
    phase: SessionPhase,
    smoother: Smoother,
    level: f64,
    cooldown: Duration,
    cooldown_until: Option<Instant>,
    last_event_timestamp: Option<f64>,
    history: VecDeque<f64>,
    history_len: usize,
    updates: u64,
    threshold_events: u64,
}

impl SessionTracker {
    pub fn new(session_id: SessionId, smoother: Smoother, cooldown: Duration, history_len: usize) -> Self {
        let history_len = history_len.max(1);
        Self {
            session_id,
            phase: SessionPhase::Idle,
            smoother,
            level: 0.0,
            cooldown,
            cooldown_until: None,
            last_event_timestamp: None,
            history: VecDeque::with_capacity(history_len),
            history_len,
            updates: 0,
            threshold_events: 0,
        }
    }

    pub fn from_config(session_id: SessionId, config: &DetectionConfig) -> Self {
        Self::new(
            session_id,
            Smoother::from_config(&config.smoothing),
            config.cooldown(),
            config.history_len,
        )
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn is_cooldown_active(&self) -> bool {
        self.cooldown_until.is_some()
    }

    /// When the active cooldown ends, if any. The runner sleeps until this.
    pub fn cooldown_deadline(&self) -> Option<Instant> {
        self.cooldown_until
    }

    /// Fold in one score.
    ///
    /// Fires a [`ThresholdEvent`] when the smoothed level is at or above
    /// `threshold` and no cooldown is active, then starts the cooldown.
    pub fn update(
        &mut self,
        score: ConfusionScore,
        threshold: f64,
        now: Instant,
    ) -> Result<TrackerUpdate, TrackerError> {
        if self.phase == SessionPhase::Ended {
            return Err(TrackerError::Ended(self.session_id));
        }
        self.expire_cooldown(now);

        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(score.value());
        self.updates += 1;

        self.level = self.smoother.smooth(score.value());
        if self.phase == SessionPhase::Idle {
            self.phase = SessionPhase::Monitoring;
        }

        let threshold_exceeded = self.level >= clamp_unit(threshold);
        let mut event = None;
        if threshold_exceeded && self.cooldown_until.is_none() {
            event = Some(ThresholdEvent {
                session_id: self.session_id,
                level: self.level,
                timestamp: score.timestamp,
            });
            self.cooldown_until = Some(now + self.cooldown);
            self.phase = SessionPhase::Cooldown;
            self.last_event_timestamp = Some(score.timestamp);
            self.threshold_events += 1;
        }

        Ok(TrackerUpdate {
            raw: score,
            level: self.level,
            threshold_exceeded,
            event,
            trend: self.trend(),
        })
    }

    /// Leave cooldown if its deadline has passed. Returns true on transition.
    pub fn expire_cooldown(&mut self, now: Instant) -> bool {
        match self.cooldown_until {
            Some(deadline) if now >= deadline => {
                self.cooldown_until = None;
                if self.phase == SessionPhase::Cooldown {
                    self.phase = SessionPhase::Monitoring;
                }
                true
            }
            _ => false,
        }
    }

    /// Terminal transition. Discards all scoring state.
    pub fn end(&mut self) {
        self.phase = SessionPhase::Ended;
        self.cooldown_until = None;
        self.history.clear();
        self.smoother.reset();
        self.level = 0.0;
    }

    /// Direction of the most recent raw scores, from a least-squares slope.
    pub fn trend(&self) -> ConfusionTrend {
        let n = defaults::TREND_SAMPLES;
        if self.history.len() < n {
            return ConfusionTrend::InsufficientData;
        }
        let recent = self.history.iter().skip(self.history.len() - n);
        let mean_x = (n - 1) as f64 / 2.0;
        let mean_y = self.history.iter().skip(self.history.len() - n).sum::<f64>() / n as f64;
        let (mut num, mut den) = (0.0, 0.0);
        for (i, y) in recent.enumerate() {
            let dx = i as f64 - mean_x;
            num += dx * (y - mean_y);
            den += dx * dx;
        }
        let slope = num / den;
        if slope > defaults::TREND_SLOPE_EPSILON {
            ConfusionTrend::Increasing
        } else if slope < -defaults::TREND_SLOPE_EPSILON {
            ConfusionTrend::Decreasing
        } else {
            ConfusionTrend::Stable
        }
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            phase: self.phase,
            level: self.level,
            last_raw_score: self.history.back().copied(),
            trend: self.trend(),
            cooldown_active: self.cooldown_until.is_some(),
            cooldown_remaining_secs: self
                .cooldown_until
                .map(|d| d.saturating_duration_since(now).as_secs_f64()),
            updates: self.updates,
            threshold_events: self.threshold_events,
            last_event_timestamp: self.last_event_timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(cooldown_secs: u64) -> SessionTracker {
        SessionTracker::new(
            SessionId::new(),
            Smoother::PassThrough,
            Duration::from_secs(cooldown_secs),
            50,
        )
    }

    fn score(v: f64, ts: f64) -> ConfusionScore {
        ConfusionScore::new(v, ts)
    }

    #[test]
    fn test_starts_idle_with_neutral_level() {
        let t = tracker(5);
        assert_eq!(t.phase(), SessionPhase::Idle);
        assert_eq!(t.level(), 0.0);
        assert!(!t.is_cooldown_active());
    }

    #[test]
    fn test_below_threshold_moves_to_monitoring_without_event() {
        let mut t = tracker(5);
        let u = t.update(score(0.3, 0.0), 0.7, Instant::now()).unwrap();
        assert!(u.event.is_none());
        assert!(!u.threshold_exceeded);
        assert_eq!(t.phase(), SessionPhase::Monitoring);
    }

    #[test]
    fn test_fires_once_per_cooldown_interval() {
        let mut t = tracker(5);
        let start = Instant::now();
        let mut fired = Vec::new();
        for i in 0..10u64 {
            let now = start + Duration::from_secs(i);
            let u = t.update(score(0.9, i as f64), 0.7, now).unwrap();
            assert!(u.threshold_exceeded);
            if let Some(e) = u.event {
                fired.push(e.timestamp);
            }
        }
        assert_eq!(fired, vec![0.0, 5.0]);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let mut t = tracker(5);
        let start = Instant::now();
        let first = t.update(score(0.7, 0.0), 0.7, start).unwrap();
        assert!(first.event.is_some());
        let during = t.update(score(0.7, 1.0), 0.7, start + Duration::from_secs(1)).unwrap();
        assert!(during.event.is_none());
        let after = t.update(score(0.7, 5.0), 0.7, start + Duration::from_secs(5)).unwrap();
        assert!(after.event.is_some());
    }

    #[test]
    fn test_cooldown_expires_without_updates() {
        let mut t = tracker(5);
        let start = Instant::now();
        t.update(score(0.9, 0.0), 0.7, start).unwrap();
        assert_eq!(t.phase(), SessionPhase::Cooldown);
        assert_eq!(t.cooldown_deadline(), Some(start + Duration::from_secs(5)));

        assert!(!t.expire_cooldown(start + Duration::from_secs(4)));
        assert!(t.expire_cooldown(start + Duration::from_secs(5)));
        assert_eq!(t.phase(), SessionPhase::Monitoring);
        assert!(t.cooldown_deadline().is_none());
    }

    #[test]
    fn test_ended_tracker_rejects_updates() {
        let mut t = tracker(5);
        t.update(score(0.9, 0.0), 0.7, Instant::now()).unwrap();
        t.end();
        assert_eq!(t.phase(), SessionPhase::Ended);
        assert!(t.cooldown_deadline().is_none());
        assert_eq!(
            t.update(score(0.9, 1.0), 0.7, Instant::now()),
            Err(TrackerError::Ended(t.session_id()))
        );
    }

    #[test]
    fn test_trend_from_recent_raw_scores() {
        let mut t = tracker(5);
        let now = Instant::now();
        for (i, v) in [0.1, 0.2, 0.3, 0.4].iter().enumerate() {
            let u = t.update(score(*v, i as f64), 0.99, now).unwrap();
            assert_eq!(u.trend, ConfusionTrend::InsufficientData);
        }
        let u = t.update(score(0.5, 4.0), 0.99, now).unwrap();
        assert_eq!(u.trend, ConfusionTrend::Increasing);

        let mut flat = tracker(5);
        for i in 0..5 {
            flat.update(score(0.4, f64::from(i)), 0.99, now).unwrap();
        }
        assert_eq!(flat.trend(), ConfusionTrend::Stable);
    }

    #[test]
    fn test_exponential_smoothing_delays_crossing() {
        let mut t = SessionTracker::new(SessionId::new(), Smoother::exponential(0.3), Duration::from_secs(5), 50);
        let now = Instant::now();
        let first = t.update(score(0.2, 0.0), 0.7, now).unwrap();
        assert!((first.level - 0.2).abs() < 1e-12);
        // One spike to 1.0 lifts the level to 0.44 only
        let spike = t.update(score(1.0, 1.0), 0.7, now).unwrap();
        assert!(spike.event.is_none());
        assert!((spike.level - 0.44).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_reports_cooldown() {
        let mut t = tracker(5);
        let start = Instant::now();
        t.update(score(0.9, 3.0), 0.7, start).unwrap();
        let snap = t.snapshot(start + Duration::from_secs(2));
        assert!(snap.cooldown_active);
        assert_eq!(snap.cooldown_remaining_secs, Some(3.0));
        assert_eq!(snap.threshold_events, 1);
        assert_eq!(snap.last_event_timestamp, Some(3.0));
        assert_eq!(snap.last_raw_score, Some(0.9));
    }
}
