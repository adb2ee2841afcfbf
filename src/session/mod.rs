//! Session State Tracker - smoothing, thresholding and cooldown per session

mod smoothing;
mod tracker;

pub use smoothing::Smoother;
pub use tracker::{SessionSnapshot, SessionTracker, TrackerError, TrackerUpdate};
