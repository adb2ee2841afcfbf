//! Sample acquisition module
//!
//! Synthetic EEG generation for running the pipeline without a headset.

mod synth;

pub use synth::{SignalSynthesizer, SynthProfile};
