//! Sample source abstraction for EEG ingestion.
//!
//! Provides a unified trait for reading samples from different producers:
//! the built-in synthesizer (mock mode), stdin (JSON lines) and pre-loaded
//! recordings (replay). A headset bridge plugs in by implementing the same
//! trait; the session runner never knows which one it drives.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::warn;

use crate::acquisition::{SignalSynthesizer, SynthProfile};
use crate::types::Sample;

/// Events produced by a sample source.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleEvent {
    /// A sample was read.
    Sample(Sample),
    /// Source reached end of data (EOF, recording exhausted, device gone).
    Eof,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed sample on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid source setup: {0}")]
    Setup(String),
}

/// Trait abstracting where samples come from.
///
/// The session runner calls [`next_sample`](SampleSource::next_sample) in a
/// `select!` with cancellation, so implementations may await freely.
#[async_trait]
pub trait SampleSource: Send + 'static {
    /// Read the next sample.
    ///
    /// Returns `SampleEvent::Eof` when no more data is available.
    /// Returns `Err` on unrecoverable errors.
    async fn next_sample(&mut self) -> Result<SampleEvent, SourceError>;

    /// Human-readable name for logging (e.g. "simulated", "stdin", "replay").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Simulated Source (mock headset)
// ============================================================================

/// Streams synthetic EEG, optionally paced to real time.
pub struct SimulatedSource {
    synth: SignalSynthesizer,
    pacing: Option<tokio::time::Interval>,
    remaining: Option<u64>,
}

impl SimulatedSource {
    /// `speed` scales the pacing (2.0 = twice real time). `None` disables
    /// pacing entirely. `duration` bounds the stream in signal time.
    pub fn new(
        profile: SynthProfile,
        speed: Option<f64>,
        duration: Option<Duration>,
    ) -> Result<Self, SourceError> {
        let rate = profile.sampling_rate_hz;
        let pacing = match speed {
            Some(s) if s.is_finite() && s > 0.0 => {
                let period = Duration::from_secs_f64(1.0 / (rate * s));
                let mut interval = tokio::time::interval_at(Instant::now(), period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
                Some(interval)
            }
            Some(s) => return Err(SourceError::Setup(format!("invalid speed {s}"))),
            None => None,
        };
        let remaining = duration.map(|d| (d.as_secs_f64() * rate).round() as u64);
        let synth = SignalSynthesizer::new(profile).map_err(|e| SourceError::Setup(e.to_string()))?;
        Ok(Self {
            synth,
            pacing,
            remaining,
        })
    }
}

#[async_trait]
impl SampleSource for SimulatedSource {
    async fn next_sample(&mut self) -> Result<SampleEvent, SourceError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(SampleEvent::Eof);
            }
            *remaining -= 1;
        }
        if let Some(interval) = self.pacing.as_mut() {
            interval.tick().await;
        }
        Ok(SampleEvent::Sample(self.synth.next_sample()))
    }

    fn source_name(&self) -> &str {
        "simulated"
    }
}

// ============================================================================
// Replay Source (pre-loaded recording)
// ============================================================================

/// Replays pre-loaded samples with optional inter-sample delay.
pub struct ReplaySource {
    samples: std::vec::IntoIter<Sample>,
    delay: Option<Duration>,
    yielded_first: bool,
}

impl ReplaySource {
    pub fn new(samples: Vec<Sample>, delay: Option<Duration>) -> Self {
        Self {
            samples: samples.into_iter(),
            delay,
            yielded_first: false,
        }
    }

    /// Load a JSON-lines recording and pace it at `sampling_rate_hz × speed`.
    pub fn from_file(path: &Path, sampling_rate_hz: f64, speed: Option<f64>) -> Result<Self, SourceError> {
        let samples = load_samples(path)?;
        let delay = speed
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(|s| Duration::from_secs_f64(1.0 / (sampling_rate_hz * s)));
        Ok(Self::new(samples, delay))
    }
}

#[async_trait]
impl SampleSource for ReplaySource {
    async fn next_sample(&mut self) -> Result<SampleEvent, SourceError> {
        // No delay before the first sample
        if self.yielded_first {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
        match self.samples.next() {
            Some(s) => {
                self.yielded_first = true;
                Ok(SampleEvent::Sample(s))
            }
            None => Ok(SampleEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}

/// Parse a JSON-lines recording, one `{"timestamp":..,"channels":[..]}` per line.
///
/// Blank lines are skipped; a malformed line fails the whole load.
pub fn load_samples(path: &Path) -> Result<Vec<Sample>, SourceError> {
    let contents = std::fs::read_to_string(path)?;
    parse_samples(&contents)
}

pub fn parse_samples(contents: &str) -> Result<Vec<Sample>, SourceError> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| {
            serde_json::from_str::<Sample>(l.trim()).map_err(|e| SourceError::Parse {
                line: i + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

// ============================================================================
// Line Source (JSON samples, one per line)
// ============================================================================

/// Longest accepted input line; longer lines are discarded.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Reads JSON-formatted samples, one per line, from any async reader.
///
/// Framing is done by `LinesCodec`, so a partially received line survives
/// the runner's `select!` dropping `next_sample` mid-read.
pub struct LineSource<R> {
    lines: FramedRead<R, LinesCodec>,
    line_number: usize,
    name: &'static str,
}

/// Reads samples from stdin.
///
/// Used with the simulation binary:
/// `simulation --speed 1 | confusion-monitor --stdin`
pub type StdinSource = LineSource<tokio::io::Stdin>;

impl<R: AsyncRead + Unpin + Send + 'static> LineSource<R> {
    pub fn from_reader(reader: R, name: &'static str) -> Self {
        Self {
            lines: FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_BYTES)),
            line_number: 0,
            name,
        }
    }
}

impl LineSource<tokio::io::Stdin> {
    pub fn new() -> Self {
        Self::from_reader(tokio::io::stdin(), "stdin")
    }
}

impl Default for LineSource<tokio::io::Stdin> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send + 'static> SampleSource for LineSource<R> {
    async fn next_sample(&mut self) -> Result<SampleEvent, SourceError> {
        loop {
            let line = match self.lines.next().await {
                None => return Ok(SampleEvent::Eof),
                Some(Ok(line)) => line,
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    self.line_number += 1;
                    warn!(line = self.line_number, max = MAX_LINE_BYTES, "[{}] Line too long, skipped", self.name);
                    continue;
                }
                Some(Err(LinesCodecError::Io(e))) => return Err(SourceError::Io(e)),
            };
            self.line_number += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Sample>(line) {
                Ok(sample) => return Ok(SampleEvent::Sample(sample)),
                Err(e) => {
                    warn!(line = self.line_number, "[{}] Failed to parse sample: {}", self.name, e);
                    // Skip malformed lines and keep reading
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        self.name
    }
}
