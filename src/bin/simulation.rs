//! EEG Headset Simulation
//!
//! Generates a synthetic multi-channel EEG stream for testing the confusion
//! monitor. The stream cycles through calm and confused episodes:
//! - Calm: strong alpha, weak theta and beta
//! - Confused: alpha suppressed, theta and beta raised
//! - Occasional eye blinks on the frontal channels (artifacts)
//!
//! # Usage
//! ```bash
//! ./simulation --duration 120 --speed 1 | ./confusion-monitor --stdin
//! ./simulation --duration 60 --speed 0 --quiet > recording.jsonl
//! ```

use clap::Parser;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use confusion_monitor::acquisition::{SignalSynthesizer, SynthProfile};
use confusion_monitor::config::{defaults, SignalConfig};
use confusion_monitor::types::EPOC_CHANNELS;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "eeg-simulation")]
#[command(about = "Synthetic EEG stream for confusion monitor testing")]
#[command(version = "1.0")]
struct Args {
    /// Simulation duration in seconds of signal
    #[arg(short, long, default_value = "120")]
    duration: f64,

    /// Time compression factor (1 = real-time, 0 = as fast as possible)
    #[arg(short, long, default_value = "1")]
    speed: f64,

    /// Output format: json or csv
    #[arg(short, long, default_value = "json")]
    format: String,

    /// Suppress mission log (only output samples)
    #[arg(short, long)]
    quiet: bool,

    /// Sampling rate in Hz
    #[arg(long, default_value_t = defaults::SAMPLING_RATE_HZ)]
    sample_rate: u32,

    /// Length of one calm → confused → calm cycle in seconds
    #[arg(long, default_value_t = defaults::SIMULATION_EPISODE_SECS)]
    episode: f64,

    /// Chance per sample that an eye blink starts
    #[arg(long, default_value_t = defaults::SIMULATION_BLINK_PROBABILITY)]
    blink_probability: f64,

    /// Mains frequency for the simulated hum
    #[arg(long, default_value_t = defaults::NOTCH_HZ)]
    mains: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

// ============================================================================
// Simulation Phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Calm,
    Rising,
    Confused,
    Recovering,
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Calm => "Calm (Alpha Dominant)",
            Phase::Rising => "Rising Confusion",
            Phase::Confused => "Confused (Theta/Beta Dominant)",
            Phase::Recovering => "Recovering",
        }
    }

    fn expectation(&self) -> &'static str {
        match self {
            Phase::Calm => "Expected: low confusion, no threshold events",
            Phase::Rising => "Expected: confusion level climbing",
            Phase::Confused => "Expected: threshold event and help suggestion",
            Phase::Recovering => "Expected: confusion level falling",
        }
    }

    /// Quarter of the episode cycle at `t`.
    fn at(t: f64, episode: f64) -> Self {
        match (t % episode) / episode {
            p if p < 0.25 => Phase::Calm,
            p if p < 0.50 => Phase::Rising,
            p if p < 0.75 => Phase::Confused,
            _ => Phase::Recovering,
        }
    }
}

fn format_time(secs: f64) -> String {
    let total = secs as u64;
    format!("{:02}:{:02}.{:01}", total / 60, total % 60, ((secs.fract()) * 10.0) as u64)
}

fn log_mission(time: f64, message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[{}] {}", format_time(time), message);
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if !(args.duration.is_finite() && args.duration > 0.0) {
        return Err(format!("--duration must be positive, got {}", args.duration).into());
    }
    if !(args.episode.is_finite() && args.episode > 0.0) {
        return Err(format!("--episode must be positive, got {}", args.episode).into());
    }

    let signal = SignalConfig {
        sampling_rate_hz: args.sample_rate,
        notch_hz: args.mains,
        ..SignalConfig::default()
    };
    let profile = SynthProfile {
        episode_secs: args.episode,
        blink_probability: args.blink_probability,
        ..SynthProfile::from_signal(&signal, args.seed)
    };
    let mut synth = SignalSynthesizer::new(profile)?;

    let rate = f64::from(args.sample_rate);
    let total_samples = (args.duration * rate).round() as u64;
    let sample_interval_real =
        (args.speed > 0.0).then(|| Duration::from_secs_f64(1.0 / (rate * args.speed)));

    // Mission briefing
    log_mission(0.0, &"=".repeat(70), args.quiet);
    log_mission(0.0, "EEG HEADSET SIMULATION v1.0", args.quiet);
    log_mission(0.0, "Confusion Monitor Test Data Generator", args.quiet);
    log_mission(0.0, &"=".repeat(70), args.quiet);
    log_mission(0.0, "", args.quiet);
    log_mission(0.0, "SIGNAL PARAMETERS:", args.quiet);
    log_mission(0.0, &format!("  Channels: {} ({})", EPOC_CHANNELS.len(), EPOC_CHANNELS.join(", ")), args.quiet);
    log_mission(0.0, &format!("  Sampling rate: {} Hz", args.sample_rate), args.quiet);
    log_mission(0.0, &format!("  Mains hum: {:.0} Hz", args.mains), args.quiet);
    log_mission(0.0, &format!("  Blink probability: {} per sample", args.blink_probability), args.quiet);
    log_mission(0.0, "", args.quiet);
    log_mission(0.0, "SIMULATION PARAMETERS:", args.quiet);
    log_mission(0.0, &format!("  Duration: {:.0} s ({} samples)", args.duration, total_samples), args.quiet);
    match sample_interval_real {
        Some(_) => log_mission(0.0, &format!("  Speed: {}x", args.speed), args.quiet),
        None => log_mission(0.0, "  Speed: unpaced", args.quiet),
    }
    if let Some(seed) = args.seed {
        log_mission(0.0, &format!("  Random seed: {}", seed), args.quiet);
    }
    log_mission(0.0, "", args.quiet);
    log_mission(0.0, &format!("EPISODE CYCLE ({:.0} s):", args.episode), args.quiet);
    log_mission(0.0, "  0-25%:   Calm", args.quiet);
    log_mission(0.0, "  25-50%:  Rising confusion", args.quiet);
    log_mission(0.0, "  50-75%:  Confused", args.quiet);
    log_mission(0.0, "  75-100%: Recovering", args.quiet);
    log_mission(0.0, &"=".repeat(70), args.quiet);
    log_mission(0.0, "SIMULATION START", args.quiet);
    log_mission(0.0, &"=".repeat(70), args.quiet);

    if args.format == "csv" {
        println!("timestamp,{}", EPOC_CHANNELS.join(","));
    }

    let start_time = Instant::now();
    let mut phase: Option<Phase> = None;
    let mut last_log_percent = 0;

    let stdout = io::stdout();
    let mut stdout_lock = stdout.lock();

    for i in 0..total_samples {
        let loop_start = Instant::now();
        let t = synth.elapsed_secs();

        // Phase transition logging
        let current = Phase::at(t, args.episode);
        if phase != Some(current) {
            log_mission(t, &format!(">>> PHASE: {}", current.name()), args.quiet);
            log_mission(t, &format!("    {}", current.expectation()), args.quiet);
            phase = Some(current);
        }

        // Progress logging (every 10%)
        let current_percent = (i * 100 / total_samples.max(1)) as u32 / 10 * 10;
        if current_percent > last_log_percent {
            log_mission(
                t,
                &format!("Progress: {}% | Intensity: {:.2}", current_percent, synth.intensity_at(t)),
                args.quiet,
            );
            last_log_percent = current_percent;
        }

        let sample = synth.next_sample();
        match args.format.as_str() {
            "csv" => {
                let values: Vec<String> = sample.channels.iter().map(|v| format!("{v:.3}")).collect();
                writeln!(stdout_lock, "{:.6},{}", sample.timestamp, values.join(","))?;
            }
            _ => {
                let json = serde_json::to_string(&sample)?;
                writeln!(stdout_lock, "{}", json)?;
            }
        }

        if let Some(interval) = sample_interval_real {
            stdout_lock.flush()?;
            let elapsed = loop_start.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
    }

    stdout_lock.flush()?;
    drop(stdout_lock);

    // Mission debrief
    let end = synth.elapsed_secs();
    log_mission(end, &"=".repeat(70), args.quiet);
    log_mission(end, "SIMULATION COMPLETE", args.quiet);
    log_mission(end, &"=".repeat(70), args.quiet);
    log_mission(end, &format!("Total samples: {}", total_samples), args.quiet);
    log_mission(end, &format!("Real time: {:.1}s", start_time.elapsed().as_secs_f64()), args.quiet);
    log_mission(end, &"=".repeat(70), args.quiet);

    Ok(())
}
