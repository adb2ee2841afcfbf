//! Confusion Monitor - real-time EEG confusion detection service
//!
//! Conditions, windows and classifies multi-channel EEG per session, then
//! streams confusion updates, threshold events and help suggestions to
//! dashboards over WebSocket.
//!
//! # Usage
//!
//! ```bash
//! # Mock mode: built-in synthetic headset
//! cargo run --release
//!
//! # Samples as JSON lines from stdin
//! ./simulation --speed 1 | ./confusion-monitor --stdin
//!
//! # Replay a recording at 4x
//! ./confusion-monitor --replay session.jsonl --speed 4
//! ```
//!
//! # Environment Variables
//!
//! - `CONFUSION_MONITOR_CONFIG`: Path to the TOML configuration file
//! - `CONFUSION_THRESHOLD`, `SAMPLING_RATE`, ...: per-key overrides
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use confusion_monitor::acquisition::SynthProfile;
use confusion_monitor::api::{create_app, ApiState};
use confusion_monitor::classifier::build_classifier;
use confusion_monitor::config::MonitorConfig;
use confusion_monitor::fanout::EventHub;
use confusion_monitor::help::{HelpDispatcher, StaticContextProvider, TemplateHelpGenerator};
use confusion_monitor::pipeline::{
    ReplaySource, SampleSource, SessionRegistry, SimulatedSource, StdinSource,
};
use confusion_monitor::types::SessionId;

/// How long shutdown waits for tasks to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "confusion-monitor")]
#[command(about = "Real-time EEG confusion detection and help dispatch")]
#[command(version)]
struct CliArgs {
    /// Read samples from stdin (JSON lines) instead of the built-in synthesizer
    /// Use with simulator: ./simulation | ./confusion-monitor --stdin
    #[arg(long, conflicts_with = "replay")]
    stdin: bool,

    /// Replay a JSON-lines recording
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Override the server address (default: "0.0.0.0:8000")
    #[arg(short, long)]
    addr: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for the synthetic headset
    #[arg(long)]
    seed: Option<u64>,

    /// Pacing for synthetic and replayed samples (1 = realtime, 0 = no delay)
    #[arg(long, default_value = "1")]
    speed: f64,

    /// Stop the synthetic stream after this many seconds of signal
    #[arg(long, value_name = "SECS")]
    duration: Option<f64>,

    /// Start without a session; create them with POST /api/v1/sessions
    #[arg(long, conflicts_with_all = ["stdin", "replay"])]
    idle: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl CliArgs {
    fn pacing(&self) -> Option<f64> {
        (self.speed > 0.0).then_some(self.speed)
    }
}

// ============================================================================
// Supervisor
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    Session,
    HelpDispatcher,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::Session => write!(f, "Session"),
            TaskName::HelpDispatcher => write!(f, "HelpDispatcher"),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Spawn the help dispatcher. Subscribes before returning so no threshold
/// event from the first session is missed.
fn spawn_help_dispatcher(
    task_set: &mut JoinSet<Result<TaskName>>,
    config: &MonitorConfig,
    hub: &Arc<EventHub>,
    cancel_token: CancellationToken,
) -> Arc<TemplateHelpGenerator> {
    let generator = Arc::new(TemplateHelpGenerator::new(
        config.help.max_suggestions,
        confusion_monitor::config::defaults::HELP_HISTORY_LEN,
    ));
    let dispatcher = HelpDispatcher::new(
        Arc::clone(hub),
        generator.clone(),
        Arc::new(StaticContextProvider::new(&config.help.subject)),
        &config.help,
    );
    let events = dispatcher.subscribe();
    task_set.spawn(async move {
        dispatcher.run(events, cancel_token).await;
        Ok(TaskName::HelpDispatcher)
    });
    generator
}

/// Watch the startup session until it ends on its own.
fn spawn_session_watch(
    task_set: &mut JoinSet<Result<TaskName>>,
    registry: Arc<SessionRegistry>,
    session_id: SessionId,
) {
    task_set.spawn(async move {
        // NotFound means it already finished
        let _ = registry.wait(session_id).await;
        info!(session = %session_id, "[Session] Startup session finished");
        Ok(TaskName::Session)
    });
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: All tasks spawned, monitoring...");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("🛑 Supervisor: Shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("🔒 Supervisor: Task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("🔒 Supervisor: Task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("🔒 Supervisor: Task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("🔒 Supervisor: All tasks completed");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Build the sample source selected on the command line.
fn startup_source(args: &CliArgs, config: &MonitorConfig) -> Result<Option<Box<dyn SampleSource>>> {
    if args.idle {
        info!("📥 Input: none (sessions via POST /api/v1/sessions)");
        return Ok(None);
    }
    if args.stdin {
        info!("📥 Input: stdin (JSON samples from simulation)");
        return Ok(Some(Box::new(StdinSource::new())));
    }
    if let Some(path) = &args.replay {
        info!("📂 Input: replay of {}", path.display());
        let source = ReplaySource::from_file(path, config.signal.sampling_rate(), args.pacing())
            .with_context(|| format!("Failed to load recording {}", path.display()))?;
        return Ok(Some(Box::new(source)));
    }

    info!("🧪 Input: synthetic headset (seed {:?}, speed {}x)", args.seed, args.speed);
    let duration = match args.duration {
        Some(d) if d.is_finite() && d > 0.0 => Some(Duration::from_secs_f64(d)),
        Some(d) => return Err(anyhow::anyhow!("--duration must be positive, got {}", d)),
        None => None,
    };
    let profile = SynthProfile::from_signal(&config.signal, args.seed);
    let source = SimulatedSource::new(profile, args.pacing(), duration)
        .context("Failed to start synthetic headset")?;
    Ok(Some(Box::new(source)))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let mut config = MonitorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(addr) = &args.addr {
        config.server.addr = addr.clone();
    }
    let config = Arc::new(config);

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Confusion Monitor v{}", env!("CARGO_PKG_VERSION"));
    info!("  Real-time EEG confusion detection");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "   Signal: {} ch @ {} Hz, band-pass {}-{} Hz, notch {} Hz",
        config.signal.channel_count,
        config.signal.sampling_rate_hz,
        config.signal.highpass_hz,
        config.signal.lowpass_hz,
        config.signal.notch_hz
    );
    info!(
        "   Window: {} samples, stride {}; threshold {}, cooldown {}s",
        config.window.size, config.window.stride, config.detection.threshold, config.detection.cooldown_secs
    );

    let hub = EventHub::with_retention(
        config.fanout.consumer_queue_capacity,
        Duration::from_secs(config.fanout.closed_session_retention_secs),
    );
    let classifier =
        build_classifier(&config.classifier, &config.signal).context("Failed to build classifier")?;
    info!("   Classifier: {}", classifier.name());
    let registry = Arc::new(SessionRegistry::new(Arc::clone(&config), Arc::clone(&hub), classifier));

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    info!("🔒 Supervisor: Initializing task monitoring");
    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Task 1: Help dispatcher (before any session starts)
    let help = if config.help.enabled {
        Some(spawn_help_dispatcher(&mut task_set, &config, &hub, cancel_token.clone()))
    } else {
        info!("   Help generation: disabled");
        None
    };

    // Task 2: HTTP server
    let app = create_app(ApiState::new(Arc::clone(&registry), help));
    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
    info!("✓ HTTP server listening on {}", config.server.addr);
    info!("🎯 Event stream at ws://{}/ws", config.server.addr);
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());

    // Task 3: startup session
    if let Some(source) = startup_source(&args, &config)? {
        let session_id = registry.start_session(source).context("Failed to start session")?;
        spawn_session_watch(&mut task_set, Arc::clone(&registry), session_id);
    }

    let outcome = run_supervisor(&mut task_set, cancel_token.clone()).await;

    // Stop sessions first so their final events are purged, then release consumers
    cancel_token.cancel();
    registry.shutdown().await;
    hub.shutdown();
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while task_set.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!("Tasks still running after {:?}, aborting", SHUTDOWN_GRACE);
        task_set.abort_all();
    }

    info!("✓ Confusion Monitor shutdown complete");
    outcome
}
