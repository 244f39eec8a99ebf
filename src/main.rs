use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gazetype::action::ActionEvent;
use gazetype::calibration::{
    CalibrationSettings, CalibrationStore, Calibrator, TargetDisplay, grid_targets,
};
use gazetype::command::CommandInterpreter;
use gazetype::config::{Config, OutputMode};
use gazetype::editor::{Editor, TextBuffer};
use gazetype::error::{CalibrationError, CaptureError};
use gazetype::gaze::{GazeEstimator, LandmarkSource, ReplaySource, gaze_cell, spawn_capture};
use gazetype::mapper::{GazeMapper, ScreenPoint};
use gazetype::pipeline::{Cadence, ConsumerLoop};
use gazetype::state::{RuntimeState, SharedState};
use gazetype::status_bar::StatusLine;
use gazetype::voice::{LineUtterances, spawn_voice};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Bounded so a flood of utterances applies back-pressure on the voice thread
const ACTION_CHANNEL_CAPACITY: usize = 64;

#[derive(Parser)]
#[command(name = "gazetype", version, about = "Type code with your eyes and voice")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,

    /// Recorded landmark frames (JSON lines) to use instead of the camera
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// Replay the landmark file forever
    #[arg(long, requires = "landmarks")]
    loop_landmarks: bool,

    /// Start with voice input switched off
    #[arg(long)]
    no_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Gaze keyboard plus voice commands (default)
    Run,
    /// Guided calibration; writes the calibration file
    Calibrate,
    /// Print the voice command vocabulary
    Commands,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "gazetype=debug" } else { "gazetype=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[hotpath::main]
fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Some(Command::Commands)) {
        CommandInterpreter::print_help();
        return Ok(());
    }

    init_logging(cli.verbose);

    let config = Config::load(&cli.config);
    config.validate().context("invalid configuration")?;

    let state = RuntimeState::new(&config);
    if cli.no_voice {
        state.set_voice_enabled(false);
    }
    let ctrlc_state = state.clone();
    ctrlc::set_handler(move || {
        info!("Interrupted, shutting down");
        ctrlc_state.shutdown();
    })
    .context("failed to install Ctrl-C handler")?;

    match cli.command {
        Some(Command::Calibrate) => calibrate(&cli, &config, &state),
        _ => run(&cli, &config, &state),
    }
}

/// Start the capture thread on the configured landmark source
fn start_capture(
    cli: &Cli,
    config: &Config,
    state: &SharedState,
) -> (gazetype::gaze::GazeReader, JoinHandle<()>) {
    let estimator = GazeEstimator::new(config.gaze.smoothing, gaze_cell());
    let reader = estimator.reader();
    let landmarks = cli.landmarks.clone();
    let looping = cli.loop_landmarks;
    #[cfg(feature = "camera")]
    let camera = config.camera.clone();

    let open = move || -> Result<Box<dyn LandmarkSource>, CaptureError> {
        match landmarks {
            Some(path) => Ok(Box::new(ReplaySource::open(&path, looping)?)),
            #[cfg(feature = "camera")]
            None => Ok(Box::new(gazetype::gaze::CameraSource::open(&camera)?)),
            #[cfg(not(feature = "camera"))]
            None => Err(CaptureError::Unavailable(
                "built without camera support (pass --landmarks FILE or build with --features camera)"
                    .into(),
            )),
        }
    };

    let handle = spawn_capture(
        open,
        estimator,
        state.clone(),
        Duration::from_millis(config.gaze.frame_interval_ms),
    );
    (reader, handle)
}

fn open_editor(mode: OutputMode) -> Result<Box<dyn Editor>> {
    match mode {
        OutputMode::Buffer => Ok(Box::new(TextBuffer::new())),
        #[cfg(feature = "keystrokes")]
        OutputMode::Keystrokes => Ok(Box::new(
            gazetype::editor::KeystrokeEditor::new().context("keystroke output unavailable")?,
        )),
        #[cfg(not(feature = "keystrokes"))]
        OutputMode::Keystrokes => {
            anyhow::bail!("output.mode = \"keystrokes\" needs a build with `--features keystrokes`")
        }
    }
}

fn run(cli: &Cli, config: &Config, state: &SharedState) -> Result<()> {
    let store = CalibrationStore::new(&config.calibration.path);
    let mapper = match store.load() {
        Ok(Some(mapping)) => {
            info!("Loaded calibration from {}", store.path().display());
            GazeMapper::with_mapping(mapping)
        }
        Ok(None) => GazeMapper::uncalibrated(),
        Err(e) => {
            warn!("{}; continuing uncalibrated", e);
            GazeMapper::uncalibrated()
        }
    };

    let editor = open_editor(config.output.mode)?;
    let (reader, capture) = start_capture(cli, config, state);

    let (tx, rx) = flume::bounded::<ActionEvent>(ACTION_CHANNEL_CAPACITY);
    // Detached: it may be blocked reading stdin when we shut down
    let _voice = spawn_voice(
        Box::new(LineUtterances::stdin()),
        CommandInterpreter::new(state.typing.clone()),
        state.clone(),
        tx,
    );

    let consumer = ConsumerLoop::new(config, reader, mapper, editor, state.clone());
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let consumer = runtime.block_on(consumer.run(
        Cadence::from(config),
        rx,
        Some(StatusLine::stdout()),
    ));

    state.shutdown();
    if capture.join().is_err() {
        error!("Capture thread panicked");
    }

    if let Some(text) = consumer.editor().contents() {
        println!("{}", text);
    }
    Ok(())
}

/// Prints each target and waits for the user to settle on it
struct TerminalTargets {
    settle: Duration,
    shown: usize,
    total: usize,
}

impl TargetDisplay for TerminalTargets {
    fn show_target_at(&mut self, target: ScreenPoint) {
        self.shown += 1;
        println!(
            "Look at target {}/{} at ({:.0}, {:.0})",
            self.shown, self.total, target.x, target.y
        );
        thread::sleep(self.settle);
    }

    fn finish(&mut self) {
        println!("Calibration sampling finished");
    }
}

fn calibrate(cli: &Cli, config: &Config, state: &SharedState) -> Result<()> {
    let (reader, capture) = start_capture(cli, config, state);

    let cal = &config.calibration;
    let targets = grid_targets(cal.targets, &config.screen, cal.margin);
    let mut display = TerminalTargets {
        settle: Duration::from_millis(cal.settle_ms),
        shown: 0,
        total: targets.len(),
    };
    let calibrator = Calibrator::new(reader, CalibrationSettings::from(cal))
        .with_cancel(state.cancel.clone())
        .with_store(CalibrationStore::new(&cal.path));

    let result = calibrator.run_procedure(&targets, &mut display);

    state.shutdown();
    if capture.join().is_err() {
        error!("Capture thread panicked");
    }

    match result {
        Ok(mapping) => {
            println!(
                "Calibrated: px = {:?}, py = {:?} (saved to {})",
                mapping.px,
                mapping.py,
                cal.path.display()
            );
            Ok(())
        }
        Err(e) => {
            let hint = match &e {
                CalibrationError::DegenerateFit => {
                    "the tracker gave no usable signal; check lighting and that your face is visible"
                }
                CalibrationError::Stalled(..) | CalibrationError::TimedOut(..) => {
                    "the camera stopped delivering frames; check the landmark source"
                }
                CalibrationError::Aborted => "calibration was cancelled",
                _ => "try again",
            };
            Err(e).context(format!("calibration failed: {}", hint))
        }
    }
}
