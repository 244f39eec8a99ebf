//! End-to-end behaviour through the public API: estimation, calibration, dwell and the
//! voice gate.

use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use gazetype::action::Action;
use gazetype::calibration::{
    CalibrationSettings, CalibrationStore, Calibrator, TargetDisplay, grid_targets,
};
use gazetype::command::CommandInterpreter;
use gazetype::config::{Config, ScreenConfig};
use gazetype::dwell::{DwellSelector, DwellState, KeyActivated, KeyRegion};
use gazetype::error::{CalibrationError, MappingError};
use gazetype::gaze::{
    GazeEstimator, GazeFeed, GazeReader, GazeSample, GazeWriter, LandmarkFrame, Point,
    ReplaySource, gaze_cell, spawn_capture,
};
use gazetype::mapper::{CalibrationMapping, GazeMapper, ScreenPoint, to_screen};
use gazetype::state::{RuntimeState, TypingGate};

const W: f64 = 1920.0;
const H: f64 = 1080.0;

fn screen() -> ScreenConfig {
    ScreenConfig {
        width: W,
        height: H,
    }
}

fn fast_settings() -> CalibrationSettings {
    CalibrationSettings {
        samples_per_point: 4,
        sample_interval: Duration::ZERO,
        stall_timeout: Duration::from_secs(5),
        point_timeout: Duration::from_secs(5),
    }
}

/// Plays the capture loop's role: each target puts the "eyes" where the gaze function says
struct Rig<G: Fn(ScreenPoint) -> (f64, f64)> {
    writer: GazeWriter,
    gaze: G,
}

impl<G: Fn(ScreenPoint) -> (f64, f64)> TargetDisplay for Rig<G> {
    fn show_target_at(&mut self, target: ScreenPoint) {
        let (gx, gy) = (self.gaze)(target);
        self.writer.write(|s| {
            s.gx = gx;
            s.gy = gy;
            s.confidence = 0.9;
            s.frame += 1;
        });
    }
}

fn rig<G: Fn(ScreenPoint) -> (f64, f64)>(gaze: G) -> (Rig<G>, GazeReader) {
    let writer = gaze_cell();
    let reader = writer.reader();
    (Rig { writer, gaze }, reader)
}

#[test]
fn test_smoothing_converges_on_a_steady_target() {
    let writer = gaze_cell();
    let reader = writer.reader();
    let start = Instant::now();
    let mut estimator = GazeEstimator::started_at(0.25, writer, start);

    for i in 1..=25 {
        estimator.update(GazeSample {
            x: 0.8,
            y: 0.3,
            confidence: 0.9,
            timestamp: start + Duration::from_millis(33 * i),
        });
    }

    let snap = reader.snapshot();
    assert!((snap.gx - 0.8).abs() < 0.001, "gx = {}", snap.gx);
    assert!((snap.gy - 0.3).abs() < 0.001, "gy = {}", snap.gy);
    assert_eq!(snap.frame, 25);
    assert!(snap.fps > 0.0);
}

#[test]
fn test_both_detector_paths_mirror_x() {
    let writer = gaze_cell();
    let reader = writer.reader();
    let mut estimator = GazeEstimator::new(1.0, writer);

    let face = LandmarkFrame::face_box(vec![Point::new(0.1, 0.3), Point::new(0.3, 0.5)]);
    let sample = estimator.observe(Ok(Some(face)), Instant::now());
    assert!((sample.x - 0.8).abs() < 1e-9);
    assert!((sample.y - 0.4).abs() < 1e-9);
    assert_eq!(sample.confidence, 0.4);

    let mut mesh = vec![Point::new(0.5, 0.5); 478];
    // Both iris rings
    mesh[468..478].fill(Point::new(0.2, 0.6));
    let sample = estimator.observe(Ok(Some(LandmarkFrame::mesh(mesh))), Instant::now());
    assert!((sample.x - 0.8).abs() < 1e-9);
    assert!((sample.y - 0.6).abs() < 1e-9);
    assert_eq!(sample.confidence, 0.9);
    assert_eq!(reader.snapshot().confidence, 0.9);

    // No face: centre, zero confidence
    let sample = estimator.observe(Ok(None), Instant::now());
    assert_eq!((sample.x, sample.y, sample.confidence), (0.5, 0.5, 0.0));
}

#[test]
fn test_calibration_round_trip_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let store = CalibrationStore::new(dir.path().join("calibration.toml"));
    let (mut display, reader) = rig(|t| (t.x / W, t.y / H));
    let targets = grid_targets(9, &screen(), 0.1);

    let calibrator = Calibrator::new(reader, fast_settings()).with_store(store.clone());
    let mapping = calibrator.run_procedure(&targets, &mut display).unwrap();

    for &(gx, gy) in &[(0.0, 0.0), (0.25, 0.75), (0.5, 0.5), (1.0, 1.0)] {
        let p = mapping.apply(gx, gy);
        assert!((p.x - gx * W).abs() < 1e-6, "x at {:?}: {}", (gx, gy), p.x);
        assert!((p.y - gy * H).abs() < 1e-6, "y at {:?}: {}", (gx, gy), p.y);
    }

    let loaded = store.load().unwrap().expect("calibration was saved");
    for (a, b) in loaded.px.iter().chain(&loaded.py).zip(mapping.px.iter().chain(&mapping.py)) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn test_degenerate_calibration_keeps_previous_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let store = CalibrationStore::new(dir.path().join("calibration.toml"));
    let previous = CalibrationMapping {
        px: [W, 0.0, 0.0],
        py: [0.0, H, 0.0],
    };
    store.save(&previous, 9).unwrap();

    // The eyes never move whatever the target
    let (mut display, reader) = rig(|_| (0.5, 0.5));
    let targets = grid_targets(9, &screen(), 0.1);
    let calibrator = Calibrator::new(reader, fast_settings()).with_store(store.clone());

    let err = calibrator.run_procedure(&targets, &mut display).unwrap_err();
    assert!(matches!(err, CalibrationError::DegenerateFit), "{:?}", err);
    assert_eq!(store.load().unwrap(), Some(previous));
}

#[test]
fn test_dwell_activates_once_then_restarts() {
    let regions = vec![
        KeyRegion::new(0, 0.0, 0.0, 100.0, 100.0),
        KeyRegion::new(1, 100.0, 0.0, 100.0, 100.0),
    ];
    let mut dwell = DwellSelector::new(Duration::from_millis(900), Duration::from_millis(50));
    let on_a = Some(ScreenPoint::new(50.0, 50.0));
    let on_b = Some(ScreenPoint::new(150.0, 50.0));

    // Entering the key, then 18 more ticks to reach 900ms
    for _ in 0..18 {
        assert_eq!(dwell.tick(on_a, &regions), None);
    }
    assert_eq!(dwell.tick(on_a, &regions), Some(KeyActivated(0)));
    assert_eq!(
        dwell.state(),
        DwellState::Hovering {
            key: 0,
            elapsed_ms: 0
        }
    );

    // Moving away resets progress before the next activation
    for _ in 0..10 {
        assert_eq!(dwell.tick(on_a, &regions), None);
    }
    assert_eq!(dwell.tick(on_b, &regions), None);
    assert_eq!(dwell.hovered(), Some(1));
    assert_eq!(dwell.progress(), 0.0);

    // Gaze off every key drops back to idle
    assert_eq!(dwell.tick(None, &regions), None);
    assert_eq!(dwell.state(), DwellState::Idle);
}

#[test]
fn test_pause_gates_text_but_not_control() {
    let gate = TypingGate::new(true);
    let interpreter = CommandInterpreter::new(gate.clone());

    assert_eq!(interpreter.interpret("pause typing"), Action::Pause);
    assert!(!gate.is_open());
    assert_eq!(interpreter.interpret("new line"), Action::Blocked);
    assert_eq!(interpreter.interpret("print hello"), Action::Blocked);
    assert_eq!(interpreter.interpret("resume typing"), Action::Resume);
    assert!(gate.is_open());
    assert_eq!(interpreter.interpret("new line"), Action::insert("\n"));
}

#[test]
fn test_uncalibrated_mapping_is_refused() {
    assert!(matches!(
        to_screen(0.5, 0.5, None),
        Err(MappingError::Uncalibrated)
    ));
    let mut mapper = GazeMapper::uncalibrated();
    assert!(mapper.to_screen(0.5, 0.5).is_err());

    mapper.set_mapping(CalibrationMapping {
        px: [W, 0.0, 0.0],
        py: [0.0, H, 0.0],
    });
    assert_eq!(mapper.to_screen(0.5, 0.5).unwrap(), ScreenPoint::new(960.0, 540.0));
}

#[test]
fn test_replayed_landmarks_drive_the_gaze_cell() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for _ in 0..5 {
        writeln!(file, r#"{{"kind":"box","points":[[0.1,0.3],[0.3,0.5]]}}"#).unwrap();
    }
    file.flush().unwrap();

    let state = RuntimeState::new(&Config::default());
    let estimator = GazeEstimator::new(0.5, gaze_cell());
    let reader = estimator.reader();
    let path = file.path().to_path_buf();
    let handle = spawn_capture(
        move || Ok(Box::new(ReplaySource::open(&path, true)?) as _),
        estimator,
        state.clone(),
        Duration::ZERO,
    );

    let deadline = Instant::now() + Duration::from_secs(5);
    while reader.snapshot().frame < 50 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    state.shutdown();
    handle.join().unwrap();

    let snap = reader.snapshot();
    assert!(snap.frame >= 50);
    assert!((snap.gx - 0.8).abs() < 1e-3, "gx = {}", snap.gx);
    assert!((snap.gy - 0.4).abs() < 1e-3, "gy = {}", snap.gy);
    assert_eq!(snap.confidence, 0.4);
}
