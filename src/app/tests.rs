use super::*;
use crate::analyzer::MockMotionMask;
use crate::camera::MockFrameSource;
use crate::capture::SpyEncoderFactory;
use crate::config::MotionCamConfig;
use crate::events::MotionEvent;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn create_test_config(dir: &std::path::Path) -> MotionCamConfig {
    let mut config = MotionCamConfig::default();
    config.recording.path = dir.join("recordings").to_string_lossy().to_string();
    config.preview.directory = dir.join("preview").to_string_lossy().to_string();
    config.detection.threshold = 100;
    config
}

fn camera() -> MockFrameSource {
    MockFrameSource::new(32, 24).with_frame_interval(Duration::from_millis(10))
}

async fn create_app(
    config: MotionCamConfig,
    source: MockFrameSource,
    scores: MockMotionMask,
    encoders: SpyEncoderFactory,
) -> MotionCamApp {
    MotionCamApp::with_collaborators(config, Box::new(source), Box::new(scores), Arc::new(encoders))
        .await
        .unwrap()
}

fn stop_after(app: &MotionCamApp, delay: Duration) {
    let shutdown = app.shutdown_signal();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        shutdown.request(ShutdownReason::UserRequest);
    });
}

#[tokio::test(start_paused = true)]
async fn test_clean_stop_closes_source_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let recordings = config.recording_dir();
    let source = camera();
    let close_calls = source.close_calls();

    let mut app = create_app(
        config,
        source,
        MockMotionMask::from_scores([]),
        SpyEncoderFactory::new(),
    )
    .await;
    assert!(recordings.is_dir());

    stop_after(&app, Duration::from_millis(500));
    let exit_code = app.run().await.unwrap();

    assert_eq!(exit_code, 0);
    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(app.shutdown_reason(), Some(ShutdownReason::UserRequest));
    assert_eq!(
        app.get_component_state("camera").await,
        Some(ComponentState::Stopped)
    );
    assert_eq!(
        app.get_component_state("engine").await,
        Some(ComponentState::Stopped)
    );
}

#[tokio::test(start_paused = true)]
async fn test_source_failure_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = camera().fail_after(3);
    let close_calls = source.close_calls();

    let mut app = create_app(
        create_test_config(dir.path()),
        source,
        MockMotionMask::from_scores([]),
        SpyEncoderFactory::new(),
    )
    .await;

    let exit_code = app.run().await.unwrap();

    assert_eq!(exit_code, 1);
    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
    assert!(matches!(
        app.shutdown_reason(),
        Some(ShutdownReason::Error(_))
    ));
    assert_eq!(
        app.get_component_state("engine").await,
        Some(ComponentState::Failed)
    );
}

#[tokio::test(start_paused = true)]
async fn test_recording_finishes_before_source_closes() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.detection.time_interval_seconds = 0;
    config.detection.recording_duration_seconds = 2;

    let source = camera();
    let close_calls = source.close_calls();
    let spy = SpyEncoderFactory::new();
    let counters = spy.counters();

    let mut app = create_app(config, source, MockMotionMask::from_scores([500]), spy).await;
    let mut events = app.event_bus().subscribe();

    stop_after(&app, Duration::from_millis(300));
    let exit_code = app.run().await.unwrap();

    assert_eq!(exit_code, 0);
    assert_eq!(counters.opened(), 1);
    assert_eq!(counters.closed(), 1);
    assert!(counters.frames() > 0);
    assert_eq!(close_calls.load(Ordering::SeqCst), 1);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.event_type());
    }
    assert_eq!(
        kinds,
        vec![
            "motion_detected",
            "recording_started",
            "recording_finished",
            "shutdown_requested"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_event_carries_reason() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = create_app(
        create_test_config(dir.path()),
        camera(),
        MockMotionMask::from_scores([]),
        SpyEncoderFactory::new(),
    )
    .await;
    let mut events = app.event_bus().subscribe();

    stop_after(&app, Duration::from_millis(200));
    app.run().await.unwrap();

    match events.recv().await.unwrap() {
        MotionEvent::ShutdownRequested { reason, .. } => {
            assert_eq!(reason, ShutdownReason::UserRequest.to_string())
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_preview_snapshots_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.preview.show_camera = true;
    config.preview.show_mask = true;

    let mut app = create_app(
        config,
        camera().end_after(2),
        MockMotionMask::from_scores([]),
        SpyEncoderFactory::new(),
    )
    .await;

    assert_eq!(app.run().await.unwrap(), 1);
    assert!(dir.path().join("preview").join("motion-detection.jpg").exists());
    assert!(dir.path().join("preview").join("motion-mask.jpg").exists());
}

#[tokio::test]
async fn test_engine_runs_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = create_app(
        create_test_config(dir.path()),
        camera().end_after(1),
        MockMotionMask::from_scores([]),
        SpyEncoderFactory::new(),
    )
    .await;

    assert_eq!(app.run().await.unwrap(), 1);
    assert!(matches!(
        app.run().await,
        Err(crate::error::MotionCamError::System { .. })
    ));
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
#[tokio::test]
async fn test_missing_camera_is_fatal_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());

    let result = MotionCamApp::new(config).await;
    assert!(matches!(
        result,
        Err(crate::error::MotionCamError::DeviceUnavailable { .. })
    ));
    // Nothing is created before the camera opens
    assert!(!dir.path().join("recordings").exists());
}

#[tokio::test]
async fn test_component_state_transitions() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(
        create_test_config(dir.path()),
        camera(),
        MockMotionMask::from_scores([]),
        SpyEncoderFactory::new(),
    )
    .await;

    let component = "test_component";
    assert_eq!(app.get_component_state(component).await, None);

    for state in [
        ComponentState::Starting,
        ComponentState::Running,
        ComponentState::Stopping,
        ComponentState::Stopped,
    ] {
        app.set_component_state(component, state.clone()).await;
        assert_eq!(app.get_component_state(component).await, Some(state));
    }
}

#[test]
fn test_first_shutdown_reason_wins() {
    let shutdown = ShutdownSignal::new();
    assert!(!shutdown.is_requested());
    assert_eq!(shutdown.reason(), None);

    shutdown.request(ShutdownReason::Signal("SIGINT".to_string()));
    shutdown.request(ShutdownReason::UserRequest);

    assert!(shutdown.is_requested());
    assert!(shutdown.token().is_cancelled());
    assert_eq!(
        shutdown.reason(),
        Some(ShutdownReason::Signal("SIGINT".to_string()))
    );
}

#[test]
fn test_shutdown_reason_display() {
    assert_eq!(
        ShutdownReason::Signal("SIGTERM".to_string()).to_string(),
        "received SIGTERM"
    );
    assert!(ShutdownReason::Error("boom".to_string())
        .to_string()
        .contains("boom"));
}
