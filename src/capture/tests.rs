use super::*;
use crate::camera::{MockFrameSource, SharedFrameSource};
use crate::error::AbortReason;
use crate::frame::{FrameData, FrameFormat};
use chrono::{Local, TimeZone};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime};

fn test_settings() -> EncoderSettings {
    EncoderSettings {
        codec: "H264".to_string(),
        frame_rate: 10.0,
        dimensions: (8, 6),
    }
}

fn test_job(directory: &Path, duration: Duration) -> RecordingJob {
    let triggered_at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    RecordingJob::new(1, directory, "spy", triggered_at, duration, test_settings())
}

fn paced_source(mock: MockFrameSource) -> SharedFrameSource {
    SharedFrameSource::new(Box::new(mock.with_frame_interval(Duration::from_millis(100))))
}

#[test]
fn test_destination_uses_trigger_timestamp() {
    let triggered_at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    let path = RecordingJob::destination_for(Path::new("/var/clips"), "mp4", &triggered_at);
    assert_eq!(path, Path::new("/var/clips/2024-03-09-14-05-07.mp4"));
}

#[tokio::test(start_paused = true)]
async fn test_recording_runs_for_duration() {
    let source = paced_source(MockFrameSource::new(8, 6));
    let factory = SpyEncoderFactory::new();
    let counters = factory.counters();

    let result = test_job(Path::new("/tmp"), Duration::from_secs(1))
        .run(source, Arc::new(factory))
        .await;

    assert_eq!(result.outcome, RecordingOutcome::Completed);
    assert!(
        (9..=11).contains(&result.frames_written),
        "wrote {} frames",
        result.frames_written
    );
    assert!(result.elapsed >= Duration::from_secs(1));
    assert!(result.elapsed <= Duration::from_millis(1100));
    assert_eq!(counters.opened(), 1);
    assert_eq!(counters.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_source_aborts_and_releases_encoder() {
    let source = paced_source(MockFrameSource::new(8, 6).fail_after(3));
    let factory = SpyEncoderFactory::new();
    let counters = factory.counters();

    let result = test_job(Path::new("/tmp"), Duration::from_secs(5))
        .run(source, Arc::new(factory))
        .await;

    assert!(matches!(
        result.outcome,
        RecordingOutcome::Aborted(AbortReason::FrameReadFailure(_))
    ));
    assert_eq!(result.frames_written, 3);
    assert_eq!(counters.frames(), 3);
    assert_eq!(counters.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_end_of_stream_aborts() {
    let source = paced_source(MockFrameSource::new(8, 6).end_after(4));
    let factory = SpyEncoderFactory::new();
    let counters = factory.counters();

    let result = test_job(Path::new("/tmp"), Duration::from_secs(5))
        .run(source, Arc::new(factory))
        .await;

    assert_eq!(
        result.outcome,
        RecordingOutcome::Aborted(AbortReason::SourceClosed)
    );
    assert_eq!(result.frames_written, 4);
    assert_eq!(counters.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_reads_do_not_end_recording() {
    let mock = MockFrameSource::new(8, 6).with_empty_reads(3);
    let source = paced_source(mock);
    let factory = SpyEncoderFactory::new();
    let counters = factory.counters();

    let result = test_job(Path::new("/tmp"), Duration::from_secs(2))
        .run(source, Arc::new(factory))
        .await;

    assert_eq!(result.outcome, RecordingOutcome::Completed);
    assert!(result.frames_written > 0);
    assert_eq!(counters.closed(), 1);
}

#[tokio::test]
async fn test_encoder_open_failure_aborts_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = SharedFrameSource::new(Box::new(MockFrameSource::new(8, 6)));
    let factory = SpyEncoderFactory::failing_open();
    let counters = factory.counters();

    let job = test_job(dir.path(), Duration::from_secs(1));
    let destination = job.destination.clone();
    let result = job.run(source, Arc::new(factory)).await;

    assert!(matches!(
        result.outcome,
        RecordingOutcome::Aborted(AbortReason::EncoderOpenFailure(_))
    ));
    assert_eq!(result.frames_written, 0);
    assert_eq!(counters.closed(), 0);
    assert!(!destination.exists());
}

#[tokio::test(start_paused = true)]
async fn test_encoder_write_failure_aborts() {
    let source = paced_source(MockFrameSource::new(8, 6));
    let factory = SpyEncoderFactory::new().fail_write_after(2);
    let counters = factory.counters();

    let result = test_job(Path::new("/tmp"), Duration::from_secs(5))
        .run(source, Arc::new(factory))
        .await;

    assert!(matches!(
        result.outcome,
        RecordingOutcome::Aborted(AbortReason::EncoderWriteFailure(_))
    ));
    assert_eq!(result.frames_written, 2);
    assert_eq!(counters.closed(), 1);
}

#[test]
fn test_encoder_guard_closes_once() {
    let factory = SpyEncoderFactory::new();
    let counters = factory.counters();
    let settings = test_settings();

    let guard = EncoderGuard::new(
        factory.open(Path::new("/tmp/a.spy"), &settings).unwrap(),
        "/tmp/a.spy".into(),
    );
    guard.finish().unwrap();
    assert_eq!(counters.closed(), 1);

    {
        let _guard = EncoderGuard::new(
            factory.open(Path::new("/tmp/b.spy"), &settings).unwrap(),
            "/tmp/b.spy".into(),
        );
    }
    assert_eq!(counters.closed(), 2);
    assert_eq!(counters.active.load(Ordering::SeqCst), 0);
}

#[test]
fn test_mjpeg_encoder_writes_jpeg_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mjpeg");

    let mut encoder = MjpegFileEncoder::create(&path, (8, 6), 80).unwrap();
    for id in 0..3 {
        let frame = FrameData::new(
            id,
            SystemTime::now(),
            vec![id as u8 * 40; 48],
            8,
            6,
            FrameFormat::Gray8,
        );
        encoder.write_frame(&frame).unwrap();
    }
    encoder.close().unwrap();
    assert_eq!(encoder.frames_written(), 3);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    let frame_starts = bytes.windows(3).filter(|w| *w == [0xFF, 0xD8, 0xFF]).count();
    assert_eq!(frame_starts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_recording_to_mjpeg_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = paced_source(MockFrameSource::new(8, 6));
    let factory = MjpegEncoderFactory::new(75);

    let triggered_at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    let job = RecordingJob::new(
        7,
        dir.path(),
        factory.extension(),
        triggered_at,
        Duration::from_millis(500),
        test_settings(),
    );

    let result = job.run(source, Arc::new(factory)).await;

    assert!(result.is_completed());
    assert_eq!(result.path, dir.path().join("2024-03-09-14-05-07.mjpeg"));
    assert!(std::fs::metadata(&result.path).unwrap().len() > 0);
}

#[test]
fn test_encoder_factory_selection() {
    let mut config = crate::config::MotionCamConfig::default().recording;
    config.backend = "mjpeg".to_string();
    assert_eq!(encoder_factory(&config).unwrap().extension(), "mjpeg");

    config.backend = "avi".to_string();
    assert!(encoder_factory(&config).is_err());
}

#[cfg(all(feature = "video_encoding", target_os = "linux"))]
#[test]
fn test_default_backend_writes_h264_mp4() {
    let config = crate::config::MotionCamConfig::default().recording;
    assert_eq!(config.backend, "gstreamer");
    assert_eq!(config.codec, "H264");
    assert_eq!(encoder_factory(&config).unwrap().extension(), "mp4");
}
