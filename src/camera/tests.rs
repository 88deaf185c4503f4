use super::*;
use crate::frame::FrameRead;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test]
async fn test_shared_source_reads_frames() {
    let source = SharedFrameSource::new(Box::new(MockFrameSource::new(8, 6)));
    assert_eq!(source.dimensions(), (8, 6));

    match source.read_frame().await.unwrap() {
        FrameRead::Frame(frame) => {
            assert_eq!(frame.id, 0);
            assert_eq!((frame.width, frame.height), (8, 6));
            assert!(frame.validate_size());
        }
        other => panic!("Expected a frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_shared_source_closes_device_once() {
    let mock = MockFrameSource::new(4, 4);
    let close_calls = mock.close_calls();
    let source = SharedFrameSource::new(Box::new(mock));
    let recorder_handle = source.clone();

    source.close().await;
    source.close().await;
    recorder_handle.close().await;

    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
    assert!(!source.is_open().await);
    assert!(matches!(
        recorder_handle.read_frame().await.unwrap(),
        FrameRead::Closed
    ));
}

#[tokio::test]
async fn test_exhausted_source_is_still_released() {
    let mock = MockFrameSource::new(4, 4).end_after(1);
    let close_calls = mock.close_calls();
    let source = SharedFrameSource::new(Box::new(mock));

    assert!(matches!(source.read_frame().await.unwrap(), FrameRead::Frame(_)));
    assert!(matches!(source.read_frame().await.unwrap(), FrameRead::Closed));

    source.close().await;
    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_mock_failure_after_frames() {
    let source = SharedFrameSource::new(Box::new(MockFrameSource::new(4, 4).fail_after(2)));

    assert!(matches!(source.read_frame().await.unwrap(), FrameRead::Frame(_)));
    assert!(matches!(source.read_frame().await.unwrap(), FrameRead::Frame(_)));
    assert!(source.read_frame().await.is_err());
}

#[tokio::test]
async fn test_mock_empty_reads() {
    let mock = MockFrameSource::new(4, 4).with_empty_reads(2);
    let served = mock.frames_served();
    let source = SharedFrameSource::new(Box::new(mock));

    assert!(matches!(source.read_frame().await.unwrap(), FrameRead::Frame(_)));
    assert!(matches!(source.read_frame().await.unwrap(), FrameRead::Empty));
    assert!(matches!(source.read_frame().await.unwrap(), FrameRead::Frame(_)));
    assert_eq!(served.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_interleaved_reads_are_serialized() {
    let mock = MockFrameSource::new(4, 4).with_frame_interval(Duration::from_millis(100));
    let served = mock.frames_served();
    let source = SharedFrameSource::new(Box::new(mock));

    let a = source.clone();
    let b = source.clone();
    let first = tokio::spawn(async move {
        for _ in 0..5 {
            a.read_frame().await.unwrap();
        }
    });
    let second = tokio::spawn(async move {
        for _ in 0..5 {
            b.read_frame().await.unwrap();
        }
    });

    first.await.unwrap();
    second.await.unwrap();
    assert_eq!(served.load(Ordering::SeqCst), 10);
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
#[test]
fn test_open_without_camera_support_is_device_unavailable() {
    let config = crate::config::MotionCamConfig::default();
    match open_frame_source(&config) {
        Err(crate::error::MotionCamError::DeviceUnavailable { device, .. }) => {
            assert_eq!(device, "/dev/video0");
        }
        Err(e) => panic!("Unexpected error: {}", e),
        Ok(_) => panic!("Expected DeviceUnavailable"),
    }
}
