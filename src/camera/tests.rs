use super::*;
use crate::config::{CameraConfig, CameraSource, FacingMode};
use crate::error::{CameraError, PhotoboothError};
use crate::orientation::Orientation;
use image::{Rgba, RgbaImage};

fn portrait_constraints() -> StreamConstraints {
    StreamConstraints::for_orientation(Orientation::Portrait, 1920, FacingMode::User)
}

fn create_test_camera_config() -> CameraConfig {
    CameraConfig {
        source: CameraSource::Synthetic,
        still_path: None,
        ideal_width: 1920,
        facing: FacingMode::User,
        sensor_resolution: (640, 480),
    }
}

#[tokio::test]
async fn test_synthetic_camera_negotiates_resolution() {
    let camera = SyntheticCamera::new((1920, 1080));

    let stream = camera.acquire(&portrait_constraints()).await.unwrap();
    assert_eq!(stream.native_resolution(), (720, 1080));
    assert!(stream.is_live());

    let frame = stream.read_frame().unwrap();
    assert_eq!(frame.dimensions(), (720, 1080));
    assert_eq!(camera.acquisitions(), 1);
}

#[tokio::test]
async fn test_synthetic_camera_native_override() {
    let camera = SyntheticCamera::new((1920, 1080)).with_native_resolution(1080, 1620);

    let stream = camera.acquire(&portrait_constraints()).await.unwrap();
    assert_eq!(stream.native_resolution(), (1080, 1620));
}

#[tokio::test]
async fn test_synthetic_camera_permission_denied() {
    let camera = SyntheticCamera::new((640, 480)).deny_permission();

    let result = camera.acquire(&portrait_constraints()).await;
    assert_eq!(result.err(), Some(CameraError::PermissionDenied));
    assert_eq!(camera.live_tracks(), 0);
    assert_eq!(camera.acquisitions(), 0);
}

#[tokio::test]
async fn test_synthetic_camera_busy_and_facing() {
    let busy = SyntheticCamera::new((640, 480)).in_use();
    assert_eq!(
        busy.acquire(&portrait_constraints()).await.err(),
        Some(CameraError::DeviceBusy)
    );

    let camera = SyntheticCamera::new((640, 480));
    let rear =
        StreamConstraints::for_orientation(Orientation::Portrait, 1920, FacingMode::Environment);
    assert!(matches!(
        camera.acquire(&rear).await.err(),
        Some(CameraError::NoMatchingDevice { .. })
    ));
}

#[tokio::test]
async fn test_stream_stop_releases_tracks_once() {
    let camera = SyntheticCamera::new((640, 480));

    let mut stream = camera.acquire(&portrait_constraints()).await.unwrap();
    assert_eq!(camera.live_tracks(), 1);
    assert_eq!(stream.track_count(), 1);

    assert_eq!(stream.stop(), 1);
    assert_eq!(stream.stop(), 0);
    assert_eq!(camera.live_tracks(), 0);
    assert!(!stream.is_live());
    assert!(matches!(
        stream.read_frame(),
        Err(CameraError::Stream { .. })
    ));
}

#[tokio::test]
async fn test_dropping_stream_releases_tracks() {
    let camera = SyntheticCamera::new((640, 480));

    {
        let _first = camera.acquire(&portrait_constraints()).await.unwrap();
        let _second = camera.acquire(&portrait_constraints()).await.unwrap();
        assert_eq!(camera.live_tracks(), 2);
    }

    assert_eq!(camera.live_tracks(), 0);
}

#[test]
fn test_pattern_marker_is_top_left() {
    let pattern = test_pattern(40, 60);

    assert_eq!(*pattern.get_pixel(0, 0), MARKER_COLOR);
    assert_eq!(*pattern.get_pixel(9, 14), MARKER_COLOR);
    assert_ne!(*pattern.get_pixel(39, 0), MARKER_COLOR);
    assert_ne!(*pattern.get_pixel(0, 59), MARKER_COLOR);
}

#[tokio::test]
async fn test_still_camera_crops_picture() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sensor.png");

    // Left half blue, right half green; a portrait crop keeps the middle
    let sensor = RgbaImage::from_fn(300, 100, |x, _| {
        if x < 150 {
            Rgba([0, 0, 255, 255])
        } else {
            Rgba([0, 255, 0, 255])
        }
    });
    sensor.save(&path).unwrap();

    let camera = StillImageCamera::new(&path);
    let mut stream = camera.acquire(&portrait_constraints()).await.unwrap();

    let (width, height) = stream.native_resolution();
    assert_eq!((width, height), (67, 100));
    assert_eq!(camera.live_tracks(), 1);

    let frame = stream.read_frame().unwrap();
    assert_eq!(frame.image.get_pixel(0, 50)[2], 255);
    assert_eq!(frame.image.get_pixel(width - 1, 50)[1], 255);

    stream.stop();
    assert_eq!(camera.live_tracks(), 0);
}

#[tokio::test]
async fn test_still_camera_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let camera = StillImageCamera::new(dir.path().join("nope.png"));

    let result = camera.acquire(&portrait_constraints()).await;
    assert!(matches!(
        result.err(),
        Some(CameraError::NoMatchingDevice { .. })
    ));
}

#[test]
fn test_camera_builder_pattern() {
    let backend = CameraBackendBuilder::new()
        .config(create_test_camera_config())
        .build()
        .unwrap();

    assert_eq!(backend.name(), "synthetic");
    assert_eq!(backend.live_tracks(), 0);
}

#[test]
fn test_camera_builder_validation() {
    let result = CameraBackendBuilder::new().build();

    match result {
        Err(PhotoboothError::System { message }) => {
            assert!(message.contains("Camera configuration must be specified"));
        }
        _ => panic!("Expected system error for missing configuration"),
    }

    let mut config = create_test_camera_config();
    config.source = CameraSource::Still;
    assert!(CameraBackendBuilder::new().config(config).build().is_err());
}
