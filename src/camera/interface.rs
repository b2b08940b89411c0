use super::constraints::StreamConstraints;
use crate::error::CameraError;
use crate::frame::VideoFrame;
use async_trait::async_trait;
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, trace};

/// A source of camera streams (the platform media-device boundary)
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Backend name for logs and events
    fn name(&self) -> &str;

    /// Request a live stream; fails if permission is denied or nothing matches
    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError>;

    /// Tracks currently open across every stream this backend handed out
    fn live_tracks(&self) -> usize;
}

/// A live video stream owned by exactly one session
pub trait CameraStream: Send + Sync {
    /// Width and height of the frames the stream delivers
    fn native_resolution(&self) -> (u32, u32);

    /// Read the current frame
    fn read_frame(&self) -> Result<VideoFrame, CameraError>;

    fn is_live(&self) -> bool;

    /// Number of tracks still open on this stream
    fn track_count(&self) -> usize;

    /// Stop every track. Returns how many tracks this call stopped, so a
    /// second call returns 0.
    fn stop(&mut self) -> usize;
}

/// Shared count of open tracks for one backend
#[derive(Debug, Clone, Default)]
pub struct TrackRegistry {
    live: Arc<AtomicUsize>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `tracks` tracks; they stay counted until the returned set is stopped or dropped
    pub fn open(&self, tracks: usize) -> TrackSet {
        self.live.fetch_add(tracks, Ordering::SeqCst);
        TrackSet {
            live: Arc::clone(&self.live),
            open: AtomicUsize::new(tracks),
        }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Tracks belonging to one stream
#[derive(Debug)]
pub struct TrackSet {
    live: Arc<AtomicUsize>,
    open: AtomicUsize,
}

impl TrackSet {
    pub fn open_tracks(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn stop(&self) -> usize {
        let stopped = self.open.swap(0, Ordering::SeqCst);
        if stopped > 0 {
            self.live.fetch_sub(stopped, Ordering::SeqCst);
        }
        stopped
    }
}

impl Drop for TrackSet {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Stream that serves one prepared sensor image for every frame
pub struct StillFrameStream {
    image: Arc<RgbaImage>,
    tracks: TrackSet,
    frame_counter: AtomicU64,
    is_running: AtomicBool,
}

impl StillFrameStream {
    pub fn new(image: Arc<RgbaImage>, tracks: TrackSet) -> Self {
        Self {
            image,
            tracks,
            frame_counter: AtomicU64::new(0),
            is_running: AtomicBool::new(true),
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }
}

impl CameraStream for StillFrameStream {
    fn native_resolution(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn read_frame(&self) -> Result<VideoFrame, CameraError> {
        if !self.is_running.load(Ordering::Relaxed) {
            return Err(CameraError::Stream {
                details: "stream has been stopped".to_string(),
            });
        }

        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        trace!(
            "Read frame {} ({}x{})",
            frame_id,
            self.image.width(),
            self.image.height()
        );

        Ok(VideoFrame::new(
            frame_id,
            SystemTime::now(),
            Arc::clone(&self.image),
        ))
    }

    fn is_live(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    fn track_count(&self) -> usize {
        self.tracks.open_tracks()
    }

    fn stop(&mut self) -> usize {
        self.is_running.store(false, Ordering::Relaxed);
        let stopped = self.tracks.stop();
        if stopped > 0 {
            debug!("Stopped {} camera track(s)", stopped);
        }
        stopped
    }
}
