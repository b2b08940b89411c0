use super::delivery::{BackCallback, CaptureCallback, DeliveryScheduler};
use super::state::SessionState;
use crate::camera::{CameraBackend, CameraStream, StreamConstraints};
use crate::capture::{composite, encode_png, mirrored_preview, CapturedImage};
use crate::config::{FacingMode, OverlayPolicy, PhotoboothConfig, PngCompression};
use crate::error::{CaptureError, PhotoboothError, Result};
use crate::events::{EventBus, PhotoboothEvent};
use crate::flash::FlashTimer;
use crate::frame::DisplaySize;
use crate::orientation::Orientation;
use crate::overlay::{OverlayHandle, OverlayLoader, OverlaySource, OverlayState};
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Settings a capture session runs with
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub ideal_width: u32,
    pub facing: FacingMode,
    pub overlay_policy: OverlayPolicy,
    pub flash_duration: Duration,
    pub delivery_delay: Duration,
    pub png_compression: PngCompression,
}

impl From<&PhotoboothConfig> for SessionConfig {
    fn from(config: &PhotoboothConfig) -> Self {
        Self {
            ideal_width: config.camera.ideal_width,
            facing: config.camera.facing,
            overlay_policy: config.overlay.policy,
            flash_duration: Duration::from_millis(config.flash.duration_ms),
            delivery_delay: Duration::from_millis(config.flash.delivery_delay_ms),
            png_compression: config.output.png_compression,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&PhotoboothConfig::default())
    }
}

/// Owns the camera stream, the overlay load and the flash for one
/// orientation at a time.
///
/// All mutating operations take `&mut self`, so a capture can never
/// interleave with `stop` or an orientation switch.
pub struct CaptureSession {
    config: SessionConfig,
    camera: Arc<dyn CameraBackend>,
    overlays: OverlayLoader,
    event_bus: Arc<EventBus>,
    flash: FlashTimer,
    delivery: DeliveryScheduler,
    on_capture: Option<CaptureCallback>,
    on_back: Option<BackCallback>,
    state: SessionState,
    orientation: Option<Orientation>,
    stream: Option<Box<dyn CameraStream>>,
    overlay: Option<OverlayHandle>,
}

impl CaptureSession {
    pub fn builder() -> CaptureSessionBuilder {
        CaptureSessionBuilder::new()
    }

    /// Open the camera for `orientation` and begin loading its overlay.
    ///
    /// Any stream from a previous start is released first. The overlay load
    /// runs alongside camera acquisition and never delays going live.
    pub async fn start(&mut self, orientation: Orientation) -> Result<()> {
        if self.stream.is_some() || self.overlay.is_some() {
            debug!("Releasing previous stream before starting {}", orientation);
            self.release_resources();
        }

        self.orientation = Some(orientation);
        self.set_state(SessionState::Starting);

        self.overlay = Some(self.overlays.load(orientation));

        let constraints = StreamConstraints::for_orientation(
            orientation,
            self.config.ideal_width,
            self.config.facing,
        );
        info!(
            "Requesting {} stream from '{}' camera (aspect {:.3}, ideal width {})",
            orientation,
            self.camera.name(),
            constraints.aspect_ratio,
            constraints.ideal_width
        );

        match self.camera.acquire(&constraints).await {
            Ok(stream) => {
                let (width, height) = stream.native_resolution();
                info!("Camera live at {}x{} for {}", width, height, orientation);

                self.stream = Some(stream);
                self.event_bus.publish(PhotoboothEvent::CameraAcquired {
                    orientation,
                    backend: self.camera.name().to_string(),
                    width,
                    height,
                });
                self.set_state(SessionState::Live);
                Ok(())
            }
            Err(e) => {
                error!("Failed to open camera for {}: {}", orientation, e);

                if let Some(overlay) = self.overlay.take() {
                    overlay.cancel();
                }
                self.event_bus.publish(PhotoboothEvent::CameraFailed {
                    orientation,
                    error: e.to_string(),
                });
                self.set_state(SessionState::Failed);
                Err(e.into())
            }
        }
    }

    /// Release the current stream and start again in `orientation`
    pub async fn switch_orientation(&mut self, orientation: Orientation) -> Result<()> {
        info!(
            "Switching orientation {} -> {}",
            self.orientation
                .map_or_else(|| "none".to_string(), |o| o.to_string()),
            orientation
        );
        self.start(orientation).await
    }

    /// Start again with the last requested orientation
    pub async fn retry(&mut self) -> Result<()> {
        let orientation = self
            .orientation
            .ok_or_else(|| PhotoboothError::system("No orientation to retry; call start first"))?;
        self.start(orientation).await
    }

    /// Grab the current frame, mirror it, draw the overlay and encode PNG.
    ///
    /// Completes synchronously. The flash is triggered at the same time and
    /// the photo is handed to the capture callback after the delivery delay.
    pub fn capture(&mut self) -> Result<CapturedImage> {
        let orientation = match (self.state, self.orientation) {
            (SessionState::Live, Some(orientation)) if self.stream.is_some() => orientation,
            _ => {
                return Err(CaptureError::NotLive { state: self.state }.into());
            }
        };

        let overlay = self.overlay_for_capture(orientation)?;

        self.set_state(SessionState::Capturing);
        let pulse = self.flash.trigger();
        trace!("Capture using flash pulse {}", pulse.id);

        let result = self.compose_photo(orientation, overlay.as_deref());
        self.set_state(SessionState::Live);
        let photo = result?;

        info!(
            "Captured {} photo {} ({}x{}, {} bytes, overlay: {})",
            orientation,
            photo.id(),
            photo.width(),
            photo.height(),
            photo.len(),
            photo.overlay_applied()
        );
        self.event_bus.publish(PhotoboothEvent::PhotoCaptured {
            photo_id: photo.id(),
            width: photo.width(),
            height: photo.height(),
            bytes: photo.len(),
            overlay_applied: photo.overlay_applied(),
        });

        self.delivery
            .schedule(photo.clone(), self.on_capture.clone());

        Ok(photo)
    }

    /// Mirrored copy of the current frame, scaled to fit `display`.
    ///
    /// Only the preview changes with the display size; captures always use
    /// the stream's native resolution.
    pub fn preview_frame(&self, display: Option<DisplaySize>) -> Result<RgbaImage> {
        let stream = match (&self.stream, self.state.has_stream()) {
            (Some(stream), true) => stream,
            _ => return Err(CaptureError::NotLive { state: self.state }.into()),
        };

        let frame = stream.read_frame()?;
        Ok(mirrored_preview(&frame.image, display))
    }

    /// Stop every camera track and cancel pending work. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.state == SessionState::Stopped && self.stream.is_none() {
            trace!("Capture session already stopped");
            return;
        }

        let released = self.release_resources();
        info!("Capture session stopped ({} tracks released)", released);
        self.set_state(SessionState::Stopped);
    }

    /// Leave the camera view: stop the session, then notify the owner
    pub fn back(&mut self) {
        self.stop();
        if let Some(on_back) = &self.on_back {
            on_back();
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.orientation
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn camera(&self) -> &Arc<dyn CameraBackend> {
        &self.camera
    }

    /// Resolution of the live stream, if any
    pub fn native_resolution(&self) -> Option<(u32, u32)> {
        self.stream.as_ref().map(|stream| stream.native_resolution())
    }

    /// Overlay readiness for the current orientation
    pub fn overlay_state(&self) -> OverlayState {
        self.overlay
            .as_ref()
            .map_or(OverlayState::Pending, |overlay| overlay.state())
    }

    /// Wait for the current overlay load to resolve
    pub async fn wait_for_overlay(&self) -> OverlayState {
        match &self.overlay {
            Some(overlay) => overlay.wait_resolved().await,
            None => OverlayState::Pending,
        }
    }

    pub fn flash_active(&self) -> bool {
        self.flash.is_active()
    }

    /// Photos captured but not yet handed to the callback
    pub fn pending_deliveries(&self) -> usize {
        self.delivery.pending()
    }

    fn overlay_for_capture(&self, orientation: Orientation) -> Result<Option<Arc<RgbaImage>>> {
        let state = match &self.overlay {
            Some(overlay) if overlay.orientation() == orientation => overlay.state(),
            _ => OverlayState::Pending,
        };

        match (state, self.config.overlay_policy) {
            (OverlayState::Ready(image), _) => Ok(Some(image)),
            (OverlayState::Pending, OverlayPolicy::Block) => {
                debug!("Refusing capture while {} overlay is loading", orientation);
                Err(CaptureError::OverlayPending { orientation }.into())
            }
            (OverlayState::Pending, OverlayPolicy::Fallback) => {
                warn!(
                    "Overlay for {} not ready; capturing without it",
                    orientation
                );
                Ok(None)
            }
            (OverlayState::Failed(e), _) => {
                debug!("Capturing {} without overlay: {}", orientation, e);
                Ok(None)
            }
        }
    }

    fn compose_photo(
        &self,
        orientation: Orientation,
        overlay: Option<&RgbaImage>,
    ) -> Result<CapturedImage> {
        let stream = self
            .stream
            .as_ref()
            .ok_or(CaptureError::NotLive { state: self.state })?;

        let frame = stream.read_frame()?;
        let pixels = composite(&frame.image, overlay);
        let png = encode_png(&pixels, self.config.png_compression)?;

        Ok(CapturedImage::new(
            orientation,
            pixels.width(),
            pixels.height(),
            png,
            overlay.is_some(),
        ))
    }

    fn release_resources(&mut self) -> usize {
        let mut released = 0;

        if let Some(mut stream) = self.stream.take() {
            released = stream.stop();
            self.event_bus
                .publish(PhotoboothEvent::CameraReleased { tracks: released });
        }
        if let Some(overlay) = self.overlay.take() {
            overlay.cancel();
        }
        self.flash.cancel();
        self.delivery.cancel_pending();

        released
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state == state {
            return;
        }

        let from = self.state;
        self.state = state;
        debug!("Session state {} -> {}", from, state);
        self.event_bus
            .publish(PhotoboothEvent::SessionStateChanged { from, to: state });
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for capture sessions
pub struct CaptureSessionBuilder {
    config: Option<SessionConfig>,
    camera: Option<Arc<dyn CameraBackend>>,
    overlay_source: Option<Arc<dyn OverlaySource>>,
    event_bus: Option<Arc<EventBus>>,
    on_capture: Option<CaptureCallback>,
    on_back: Option<BackCallback>,
}

impl CaptureSessionBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            camera: None,
            overlay_source: None,
            event_bus: None,
            on_capture: None,
            on_back: None,
        }
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn camera(mut self, camera: Arc<dyn CameraBackend>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn overlay_source(mut self, source: Arc<dyn OverlaySource>) -> Self {
        self.overlay_source = Some(source);
        self
    }

    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn on_capture<F>(mut self, callback: F) -> Self
    where
        F: Fn(CapturedImage) + Send + Sync + 'static,
    {
        self.on_capture = Some(Arc::new(callback));
        self
    }

    pub fn on_back<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_back = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<CaptureSession> {
        let camera = self
            .camera
            .ok_or_else(|| PhotoboothError::system("Camera backend must be specified"))?;
        let overlay_source = self
            .overlay_source
            .ok_or_else(|| PhotoboothError::system("Overlay source must be specified"))?;
        let config = self.config.unwrap_or_default();
        let event_bus = self.event_bus.unwrap_or_else(|| Arc::new(EventBus::new(64)));

        Ok(CaptureSession {
            overlays: OverlayLoader::new(overlay_source, Arc::clone(&event_bus)),
            flash: FlashTimer::new(config.flash_duration, Arc::clone(&event_bus)),
            delivery: DeliveryScheduler::new(config.delivery_delay, Arc::clone(&event_bus)),
            config,
            camera,
            event_bus,
            on_capture: self.on_capture,
            on_back: self.on_back,
            state: SessionState::Idle,
            orientation: None,
            stream: None,
            overlay: None,
        })
    }
}

impl Default for CaptureSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
