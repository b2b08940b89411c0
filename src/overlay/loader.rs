use super::source::OverlaySource;
use crate::error::OverlayError;
use crate::events::{EventBus, PhotoboothEvent};
use crate::orientation::Orientation;
use image::RgbaImage;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Readiness of one overlay load
#[derive(Debug, Clone)]
pub enum OverlayState {
    Pending,
    Ready(Arc<RgbaImage>),
    Failed(OverlayError),
}

impl OverlayState {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, OverlayState::Pending)
    }

    pub fn image(&self) -> Option<&Arc<RgbaImage>> {
        match self {
            OverlayState::Ready(image) => Some(image),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OverlayState::Pending => "pending",
            OverlayState::Ready(_) => "ready",
            OverlayState::Failed(_) => "failed",
        }
    }
}

/// Starts overlay loads in the background
#[derive(Clone)]
pub struct OverlayLoader {
    source: Arc<dyn OverlaySource>,
    event_bus: Arc<EventBus>,
}

impl OverlayLoader {
    pub fn new(source: Arc<dyn OverlaySource>, event_bus: Arc<EventBus>) -> Self {
        Self { source, event_bus }
    }

    /// Begin loading the overlay for `orientation` and return at once.
    ///
    /// Must be called from within a tokio runtime. The load writes only into
    /// the returned handle; dropping the handle cancels it.
    pub fn load(&self, orientation: Orientation) -> OverlayHandle {
        let (state_tx, state_rx) = watch::channel(OverlayState::Pending);
        let token = CancellationToken::new();

        let task_token = token.clone();
        let source = Arc::clone(&self.source);
        let event_bus = Arc::clone(&self.event_bus);

        debug!(
            "Loading {} overlay from {}",
            orientation,
            source.locate(orientation)
        );

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    debug!("Overlay load for {} cancelled", orientation);
                }
                result = source.fetch(orientation) => {
                    if task_token.is_cancelled() {
                        debug!("Discarding superseded {} overlay", orientation);
                        return;
                    }

                    match result {
                        Ok(image) => {
                            info!(
                                "Overlay for {} ready ({}x{})",
                                orientation,
                                image.width(),
                                image.height()
                            );
                            state_tx.send_replace(OverlayState::Ready(Arc::new(image)));
                            event_bus.publish(PhotoboothEvent::OverlayReady { orientation });
                        }
                        Err(e) => {
                            warn!("Failed to load overlay for {}: {}", orientation, e);
                            event_bus.publish(PhotoboothEvent::OverlayFailed {
                                orientation,
                                error: e.to_string(),
                            });
                            state_tx.send_replace(OverlayState::Failed(e));
                        }
                    }
                }
            }
        });

        OverlayHandle {
            orientation,
            state: state_rx,
            token,
        }
    }
}

/// Readiness of the overlay for one orientation
pub struct OverlayHandle {
    orientation: Orientation,
    state: watch::Receiver<OverlayState>,
    token: CancellationToken,
}

impl OverlayHandle {
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Current state without waiting
    pub fn state(&self) -> OverlayState {
        self.state.borrow().clone()
    }

    /// Wait until the load succeeds or fails.
    ///
    /// A load cancelled before resolving stays `Pending`.
    pub async fn wait_resolved(&self) -> OverlayState {
        let mut state = self.state.clone();
        loop {
            {
                let current = state.borrow_and_update();
                if current.is_resolved() {
                    return current.clone();
                }
            }

            if state.changed().await.is_err() {
                return state.borrow().clone();
            }
        }
    }

    /// Stop the load; a late result is discarded
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for OverlayHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
