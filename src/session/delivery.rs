use crate::capture::CapturedImage;
use crate::events::{EventBus, PhotoboothEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Receives each captured photo once the feedback delay has passed
pub type CaptureCallback = Arc<dyn Fn(CapturedImage) + Send + Sync>;

/// Invoked when the user leaves the camera view
pub type BackCallback = Arc<dyn Fn() + Send + Sync>;

/// Hands photos to the capture callback after a cancellable delay.
///
/// The photo itself is produced synchronously by `capture()`; this only
/// postpones the hand-off so the flash can be seen.
pub(crate) struct DeliveryScheduler {
    delay: Duration,
    event_bus: Arc<EventBus>,
    cancel: CancellationToken,
    pending: Arc<AtomicUsize>,
}

impl DeliveryScheduler {
    pub(crate) fn new(delay: Duration, event_bus: Arc<EventBus>) -> Self {
        Self {
            delay,
            event_bus,
            cancel: CancellationToken::new(),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn schedule(&self, image: CapturedImage, callback: Option<CaptureCallback>) {
        let Some(callback) = callback else {
            debug!("No capture callback registered; photo {} not delivered", image.id());
            return;
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) if !self.delay.is_zero() => runtime,
            _ => {
                deliver(image, &callback, &self.event_bus);
                return;
            }
        };

        let token = self.cancel.child_token();
        let event_bus = Arc::clone(&self.event_bus);
        let pending = PendingDelivery::new(&self.pending);
        let delay = self.delay;

        runtime.spawn(async move {
            let _pending = pending;
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Delivery of photo {} cancelled", image.id());
                }
                _ = tokio::time::sleep(delay) => {
                    deliver(image, &callback, &event_bus);
                }
            }
        });
    }

    /// Drop every delivery that has not fired yet
    pub(crate) fn cancel_pending(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl Drop for DeliveryScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// One outstanding delivery; counted until dropped, including when the
/// runtime drops the task before it runs
struct PendingDelivery(Arc<AtomicUsize>);

impl PendingDelivery {
    fn new(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(count))
    }
}

impl Drop for PendingDelivery {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn deliver(image: CapturedImage, callback: &CaptureCallback, event_bus: &EventBus) {
    let photo_id = image.id();
    callback(image);
    event_bus.publish(PhotoboothEvent::PhotoDelivered { photo_id });
}
