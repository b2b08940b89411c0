use crate::error::EventBusError;
use crate::orientation::Orientation;
use crate::session::SessionState;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events published by a photobooth session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhotoboothEvent {
    /// The capture session moved between lifecycle states
    SessionStateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// A camera stream was granted
    CameraAcquired {
        orientation: Orientation,
        backend: String,
        width: u32,
        height: u32,
    },
    /// All tracks of a camera stream were stopped
    CameraReleased { tracks: usize },
    /// The camera could not be opened
    CameraFailed {
        orientation: Orientation,
        error: String,
    },
    /// Overlay for the orientation finished loading
    OverlayReady { orientation: Orientation },
    /// Overlay for the orientation failed to load
    OverlayFailed {
        orientation: Orientation,
        error: String,
    },
    /// Flash feedback became visible
    FlashStarted { pulse: u64 },
    /// Flash feedback auto-cleared
    FlashCleared { pulse: u64 },
    /// A photo was composited and encoded
    PhotoCaptured {
        photo_id: Uuid,
        width: u32,
        height: u32,
        bytes: usize,
        overlay_applied: bool,
    },
    /// A photo was handed to the capture-completion callback
    PhotoDelivered { photo_id: Uuid },
    /// A photo was written to disk
    PhotoSaved { photo_id: Uuid, path: String },
}

impl PhotoboothEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            PhotoboothEvent::SessionStateChanged { from, to } => {
                format!("Session {} -> {}", from, to)
            }
            PhotoboothEvent::CameraAcquired {
                orientation,
                backend,
                width,
                height,
            } => format!(
                "Camera '{}' live at {}x{} ({})",
                backend, width, height, orientation
            ),
            PhotoboothEvent::CameraReleased { tracks } => {
                format!("Camera released ({} tracks stopped)", tracks)
            }
            PhotoboothEvent::CameraFailed { orientation, error } => {
                format!("Camera unavailable for {}: {}", orientation, error)
            }
            PhotoboothEvent::OverlayReady { orientation } => {
                format!("Overlay ready for {}", orientation)
            }
            PhotoboothEvent::OverlayFailed { orientation, error } => {
                format!("Overlay failed for {}: {}", orientation, error)
            }
            PhotoboothEvent::FlashStarted { pulse } => format!("Flash pulse {} started", pulse),
            PhotoboothEvent::FlashCleared { pulse } => format!("Flash pulse {} cleared", pulse),
            PhotoboothEvent::PhotoCaptured {
                photo_id,
                width,
                height,
                bytes,
                overlay_applied,
            } => format!(
                "Photo {} captured ({}x{}, {} bytes, overlay: {})",
                photo_id, width, height, bytes, overlay_applied
            ),
            PhotoboothEvent::PhotoDelivered { photo_id } => {
                format!("Photo {} delivered", photo_id)
            }
            PhotoboothEvent::PhotoSaved { photo_id, path } => {
                format!("Photo {} saved to {}", photo_id, path)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            PhotoboothEvent::SessionStateChanged { .. } => "session_state_changed",
            PhotoboothEvent::CameraAcquired { .. } => "camera_acquired",
            PhotoboothEvent::CameraReleased { .. } => "camera_released",
            PhotoboothEvent::CameraFailed { .. } => "camera_failed",
            PhotoboothEvent::OverlayReady { .. } => "overlay_ready",
            PhotoboothEvent::OverlayFailed { .. } => "overlay_failed",
            PhotoboothEvent::FlashStarted { .. } => "flash_started",
            PhotoboothEvent::FlashCleared { .. } => "flash_cleared",
            PhotoboothEvent::PhotoCaptured { .. } => "photo_captured",
            PhotoboothEvent::PhotoDelivered { .. } => "photo_delivered",
            PhotoboothEvent::PhotoSaved { .. } => "photo_saved",
        }
    }
}

/// Event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<PhotoboothEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<PhotoboothEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it. Publishing without
    /// subscribers is not an error; the event is simply dropped.
    pub fn publish(&self, event: PhotoboothEvent) -> usize {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            PhotoboothEvent::CameraFailed { .. } => {
                error!("{}", event.description());
            }
            PhotoboothEvent::OverlayFailed { .. } => {
                warn!("{}", event.description());
            }
            PhotoboothEvent::CameraAcquired { .. } | PhotoboothEvent::PhotoSaved { .. } => {
                info!("{}", event.description());
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&PhotoboothEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &PhotoboothEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<PhotoboothEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<PhotoboothEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<PhotoboothEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<PhotoboothEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

/// Per-type event counters
#[derive(Debug, Default)]
pub struct EventMetrics {
    pub total_events: u64,
    pub events_by_type: std::collections::HashMap<&'static str, u64>,
    pub last_event_time: Option<SystemTime>,
}

impl EventMetrics {
    /// Record an event
    pub fn record_event(&mut self, event: &PhotoboothEvent) {
        self.total_events += 1;
        *self.events_by_type.entry(event.event_type()).or_insert(0) += 1;
        self.last_event_time = Some(SystemTime::now());
    }

    /// Number of events seen for a type
    pub fn count(&self, event_type: &str) -> u64 {
        self.events_by_type.get(event_type).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let subscriber_count = event_bus.publish(PhotoboothEvent::FlashStarted { pulse: 7 });
        assert_eq!(subscriber_count, 1);

        let received_event = receiver.recv().await.unwrap();
        assert_eq!(received_event, PhotoboothEvent::FlashStarted { pulse: 7 });
    }

    #[test]
    fn test_publish_without_subscribers() {
        let event_bus = EventBus::new(4);
        assert!(!event_bus.has_subscribers());
        assert_eq!(
            event_bus.publish(PhotoboothEvent::CameraReleased { tracks: 1 }),
            0
        );
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish(PhotoboothEvent::OverlayReady {
            orientation: Orientation::Portrait,
        });

        let _ = timeout(Duration::from_millis(100), receiver1.recv())
            .await
            .unwrap()
            .unwrap();
        let _ = timeout(Duration::from_millis(100), receiver2.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let filter = EventFilter::EventTypes(vec!["flash_cleared"]);
        let mut filtered_receiver =
            EventReceiver::new(event_bus.subscribe(), filter, "test".to_string());

        event_bus.publish(PhotoboothEvent::FlashStarted { pulse: 1 });
        event_bus.publish(PhotoboothEvent::FlashCleared { pulse: 1 });

        let received = timeout(Duration::from_millis(100), filtered_receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, PhotoboothEvent::FlashCleared { pulse: 1 });
        assert_eq!(filtered_receiver.try_recv().unwrap(), None);
    }

    fn is_failure(event: &PhotoboothEvent) -> bool {
        matches!(
            event,
            PhotoboothEvent::CameraFailed { .. } | PhotoboothEvent::OverlayFailed { .. }
        )
    }

    #[tokio::test]
    async fn test_custom_filter_receiver() {
        let event_bus = EventBus::new(10);
        let mut failures = EventReceiver::new(
            event_bus.subscribe(),
            EventFilter::Custom(is_failure),
            "failures".to_string(),
        );

        event_bus.publish(PhotoboothEvent::OverlayReady {
            orientation: Orientation::Portrait,
        });
        event_bus.publish(PhotoboothEvent::OverlayFailed {
            orientation: Orientation::Landscape,
            error: "not found".to_string(),
        });
        event_bus.publish(PhotoboothEvent::FlashStarted { pulse: 2 });

        let received = timeout(Duration::from_millis(100), failures.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.event_type(), "overlay_failed");
        assert_eq!(failures.try_recv().unwrap(), None);
    }

    #[tokio::test]
    async fn test_debug_logging_bus_delivers_events() {
        let event_bus = EventBus::with_debug_logging(4);
        let mut receiver = event_bus.subscribe();

        assert_eq!(event_bus.publish(PhotoboothEvent::FlashCleared { pulse: 3 }), 1);
        assert_eq!(
            receiver.recv().await.unwrap(),
            PhotoboothEvent::FlashCleared { pulse: 3 }
        );

        let cloned = event_bus.clone();
        assert_eq!(cloned.subscriber_count(), 1);
        cloned.publish(PhotoboothEvent::CameraReleased { tracks: 2 });
        assert_eq!(
            receiver.recv().await.unwrap(),
            PhotoboothEvent::CameraReleased { tracks: 2 }
        );
    }

    #[test]
    fn test_event_properties() {
        let event = PhotoboothEvent::CameraFailed {
            orientation: Orientation::Landscape,
            error: "camera permission denied".to_string(),
        };

        assert_eq!(event.event_type(), "camera_failed");
        assert!(event.description().contains("landscape"));

        let mut metrics = EventMetrics::default();
        metrics.record_event(&event);
        metrics.record_event(&event);
        assert_eq!(metrics.count("camera_failed"), 2);
        assert_eq!(metrics.count("photo_saved"), 0);
    }
}
