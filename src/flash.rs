//! Flash feedback shown while a photo is taken.
//!
//! The pulse is purely visual: it never touches the captured pixels and never
//! delays `capture()`. Each trigger supersedes the previous pulse, so only the
//! newest pulse clears the flash.

use crate::events::{EventBus, PhotoboothEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// One flash pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashPulse {
    pub id: u64,
    pub started_at: Instant,
    pub duration: Duration,
}

#[derive(Debug, Default)]
struct FlashState {
    latest_pulse: u64,
    active_until: Option<Instant>,
}

/// Single-shot flash timer
pub struct FlashTimer {
    duration: Duration,
    state: Arc<Mutex<FlashState>>,
    event_bus: Arc<EventBus>,
    cancel: Mutex<CancellationToken>,
}

impl FlashTimer {
    pub fn new(duration: Duration, event_bus: Arc<EventBus>) -> Self {
        Self {
            duration,
            state: Arc::new(Mutex::new(FlashState::default())),
            event_bus,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Start a pulse and schedule its auto-clear.
    ///
    /// Without a tokio runtime the pulse still expires on time; only the
    /// `FlashCleared` event is skipped.
    pub fn trigger(&self) -> FlashPulse {
        let started_at = Instant::now();
        let pulse = {
            let mut state = self.state.lock();
            state.latest_pulse += 1;
            state.active_until = Some(started_at + self.duration);
            FlashPulse {
                id: state.latest_pulse,
                started_at,
                duration: self.duration,
            }
        };

        trace!("Flash pulse {} started", pulse.id);
        self.event_bus
            .publish(PhotoboothEvent::FlashStarted { pulse: pulse.id });

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let state = Arc::clone(&self.state);
            let event_bus = Arc::clone(&self.event_bus);
            let token = self.cancel.lock().child_token();
            let duration = self.duration;

            runtime.spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(duration) => {
                        let cleared = {
                            let mut state = state.lock();
                            if state.latest_pulse == pulse.id {
                                state.active_until = None;
                                true
                            } else {
                                false
                            }
                        };

                        if cleared {
                            trace!("Flash pulse {} cleared", pulse.id);
                            event_bus.publish(PhotoboothEvent::FlashCleared { pulse: pulse.id });
                        }
                    }
                }
            });
        }

        pulse
    }

    /// Whether the flash is visible right now
    pub fn is_active(&self) -> bool {
        self.state
            .lock()
            .active_until
            .map_or(false, |until| Instant::now() < until)
    }

    /// Id of the most recent pulse (0 before the first trigger)
    pub fn latest_pulse(&self) -> u64 {
        self.state.lock().latest_pulse
    }

    /// Clear the flash now and drop every scheduled clear
    pub fn cancel(&self) {
        let mut token = self.cancel.lock();
        token.cancel();
        *token = CancellationToken::new();

        let mut state = self.state.lock();
        if state.active_until.take().is_some() {
            debug!("Flash pulse {} cancelled", state.latest_pulse);
        }
    }
}

impl Drop for FlashTimer {
    fn drop(&mut self) {
        self.cancel.lock().cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    fn create_timer(duration_ms: u64) -> (FlashTimer, Arc<EventBus>) {
        let event_bus = Arc::new(EventBus::new(16));
        (
            FlashTimer::new(Duration::from_millis(duration_ms), Arc::clone(&event_bus)),
            event_bus,
        )
    }

    #[tokio::test]
    async fn test_flash_clears_after_duration() {
        let (timer, event_bus) = create_timer(30);
        let mut events = event_bus.subscribe();

        assert!(!timer.is_active());
        let pulse = timer.trigger();
        assert_eq!(pulse.id, 1);
        assert!(timer.is_active());

        assert_eq!(
            events.recv().await.unwrap(),
            PhotoboothEvent::FlashStarted { pulse: 1 }
        );
        let cleared = timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared, PhotoboothEvent::FlashCleared { pulse: 1 });
        assert!(!timer.is_active());
    }

    #[tokio::test]
    async fn test_overlapping_triggers_keep_flash_active() {
        let (timer, event_bus) = create_timer(100);
        let mut events = event_bus.subscribe();

        timer.trigger();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = timer.trigger();
        assert_eq!(second.id, 2);

        // First pulse's clear fires here but is superseded
        tokio::time::sleep(Duration::from_millis(70)).await;
        assert!(timer.is_active());

        tokio::time::sleep(Duration::from_millis(130)).await;
        assert!(!timer.is_active());

        let mut cleared = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let PhotoboothEvent::FlashCleared { pulse } = event {
                cleared.push(pulse);
            }
        }
        assert_eq!(cleared, vec![2]);
    }

    #[tokio::test]
    async fn test_cancel_clears_immediately() {
        let (timer, event_bus) = create_timer(40);
        let mut events = event_bus.subscribe();

        timer.trigger();
        timer.cancel();
        assert!(!timer.is_active());
        assert_eq!(timer.latest_pulse(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(
            events.try_recv().unwrap(),
            PhotoboothEvent::FlashStarted { pulse: 1 }
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_trigger_without_runtime_expires() {
        let (timer, _event_bus) = create_timer(5);

        timer.trigger();
        assert!(timer.is_active());
        std::thread::sleep(Duration::from_millis(20));
        assert!(!timer.is_active());
    }
}
