//! # Event bus for broadcasting diagnostic events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from the coordinator and the subscriber workers.
//!
//! ## Architecture
//! ```text
//! Publishers:                        Consumers:
//!   UpdateCoordinator ─┐
//!   fetch runner ──────┼──► Bus ───► listener ──► SubscriberSet
//!   subscriber workers ┘     │
//!                            └─────► UpdateCoordinator::subscribe() receivers
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.
//! - **Clock stamping**: a bus built [`with_clock`](Bus::with_clock) overwrites `Event::at`
//!   with the clock's time, so event timestamps agree with cycle reports.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::broadcast;

use super::event::Event;
use crate::clock::Clock;

/// Broadcast channel for diagnostic events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
    clock: Option<Arc<dyn Clock>>,
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("receivers", &self.tx.receiver_count())
            .field("clock", &self.clock.is_some())
            .finish()
    }
}

impl Bus {
    /// Creates a new bus with the given channel capacity (min 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx, clock: None }
    }

    /// Stamps every published event with `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, mut ev: Event) {
        if let Some(clock) = &self.clock {
            ev.at = SystemTime::from(clock.now());
        }
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn test_publish_without_receivers_is_noop() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::CycleStarting));
    }

    #[test]
    fn test_receiver_sees_events_after_subscribe() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::CycleStarting));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::FetchSucceeded).with_count(3));

        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::FetchSucceeded);
        assert_eq!(ev.count, Some(3));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clock_stamps_events() {
        use chrono::TimeZone;

        let noon = chrono::FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .unwrap();
        let bus = Bus::new(4).with_clock(Arc::new(crate::clock::ManualClock::new(noon)));
        let mut rx = bus.subscribe();

        bus.publish(Event::new(EventKind::CycleStarting));
        assert_eq!(rx.try_recv().unwrap().at, SystemTime::from(noon));
    }
}
