use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use super::collaborators::{FetchRef, RenderRef};
use super::update::UpdateCoordinator;
use crate::{
    clock::{Clock, SystemClock},
    config::Config,
    error::ConfigError,
    events::{Bus, Event},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing an [`UpdateCoordinator`].
pub struct CoordinatorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoordinatorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            clock: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive coordinator events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a single subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Overrides the time source (defaults to [`SystemClock`]).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validates the configuration and builds the coordinator.
    ///
    /// Spawns the subscriber workers and the bus listener, so it must be called
    /// inside a tokio runtime.
    pub fn build(
        self,
        fetcher: FetchRef,
        renderer: RenderRef,
    ) -> Result<UpdateCoordinator, ConfigError> {
        self.cfg.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let bus = Bus::new(self.cfg.bus_capacity_clamped()).with_clock(clock.clone());
        let set = SubscriberSet::new(self.subscribers, bus.clone());
        let stop = CancellationToken::new();
        let listener = tokio::spawn(subscriber_listener(bus.subscribe(), set, stop.clone()));

        Ok(UpdateCoordinator::new_internal(
            &self.cfg, clock, fetcher, renderer, bus, stop, listener,
        ))
    }
}

/// Forwards bus events to the subscriber set until stopped, then drains it.
async fn subscriber_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            res = rx.recv() => match res {
                Ok(ev) => set.emit(ev),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            _ = stop.cancelled() => {
                loop {
                    match rx.try_recv() {
                        Ok(ev) => set.emit(ev),
                        Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                break;
            }
        }
    }
    set.shutdown().await;
}
