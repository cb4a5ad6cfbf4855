//! Diagnostic events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the update coordinator, its fetch
//! runner and the subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`DelaySource`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `UpdateCoordinator`, `runner::fetch_once`, `SubscriberSet` workers.
//! - **Consumers**: the coordinator's listener (fans out to `SubscriberSet`) and any
//!   receiver obtained from `UpdateCoordinator::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{DelaySource, Event, EventKind};
