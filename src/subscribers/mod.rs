//! Event subscribers and fan-out.
//!
//! - [`Subscribe`] extension trait for consumers of coordinator events
//! - [`SubscriberSet`] bounded, panic-isolated fan-out to many subscribers
//! - [`LogWriter`] forwards events to `tracing`
//! - [`HealthTracker`] keeps a queryable [`HealthSnapshot`]

mod health;
mod log;
mod set;
mod subscribe;

pub use health::{HealthSnapshot, HealthTracker};
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
