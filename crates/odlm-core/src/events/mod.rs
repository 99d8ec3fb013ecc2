//! Watch events for the resource store.
//!
//! Every successful write to the store is published on an [`EventBus`] as a
//! [`WatchEvent`]. Consumers (the reconcile scheduler) subscribe and map events
//! back to the keys they need to re-evaluate.
//!
//! ```text
//!   store write ──► EventBus (tokio::sync::broadcast) ──► subscriber 1
//!                                                     └─► subscriber 2
//! ```

pub mod bus;
pub mod types;

pub use bus::EventBus;
pub use types::{WatchEvent, WatchEventType};
