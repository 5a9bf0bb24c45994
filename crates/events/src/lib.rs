//! Domain events and change notices.
//!
//! Every successful core write is announced as an [`AggregateChanged`] notice so that
//! caller-side caches can update from the write response instead of reloading.

pub mod bus;
pub mod change;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use change::{AggregateChanged, AggregateRef, ChangeKind};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
