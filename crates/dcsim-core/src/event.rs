//! Simulation events.

use downcast_rs::{impl_downcast, Downcast};
use serde::ser::Serialize;

use crate::component::Id;

/// Identifier of an event, assigned in creation order.
pub type EventId = u64;

/// Trait for event payloads.
///
/// Any serializable struct can be used as a payload; handlers downcast it
/// back to the concrete type via the [`cast!`](crate::cast!) macro.
pub trait EventData: Downcast + erased_serde::Serialize {}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {}

/// An event scheduled for delivery at some simulation time.
///
/// Events carry no ordering of their own; delivery order (earliest time
/// first, ties by ascending id) is a property of the event queue.
pub struct Event {
    /// Unique identifier, assigned in creation order.
    pub id: EventId,
    /// Simulation time of delivery.
    pub time: f64,
    /// Identifier of the component that emitted the event.
    pub src: Id,
    /// Identifier of the destination component.
    pub dst: Id,
    /// Payload.
    pub data: Box<dyn EventData>,
}
