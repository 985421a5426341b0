//! Delivery adaptors for the host page's analytics transports.
//!
//! Each adaptor implements [`DeliveryAdaptor`] to hand a named event and
//! its data bag to one transport: a direct `gtag` call or a data layer push.

pub mod data_layer;
pub mod gtag;

use la_bridge_core::{BridgeResult, DataBag};

/// Adaptor trait: delivers an event to one analytics transport.
pub trait DeliveryAdaptor: Send + Sync {
    /// Transport identifier (e.g. "gtag", "dataLayer").
    fn platform(&self) -> &str;

    /// Deliver `event_name` with `data`. An `Err` means the transport was
    /// unavailable or rejected the call.
    fn deliver(&self, event_name: &str, data: &DataBag) -> BridgeResult<()>;
}
