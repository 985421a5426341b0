#![warn(clippy::unwrap_used)]

//! Shared building blocks for the booking-widget message bridge: process-wide
//! configuration, the error taxonomy, wire/data types, and the data layer
//! queue consumed by the tag manager.

pub mod config;
pub mod data_layer;
pub mod error;
pub mod types;

pub use config::{BridgeConfig, ModeRequest};
pub use data_layer::DataLayer;
pub use error::{BridgeError, BridgeResult};
pub use types::{is_truthy, DataBag, EventPayload, InboundMessage, TransportMode};
