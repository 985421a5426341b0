#![warn(clippy::unwrap_used)]

//! Host-page side of the booking widget bridge: origin checks, event
//! deduplication, analytics transport selection and delivery (GA4 `gtag`
//! or the tag manager data layer), and iframe auto-height.
//!
//! # Modules
//!
//! - [`router`]: Single entry point for inbound cross-document messages
//! - [`dispatcher`]: Event delivery with data layer fallback
//! - [`adaptors`]: Transport adaptors (`gtag`, data layer)
//! - [`transport`]: One-shot transport resolution
//! - [`host`]: Host page analytics environment and measurement-id detection
//! - [`height`]: Iframe height clamping with a cached element handle
//! - [`dom`]: Host document abstraction
//! - [`dedup`]: Bounded replay suppression
//! - [`origin`]: Sender allow-list

pub mod adaptors;
pub mod dedup;
pub mod dispatcher;
pub mod dom;
pub mod height;
pub mod host;
pub mod origin;
pub mod router;
pub mod transport;

pub use adaptors::data_layer::DataLayerAdaptor;
pub use adaptors::gtag::GtagAdaptor;
pub use adaptors::DeliveryAdaptor;
pub use dedup::DedupCache;
pub use dispatcher::EventDispatcher;
pub use dom::{FrameElement, HostDocument, InMemoryDocument, InMemoryFrame};
pub use height::HeightController;
pub use host::{GtagTransport, HostEnvironment, RecordingGtag};
pub use origin::OriginValidator;
pub use router::{IgnoreReason, MessageBridge, MessageOutcome};
pub use transport::ResolvedTransport;
