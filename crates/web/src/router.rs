//! Message router: the single entry point for cross-document messages
//! posted by the booking widget.
//!
//! Every message is handled to completion on the caller's stack. Nothing
//! that goes wrong with one message is surfaced to the caller or affects
//! the next one; failures end in an [`MessageOutcome::Ignored`] outcome.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use la_bridge_core::{BridgeConfig, DataBag, EventPayload, InboundMessage};

use crate::dedup::DedupCache;
use crate::dispatcher::EventDispatcher;
use crate::dom::HostDocument;
use crate::height::HeightController;
use crate::host::HostEnvironment;
use crate::origin::OriginValidator;
use crate::transport::{resolve, ResolvedTransport};

/// Event names with this prefix belong to the tag manager itself.
pub const INTERNAL_EVENT_PREFIX: &str = "gtm.";

/// Why a message produced no side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OriginRejected,
    Untyped,
    InvalidHeight,
    HeightNotApplied,
    ForeignType,
    InvalidPayload,
    InternalEvent,
}

/// What handling one message did.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    Ignored(IgnoreReason),
    Duplicate,
    Resized(f64),
    /// `delivered` is false when the data layer fallback carried the event.
    Dispatched { delivered: bool },
}

pub struct MessageBridge {
    origins: OriginValidator,
    dedup: DedupCache,
    dispatcher: EventDispatcher,
    height: HeightController,
    transport: ResolvedTransport,
}

impl MessageBridge {
    /// Resolve the transport, wire the components, and announce the bridge
    /// with a single `<prefix>bridge_ready` data layer record.
    pub fn init(
        config: &BridgeConfig,
        env: Arc<HostEnvironment>,
        document: Arc<dyn HostDocument>,
    ) -> Self {
        let transport = resolve(config, &env.snapshot());
        let prefix = &config.event_prefix;

        let mut ready = DataBag::new();
        ready.insert("event".into(), json!(format!("{prefix}bridge_ready")));
        ready.insert(format!("{prefix}bridge_mode"), json!(transport.mode.as_str()));
        ready.insert(
            format!("{prefix}bridge_measurement_id"),
            json!(transport.measurement_id.as_deref().unwrap_or("auto")),
        );
        env.data_layer().push(Value::Object(ready));

        let origins = OriginValidator::from_config(config);
        info!(
            mode = %transport.mode,
            allowed_origins = %origins.allowed().join(", "),
            "bridge initialized"
        );

        Self {
            origins,
            dedup: DedupCache::default(),
            dispatcher: EventDispatcher::new(&transport, env, prefix),
            height: HeightController::new(config, document),
            transport,
        }
    }

    pub fn transport(&self) -> &ResolvedTransport {
        &self.transport
    }

    pub fn dedup(&self) -> &DedupCache {
        &self.dedup
    }

    /// Handle one inbound message from `origin`.
    pub fn on_message(&mut self, origin: &str, data: &Value) -> MessageOutcome {
        let outcome = self.route(origin, data);
        match outcome {
            MessageOutcome::Ignored(IgnoreReason::OriginRejected) => {
                metrics::counter!("bridge.messages.rejected").increment(1)
            }
            MessageOutcome::Ignored(_) => metrics::counter!("bridge.messages.ignored").increment(1),
            MessageOutcome::Duplicate => {
                metrics::counter!("bridge.messages.duplicate").increment(1)
            }
            MessageOutcome::Resized(_) | MessageOutcome::Dispatched { .. } => {
                metrics::counter!("bridge.messages.handled").increment(1)
            }
        }
        outcome
    }

    fn route(&mut self, origin: &str, data: &Value) -> MessageOutcome {
        if !self.origins.is_allowed(origin) {
            return MessageOutcome::Ignored(IgnoreReason::OriginRejected);
        }

        let Some(message) = InboundMessage::classify(data) else {
            return MessageOutcome::Ignored(IgnoreReason::Untyped);
        };

        let payload = match message {
            InboundMessage::HeightReport { height: None } => {
                return MessageOutcome::Ignored(IgnoreReason::InvalidHeight);
            }
            InboundMessage::HeightReport {
                height: Some(height),
            } => {
                return match self.height.apply_height(height) {
                    Some(applied) => MessageOutcome::Resized(applied),
                    None => MessageOutcome::Ignored(IgnoreReason::HeightNotApplied),
                };
            }
            InboundMessage::Other { .. } => {
                return MessageOutcome::Ignored(IgnoreReason::ForeignType);
            }
            InboundMessage::AnalyticsEvent { payload } => payload,
        };

        let Some(event) = EventPayload::from_value(payload) else {
            debug!(message = %data, "invalid event payload");
            return MessageOutcome::Ignored(IgnoreReason::InvalidPayload);
        };

        if event.event_name.starts_with(INTERNAL_EVENT_PREFIX) {
            return MessageOutcome::Ignored(IgnoreReason::InternalEvent);
        }

        if !self.dedup.insert(&event.dedup_key()) {
            debug!(event_name = %event.event_name, "duplicate event skipped");
            return MessageOutcome::Duplicate;
        }

        debug!(origin, event_name = %event.event_name, "event received");
        let delivered = self.dispatcher.dispatch(&event.event_name, event.data);
        MessageOutcome::Dispatched { delivered }
    }
}
