//! Event dispatcher: sends one analytics event through the resolved
//! transport, falling back to the data layer whenever `gtag` is missing or
//! fails.

use std::sync::Arc;

use tracing::{debug, warn};

use la_bridge_core::{is_truthy, DataBag, TransportMode};

use crate::adaptors::data_layer::DataLayerAdaptor;
use crate::adaptors::gtag::GtagAdaptor;
use crate::adaptors::DeliveryAdaptor;
use crate::host::HostEnvironment;
use crate::transport::ResolvedTransport;

/// Data bag flag marking diagnostic events that must only reach the data
/// layer, never GA4 conversion reporting.
pub const DEBUG_ONLY_FLAG: &str = "_debug_only";

pub struct EventDispatcher {
    mode: TransportMode,
    gtag: GtagAdaptor,
    data_layer: DataLayerAdaptor,
}

impl EventDispatcher {
    pub fn new(transport: &ResolvedTransport, env: Arc<HostEnvironment>, prefix: &str) -> Self {
        let data_layer = DataLayerAdaptor::new(env.data_layer().clone(), prefix);
        Self {
            mode: transport.mode,
            gtag: GtagAdaptor::new(env, transport.measurement_id.clone()),
            data_layer,
        }
    }

    /// Dispatch `event_name`. Returns whether delivery went through the
    /// requested transport; `false` means the data layer fallback took it.
    pub fn dispatch(&self, event_name: &str, mut data: DataBag) -> bool {
        if data.get(DEBUG_ONLY_FLAG).is_some_and(is_truthy) {
            data.remove(DEBUG_ONLY_FLAG);
            debug!(event_name, "debug-only event, data layer only");
            return self.push(event_name, &data);
        }

        match self.mode {
            TransportMode::Gtag => self.fire_gtag(event_name, &data),
            TransportMode::DataLayer => self.push(event_name, &data),
        }
    }

    fn fire_gtag(&self, event_name: &str, data: &DataBag) -> bool {
        match self.gtag.deliver(event_name, data) {
            Ok(()) => {
                metrics::counter!("bridge.events.gtag").increment(1);
                true
            }
            Err(e) => {
                metrics::counter!("bridge.events.gtag_fallback").increment(1);
                warn!(
                    event_name,
                    platform = self.gtag.platform(),
                    fallback = self.data_layer.platform(),
                    error = %e,
                    "delivery failed, falling back"
                );
                self.push(event_name, data);
                false
            }
        }
    }

    fn push(&self, event_name: &str, data: &DataBag) -> bool {
        match self.data_layer.deliver(event_name, data) {
            Ok(()) => {
                metrics::counter!("bridge.events.data_layer").increment(1);
                true
            }
            Err(e) => {
                warn!(event_name, platform = self.data_layer.platform(), error = %e, "push failed");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::host::RecordingGtag;
    use la_bridge_core::DataLayer;
    use serde_json::{json, Value};

    fn bag(value: Value) -> DataBag {
        value.as_object().unwrap().clone()
    }

    fn setup(
        mode: TransportMode,
        gtag: Option<Arc<RecordingGtag>>,
        measurement_id: Option<&str>,
    ) -> (EventDispatcher, Arc<DataLayer>) {
        let layer = Arc::new(DataLayer::new());
        let env = HostEnvironment::new(layer.clone());
        if let Some(gtag) = gtag {
            env.install_gtag(gtag);
        }
        let transport = ResolvedTransport {
            mode,
            measurement_id: measurement_id.map(str::to_string),
        };
        (EventDispatcher::new(&transport, Arc::new(env), "la_"), layer)
    }

    #[test]
    fn test_gtag_filters_purchase() {
        let gtag = Arc::new(RecordingGtag::new());
        let (dispatcher, layer) = setup(TransportMode::Gtag, Some(gtag.clone()), Some("G-ABC"));

        let delivered = dispatcher.dispatch(
            "purchase",
            bag(json!({ "transaction_id": "R-77", "driver_notes": "gate code 1234" })),
        );

        assert!(delivered);
        assert!(layer.is_empty());
        let calls = gtag.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            Value::Object(calls[0].1.clone()),
            json!({ "transaction_id": "R-77", "send_to": "G-ABC" })
        );
    }

    #[test]
    fn test_gtag_failure_falls_back_unfiltered() {
        let gtag = Arc::new(RecordingGtag::failing());
        let (dispatcher, layer) = setup(TransportMode::Gtag, Some(gtag.clone()), Some("G-ABC"));

        let delivered = dispatcher.dispatch(
            "purchase",
            bag(json!({ "transaction_id": "R-77", "driver_notes": "gate code 1234" })),
        );

        assert!(!delivered);
        assert_eq!(gtag.count(), 1);
        assert_eq!(
            layer.records(),
            vec![json!({
                "event": "la_purchase",
                "la_transaction_id": "R-77",
                "la_driver_notes": "gate code 1234"
            })]
        );
    }

    #[test]
    fn test_missing_gtag_falls_back() {
        let (dispatcher, layer) = setup(TransportMode::Gtag, None, None);
        assert!(!dispatcher.dispatch("view_item", bag(json!({ "value": 10 }))));
        assert_eq!(layer.count_event("la_view_item"), 1);
    }

    #[test]
    fn test_data_layer_mode() {
        let gtag = Arc::new(RecordingGtag::new());
        let (dispatcher, layer) = setup(TransportMode::DataLayer, Some(gtag.clone()), None);

        assert!(dispatcher.dispatch("begin_checkout", bag(json!({ "value": 99 }))));
        assert_eq!(gtag.count(), 0);
        assert_eq!(layer.records()[0]["la_value"], 99);
    }

    #[test]
    fn test_debug_only_bypasses_gtag() {
        let gtag = Arc::new(RecordingGtag::new());
        let (dispatcher, layer) = setup(TransportMode::Gtag, Some(gtag.clone()), None);

        assert!(dispatcher.dispatch(
            "widget_step",
            bag(json!({ "_debug_only": true, "step": "vehicle" }))
        ));
        assert_eq!(gtag.count(), 0);
        assert_eq!(
            layer.records(),
            vec![json!({ "event": "la_widget_step", "la_step": "vehicle" })]
        );
    }

    #[test]
    fn test_falsy_debug_flag_is_forwarded() {
        let gtag = Arc::new(RecordingGtag::new());
        let (dispatcher, layer) = setup(TransportMode::Gtag, Some(gtag.clone()), None);

        assert!(dispatcher.dispatch("widget_step", bag(json!({ "_debug_only": false }))));
        assert!(layer.is_empty());
        assert_eq!(gtag.calls()[0].1["_debug_only"], false);
    }
}
