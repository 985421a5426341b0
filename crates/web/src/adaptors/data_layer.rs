//! Data layer adaptor: turns bridge events into prefixed data layer pushes
//! for the page's tag manager container.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use la_bridge_core::{BridgeResult, DataBag, DataLayer};

use super::DeliveryAdaptor;

/// Pushes events onto the data layer, prefixing the event name and every key.
pub struct DataLayerAdaptor {
    data_layer: Arc<DataLayer>,
    prefix: String,
}

impl DataLayerAdaptor {
    pub fn new(data_layer: Arc<DataLayer>, prefix: impl Into<String>) -> Self {
        Self {
            data_layer,
            prefix: prefix.into(),
        }
    }

    /// Build the push record: `event` is `<prefix><event_name>`, every other
    /// key becomes `<prefix><key>`. A caller-supplied `event` key is dropped.
    pub fn build_record(&self, event_name: &str, data: &DataBag) -> Value {
        let mut record = DataBag::new();
        record.insert(
            "event".into(),
            Value::String(format!("{}{}", self.prefix, event_name)),
        );
        for (key, value) in data {
            if key != "event" {
                record.insert(format!("{}{}", self.prefix, key), value.clone());
            }
        }
        Value::Object(record)
    }
}

impl DeliveryAdaptor for DataLayerAdaptor {
    fn platform(&self) -> &str {
        "dataLayer"
    }

    fn deliver(&self, event_name: &str, data: &DataBag) -> BridgeResult<()> {
        let record = self.build_record(event_name, data);
        debug!(event_name, record = %record, "pushing to dataLayer");
        self.data_layer.push(record);
        Ok(())
    }
}
