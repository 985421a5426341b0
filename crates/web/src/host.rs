//! The host page's analytics environment: the data layer queue, the
//! optional `gtag` function, and the tag-id registry the tag library
//! exposes. Transports are looked up here at call time, so a tag library
//! that loads after the bridge is still picked up.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use la_bridge_core::{BridgeError, BridgeResult, DataBag, DataLayer};

/// Prefix of GA4 measurement identifiers.
pub const MEASUREMENT_ID_PREFIX: &str = "G-";

/// Direct-call analytics transport, i.e. `gtag('event', name, params)`.
/// An `Err` is a call that threw.
pub trait GtagTransport: Send + Sync {
    fn event(&self, event_name: &str, params: &DataBag) -> BridgeResult<()>;
}

/// Analytics collaborators present on the host page.
pub struct HostEnvironment {
    data_layer: Arc<DataLayer>,
    gtag: RwLock<Option<Arc<dyn GtagTransport>>>,
    tag_ids: RwLock<Vec<String>>,
}

impl HostEnvironment {
    pub fn new(data_layer: Arc<DataLayer>) -> Self {
        Self {
            data_layer,
            gtag: RwLock::new(None),
            tag_ids: RwLock::new(Vec::new()),
        }
    }

    /// Install (or replace) the page's `gtag` function.
    pub fn install_gtag(&self, gtag: Arc<dyn GtagTransport>) {
        *self.gtag.write() = Some(gtag);
    }

    /// Register a tag id in the tag library's registry.
    pub fn register_tag_id(&self, id: impl Into<String>) {
        self.tag_ids.write().push(id.into());
    }

    pub fn gtag(&self) -> Option<Arc<dyn GtagTransport>> {
        self.gtag.read().clone()
    }

    pub fn data_layer(&self) -> &Arc<DataLayer> {
        &self.data_layer
    }

    /// Point-in-time copy of everything measurement-id detection looks at.
    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            gtag_available: self.gtag.read().is_some(),
            data_layer: self.data_layer.records(),
            tag_ids: self.tag_ids.read().clone(),
        }
    }
}

/// Immutable view of the host environment taken at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSnapshot {
    pub gtag_available: bool,
    pub data_layer: Vec<Value>,
    pub tag_ids: Vec<String>,
}

/// Find the page's GA4 measurement id. Scans `config` commands already on
/// the data layer first, then the tag registry. First match wins.
pub fn detect_measurement_id(snapshot: &EnvironmentSnapshot) -> Option<String> {
    snapshot
        .data_layer
        .iter()
        .find_map(config_command_id)
        .or_else(|| {
            snapshot
                .tag_ids
                .iter()
                .find(|id| id.starts_with(MEASUREMENT_ID_PREFIX))
                .cloned()
        })
}

/// Id of a `gtag('config', id)` record. `gtag` pushes its arguments object,
/// which shows up either index-keyed or as a plain array.
fn config_command_id(record: &Value) -> Option<String> {
    let (command, id) = match record {
        Value::Object(map) => (map.get("0")?, map.get("1")?),
        Value::Array(items) => (items.first()?, items.get(1)?),
        _ => return None,
    };
    if command.as_str() != Some("config") {
        return None;
    }
    id.as_str()
        .filter(|id| id.starts_with(MEASUREMENT_ID_PREFIX))
        .map(str::to_string)
}

/// `GtagTransport` that records every call, optionally failing each one.
#[derive(Default)]
pub struct RecordingGtag {
    calls: Mutex<Vec<(String, DataBag)>>,
    fail: bool,
}

impl RecordingGtag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every call fails after being recorded.
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<(String, DataBag)> {
        self.calls.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl GtagTransport for RecordingGtag {
    fn event(&self, event_name: &str, params: &DataBag) -> BridgeResult<()> {
        self.calls
            .lock()
            .push((event_name.to_string(), params.clone()));
        if self.fail {
            return Err(BridgeError::Transport(format!(
                "gtag rejected event '{event_name}'"
            )));
        }
        Ok(())
    }
}
