//! The tag manager's data layer: a process-wide, append-only queue of JSON
//! records.
//!
//! The bridge owns one `Arc<DataLayer>` created at startup (empty, or seeded
//! with whatever the page already pushed) and injects it into every component
//! that delivers through it. Pushes are serialized, so record order equals
//! processing order.

use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug, Default)]
pub struct DataLayer {
    records: Mutex<Vec<Value>>,
}

impl DataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from records the page pushed before the bridge loaded.
    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Append a record to the end of the queue.
    pub fn push(&self, record: Value) {
        self.records.lock().push(record);
    }

    /// Snapshot of all records in push order.
    pub fn records(&self) -> Vec<Value> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Records whose `event` field equals `event`.
    pub fn count_event(&self, event: &str) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.get("event").and_then(Value::as_str) == Some(event))
            .count()
    }
}
