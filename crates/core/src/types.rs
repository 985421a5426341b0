//! Wire and data types shared by the bridge: the inbound message envelope
//! posted by the booking widget, the analytics event it carries, and the
//! resolved transport mode.

use serde::Serialize;
use serde_json::Value;

/// Event parameters as posted by the widget.
pub type DataBag = serde_json::Map<String, Value>;

/// `type` discriminator of height reports.
pub const HEIGHT_MESSAGE_TYPE: &str = "LA_IFRAME_HEIGHT";
/// `type` discriminator of analytics events.
pub const EVENT_MESSAGE_TYPE: &str = "LA_DATALAYER_EVENT";

/// Analytics transport the bridge delivers through.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum TransportMode {
    /// Direct `gtag('event', ...)` calls.
    #[serde(rename = "gtag")]
    Gtag,
    /// Pushes onto the tag manager's data layer queue.
    #[serde(rename = "dataLayer")]
    DataLayer,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Gtag => "gtag",
            TransportMode::DataLayer => "dataLayer",
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Truthiness of a JSON value as the widget's script would see it.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A classified inbound cross-document message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage<'a> {
    /// Height report. `height` is set only for finite, strictly positive numbers.
    HeightReport { height: Option<f64> },
    /// Analytics event envelope; the payload is validated separately.
    AnalyticsEvent { payload: Option<&'a Value> },
    /// Any other typed message sharing the channel.
    Other { message_type: &'a Value },
}

impl<'a> InboundMessage<'a> {
    /// Classify raw message data. Returns `None` for non-objects and for
    /// objects without a truthy `type`.
    pub fn classify(data: &'a Value) -> Option<Self> {
        let message_type = data.as_object()?.get("type").filter(|t| is_truthy(t))?;

        let message = match message_type.as_str() {
            Some(HEIGHT_MESSAGE_TYPE) => InboundMessage::HeightReport {
                height: data
                    .get("height")
                    .and_then(Value::as_f64)
                    .filter(|h| h.is_finite() && *h > 0.0),
            },
            Some(EVENT_MESSAGE_TYPE) => InboundMessage::AnalyticsEvent {
                payload: data.get("payload"),
            },
            _ => InboundMessage::Other { message_type },
        };
        Some(message)
    }
}

/// The analytics event carried by an `LA_DATALAYER_EVENT` message.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub event_name: String,
    /// Sender timestamp rendered as the dedup key component.
    pub timestamp: String,
    pub data: DataBag,
}

impl EventPayload {
    /// Extract the event from a payload value. Returns `None` when the
    /// payload is missing or carries no usable `eventName`.
    pub fn from_value(payload: Option<&Value>) -> Option<Self> {
        let payload = payload.filter(|p| is_truthy(p))?;
        let event_name = payload
            .get("eventName")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())?
            .to_string();

        let data = match payload.get("data") {
            Some(Value::Object(map)) => map.clone(),
            _ => DataBag::new(),
        };

        Some(Self {
            event_name,
            timestamp: render_timestamp(payload.get("timestamp")),
            data,
        })
    }

    /// Dedup identity: `"<timestamp>_<eventName>"`.
    pub fn dedup_key(&self) -> String {
        format!("{}_{}", self.timestamp, self.event_name)
    }
}

/// Render the sender's timestamp the way string concatenation would.
fn render_timestamp(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::String(s)) => s.clone(),
        // Integral floats drop the fraction, so `1.0` and `1` share a key.
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() => format!("{f}"),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}
