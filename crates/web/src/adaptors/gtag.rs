//! Google Analytics 4 `gtag` adaptor: filters bridge events down to the
//! parameters GA4 recommends for each ecommerce event and calls the page's
//! `gtag('event', ...)` function.

use std::sync::Arc;

use tracing::debug;

use la_bridge_core::{BridgeError, BridgeResult, DataBag};

use super::DeliveryAdaptor;
use crate::host::HostEnvironment;

/// Routing parameter naming the GA4 property.
pub const SEND_TO_PARAM: &str = "send_to";

/// Allowed GA4 parameters per recommended event. `booking_type` and
/// `is_quote` let reports split quotes from reservations.
pub fn ga4_params(event_name: &str) -> Option<&'static [&'static str]> {
    let params: &'static [&'static str] = match event_name {
        "purchase" => &[
            "transaction_id",
            "value",
            "currency",
            "items",
            "coupon",
            "shipping",
            "tax",
            "booking_type",
            "is_quote",
        ],
        "begin_checkout" => &["value", "currency", "items", "coupon", "booking_type", "is_quote"],
        "add_to_cart" | "view_item" => &["value", "currency", "items", "booking_type", "is_quote"],
        "view_item_list" => &[
            "item_list_id",
            "item_list_name",
            "items",
            "booking_type",
            "is_quote",
        ],
        "select_item" => &[
            "item_list_id",
            "item_list_name",
            "items",
            "value",
            "currency",
            "booking_type",
            "is_quote",
        ],
        "add_payment_info" => &[
            "value",
            "currency",
            "payment_type",
            "items",
            "coupon",
            "booking_type",
            "is_quote",
        ],
        "add_shipping_info" => &[
            "value",
            "currency",
            "shipping_tier",
            "items",
            "coupon",
            "booking_type",
            "is_quote",
        ],
        "add_contact_info" => &["booking_type", "is_quote"],
        "form_start" => &["form_id", "form_name", "form_destination", "first_field"],
        "generate_lead" => &[
            "value",
            "currency",
            "lead_source",
            "transaction_id",
            "booking_type",
            "is_quote",
        ],
        _ => return None,
    };
    Some(params)
}

/// Direct-call adaptor over the page's `gtag` function.
pub struct GtagAdaptor {
    env: Arc<HostEnvironment>,
    measurement_id: Option<String>,
}

impl GtagAdaptor {
    pub fn new(env: Arc<HostEnvironment>, measurement_id: Option<String>) -> Self {
        Self {
            env,
            measurement_id,
        }
    }

    /// Build the `gtag` parameter object. Known GA4 events keep only their
    /// allow-listed keys; unknown events pass everything but `event` through.
    pub fn build_params(&self, event_name: &str, data: &DataBag) -> DataBag {
        let mut params: DataBag = match ga4_params(event_name) {
            Some(allowed) => allowed
                .iter()
                .filter_map(|key| data.get(*key).map(|v| (key.to_string(), v.clone())))
                .collect(),
            None => {
                let mut passthrough = data.clone();
                passthrough.remove("event");
                passthrough
            }
        };

        if let Some(ref id) = self.measurement_id {
            params.insert(SEND_TO_PARAM.into(), serde_json::json!(id));
        }
        params
    }
}

impl DeliveryAdaptor for GtagAdaptor {
    fn platform(&self) -> &str {
        "gtag"
    }

    fn deliver(&self, event_name: &str, data: &DataBag) -> BridgeResult<()> {
        let gtag = self
            .env
            .gtag()
            .ok_or_else(|| BridgeError::Transport("gtag is not available on the page".into()))?;

        let params = self.build_params(event_name, data);
        debug!(
            event_name,
            param_count = params.len(),
            measurement_id = self.measurement_id.as_deref().unwrap_or("(auto)"),
            "firing gtag event"
        );
        gtag.event(event_name, &params)
    }
}
