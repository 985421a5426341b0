//! One-shot choice of analytics transport.

use serde::Serialize;
use tracing::debug;

use la_bridge_core::{BridgeConfig, ModeRequest, TransportMode};

use crate::host::{detect_measurement_id, EnvironmentSnapshot};

/// Transport chosen at startup, fixed for the page lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTransport {
    pub mode: TransportMode,
    /// Routing id attached as `send_to`. May stay unresolved; delivery
    /// works without it.
    pub measurement_id: Option<String>,
}

/// Decide the transport from configuration and the environment snapshot.
///
/// An explicit mode wins. In auto mode a configured measurement id selects
/// `gtag`; otherwise a present `gtag` function selects it along with
/// whatever id detection finds; otherwise the data layer is used.
pub fn resolve(config: &BridgeConfig, snapshot: &EnvironmentSnapshot) -> ResolvedTransport {
    let resolved = match config.mode {
        ModeRequest::Gtag => ResolvedTransport {
            mode: TransportMode::Gtag,
            measurement_id: config.measurement_id.clone(),
        },
        ModeRequest::DataLayer => ResolvedTransport {
            mode: TransportMode::DataLayer,
            measurement_id: config.measurement_id.clone(),
        },
        ModeRequest::Auto => match &config.measurement_id {
            Some(id) => ResolvedTransport {
                mode: TransportMode::Gtag,
                measurement_id: Some(id.clone()),
            },
            None if snapshot.gtag_available => ResolvedTransport {
                mode: TransportMode::Gtag,
                measurement_id: detect_measurement_id(snapshot),
            },
            None => ResolvedTransport {
                mode: TransportMode::DataLayer,
                measurement_id: None,
            },
        },
    };

    debug!(
        mode = %resolved.mode,
        measurement_id = resolved.measurement_id.as_deref().unwrap_or("(auto)"),
        "transport resolved"
    );

    resolved
}
