//! Iframe auto-height: clamps reported content heights and applies them to
//! the booking iframe.

use std::sync::{Arc, Weak};

use tracing::debug;

use la_bridge_core::BridgeConfig;

use crate::dom::{FrameElement, HostDocument};

pub struct HeightController {
    enabled: bool,
    min_height: f64,
    max_height: f64,
    selector: String,
    document: Arc<dyn HostDocument>,
    // Non-owning; revalidated against the document before every reuse.
    cached: Option<Weak<dyn FrameElement>>,
}

impl HeightController {
    pub fn new(config: &BridgeConfig, document: Arc<dyn HostDocument>) -> Self {
        Self {
            enabled: config.enable_height_resize,
            min_height: f64::from(config.min_height),
            max_height: f64::from(config.max_height),
            selector: config.iframe_selector.clone(),
            document,
            cached: None,
        }
    }

    /// Clamp `reported` into `[min_height, max_height]` and set it as the
    /// iframe's pixel height. Returns the applied height, or `None` when
    /// resizing is disabled or no iframe matches.
    pub fn apply_height(&mut self, reported: f64) -> Option<f64> {
        if !self.enabled {
            debug!(height = reported, "height resize disabled, ignoring");
            return None;
        }

        let Some(frame) = self.find_frame() else {
            debug!(selector = %self.selector, "no iframe found for selector");
            return None;
        };

        let clamped = clamp_height(reported, self.min_height, self.max_height);
        frame.set_style_height(&format!("{clamped}px"));
        metrics::counter!("bridge.height.applied").increment(1);
        debug!(height = clamped, raw = reported, "updated iframe height");
        Some(clamped)
    }

    fn find_frame(&mut self) -> Option<Arc<dyn FrameElement>> {
        if let Some(frame) = self.cached.as_ref().and_then(Weak::upgrade) {
            if self.document.contains(&frame) {
                return Some(frame);
            }
        }

        let found = self.document.query_selector(&self.selector);
        self.cached = found.as_ref().map(Arc::downgrade);
        found
    }
}

/// `max(min, min(max, reported))`.
pub fn clamp_height(reported: f64, min_height: f64, max_height: f64) -> f64 {
    reported.min(max_height).max(min_height)
}
