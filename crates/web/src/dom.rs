//! Minimal host-document surface the height controller needs, plus an
//! in-memory document for tests and the headless host.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// An element whose inline height can be set.
pub trait FrameElement: Send + Sync {
    fn set_style_height(&self, value: &str);
}

/// The live document hosting the booking iframe.
pub trait HostDocument: Send + Sync {
    /// First element matching `selector`, if any.
    fn query_selector(&self, selector: &str) -> Option<Arc<dyn FrameElement>>;

    /// Whether `element` is still attached to this document.
    fn contains(&self, element: &Arc<dyn FrameElement>) -> bool;
}

/// An `<iframe>` held by [`InMemoryDocument`].
#[derive(Debug, Default)]
pub struct InMemoryFrame {
    pub id: Option<String>,
    pub src: String,
    style_height: Mutex<Option<String>>,
}

impl InMemoryFrame {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            id: None,
            src: src.into(),
            style_height: Mutex::new(None),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Current inline `style.height`, e.g. `"900px"`.
    pub fn style_height(&self) -> Option<String> {
        self.style_height.lock().clone()
    }

    /// Match a simple iframe selector: `iframe`, `#id`, or an optional
    /// `iframe` tag followed by one `[src=..]`, `[src*=..]` or `[src^=..]`
    /// attribute test.
    fn matches(&self, selector: &str) -> bool {
        let selector = selector.trim();
        if let Some(id) = selector.strip_prefix('#') {
            return self.id.as_deref() == Some(id);
        }

        let rest = selector.strip_prefix("iframe").unwrap_or(selector);
        if rest.is_empty() {
            return selector == "iframe";
        }

        let Some(attr) = rest.strip_prefix("[src").and_then(|r| r.strip_suffix(']')) else {
            return false;
        };
        let (op, value) = match attr.split_once('=') {
            Some((op, value)) => (op, value.trim_matches(|c| c == '"' || c == '\'')),
            None => return false,
        };
        match op {
            "" => self.src == value,
            "*" => self.src.contains(value),
            "^" => self.src.starts_with(value),
            _ => false,
        }
    }
}

impl FrameElement for InMemoryFrame {
    fn set_style_height(&self, value: &str) {
        *self.style_height.lock() = Some(value.to_string());
    }
}

/// Document holding a list of attached iframes in document order.
#[derive(Debug, Default)]
pub struct InMemoryDocument {
    frames: Mutex<Vec<Arc<InMemoryFrame>>>,
    queries: AtomicUsize,
}

impl InMemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, frame: Arc<InMemoryFrame>) {
        self.frames.lock().push(frame);
    }

    /// Remove `frame` from the document. Outstanding handles stay alive
    /// but are no longer contained.
    pub fn detach(&self, frame: &Arc<InMemoryFrame>) {
        self.frames.lock().retain(|f| !Arc::ptr_eq(f, frame));
    }

    /// Number of `query_selector` calls served.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

impl HostDocument for InMemoryDocument {
    fn query_selector(&self, selector: &str) -> Option<Arc<dyn FrameElement>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.frames
            .lock()
            .iter()
            .find(|f| f.matches(selector))
            .map(|f| f.clone() as Arc<dyn FrameElement>)
    }

    fn contains(&self, element: &Arc<dyn FrameElement>) -> bool {
        let target = Arc::as_ptr(element) as *const ();
        self.frames
            .lock()
            .iter()
            .any(|f| Arc::as_ptr(f) as *const () == target)
    }
}
