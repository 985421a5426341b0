use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};

/// Allowed-origin entry that trusts every sender.
pub const WILDCARD_ORIGIN: &str = "*";

/// Which analytics transport the host asked for. Deserializes through
/// [`ModeRequest::parse_lenient`], so unrecognised values mean `Auto` on
/// every configuration path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ModeRequest {
    #[default]
    Auto,
    Gtag,
    DataLayer,
}

impl ModeRequest {
    /// Parse the markup value. Anything that is not an explicit transport
    /// name means auto detection.
    pub fn parse_lenient(value: &str) -> Self {
        match value {
            "gtag" => ModeRequest::Gtag,
            "dataLayer" => ModeRequest::DataLayer,
            _ => ModeRequest::Auto,
        }
    }
}

impl From<String> for ModeRequest {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

/// Bridge configuration. Built once at startup and never mutated.
///
/// Loaded from environment variables with the prefix `LA_BRIDGE__`, an
/// optional TOML file, or the `data-*` attributes of the host script tag.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub measurement_id: Option<String>,
    #[serde(default)]
    pub mode: ModeRequest,
    #[serde(default = "default_event_prefix")]
    pub event_prefix: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_iframe_selector")]
    pub iframe_selector: String,
    /// Lower height bound in pixels. From markup, zero, negative and
    /// out-of-range values fall back to the default.
    #[serde(default = "default_min_height")]
    pub min_height: u32,
    /// Upper height bound in pixels; same fallback rule as `min_height`.
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    #[serde(default = "default_enable_height_resize")]
    pub enable_height_resize: bool,
}

// Default functions
fn default_event_prefix() -> String {
    "la_".to_string()
}
fn default_allowed_origins() -> Vec<String> {
    vec!["https://book.mylimobiz.com".to_string()]
}
fn default_iframe_selector() -> String {
    r#"iframe[src*="book.mylimobiz.com"]"#.to_string()
}
fn default_min_height() -> u32 {
    400
}
fn default_max_height() -> u32 {
    2000
}
fn default_enable_height_resize() -> bool {
    true
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            measurement_id: None,
            mode: ModeRequest::default(),
            event_prefix: default_event_prefix(),
            allowed_origins: default_allowed_origins(),
            debug: false,
            iframe_selector: default_iframe_selector(),
            min_height: default_min_height(),
            max_height: default_max_height(),
            enable_height_resize: default_enable_height_resize(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from an optional TOML file, overridden by
    /// `LA_BRIDGE__*` environment variables.
    pub fn load_with_file(path: Option<impl AsRef<Path>>) -> BridgeResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_ref()).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("LA_BRIDGE")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins"),
            )
            .build()?;

        let mut loaded: BridgeConfig = config.try_deserialize()?;
        loaded.allowed_origins = trim_origins(loaded.allowed_origins.iter().map(String::as_str));
        debug!(
            mode = ?loaded.mode,
            origins = loaded.allowed_origins.len(),
            "bridge configuration loaded"
        );
        Ok(loaded)
    }

    /// Build configuration from the `data-*` attributes of the host script
    /// tag. Keys are the attribute names including the `data-` prefix.
    /// Empty or unparsable values fall back to the defaults.
    pub fn from_data_attributes(attrs: &HashMap<String, String>) -> Self {
        let get = |name: &str| attrs.get(name).map(String::as_str).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            measurement_id: get("data-measurement-id").map(str::to_string),
            mode: get("data-mode")
                .map(ModeRequest::parse_lenient)
                .unwrap_or_default(),
            event_prefix: get("data-event-prefix")
                .map(str::to_string)
                .unwrap_or(defaults.event_prefix),
            allowed_origins: get("data-allowed-origins")
                .map(|raw| trim_origins(raw.split(',')))
                .unwrap_or(defaults.allowed_origins),
            debug: get("data-debug") == Some("true"),
            iframe_selector: get("data-iframe-selector")
                .map(str::to_string)
                .unwrap_or(defaults.iframe_selector),
            min_height: get("data-min-height")
                .and_then(parse_leading_int)
                .unwrap_or(defaults.min_height),
            max_height: get("data-max-height")
                .and_then(parse_leading_int)
                .unwrap_or(defaults.max_height),
            enable_height_resize: get("data-enable-height-resize") != Some("false"),
        }
    }

    /// True when the allow-list contains the wildcard entry.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == WILDCARD_ORIGIN)
    }

    /// Sanity-check the loaded values. Origins are only checked for shape;
    /// they are stored and matched verbatim.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.event_prefix.is_empty() {
            return Err(BridgeError::Config("event_prefix must not be empty".into()));
        }
        if self.min_height > self.max_height {
            return Err(BridgeError::Config(format!(
                "min_height ({}) must not exceed max_height ({})",
                self.min_height, self.max_height
            )));
        }
        if self.iframe_selector.trim().is_empty() {
            return Err(BridgeError::Config("iframe_selector must not be empty".into()));
        }
        for origin in &self.allowed_origins {
            if origin == WILDCARD_ORIGIN {
                continue;
            }
            let parsed = url::Url::parse(origin).map_err(|e| {
                BridgeError::Config(format!("allowed origin '{origin}' is not a URL: {e}"))
            })?;
            if parsed.origin().ascii_serialization() != *origin {
                return Err(BridgeError::Config(format!(
                    "allowed origin '{origin}' must be a bare scheme://host[:port] origin"
                )));
            }
        }
        Ok(())
    }
}

fn trim_origins<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    raw.map(str::trim).map(str::to_string).collect()
}

/// Base-10 leading-integer parse in the manner of the browser's `parseInt`.
/// Zero and negative values are treated as absent.
fn parse_leading_int(value: &str) -> Option<u32> {
    let trimmed = value.trim_start();
    let digits: String = trimmed
        .strip_prefix('+')
        .unwrap_or(trimmed)
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().filter(|v| *v > 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.event_prefix, "la_");
        assert_eq!(config.allowed_origins, vec!["https://book.mylimobiz.com"]);
        assert_eq!(config.mode, ModeRequest::Auto);
        assert_eq!(config.min_height, 400);
        assert_eq!(config.max_height, 2000);
        assert!(config.enable_height_resize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_data_attributes() {
        let config = BridgeConfig::from_data_attributes(&attrs(&[
            ("data-measurement-id", "G-ABC123"),
            ("data-mode", "dataLayer"),
            ("data-event-prefix", "booking_"),
            (
                "data-allowed-origins",
                "https://book.mylimobiz.com, https://staging.mylimobiz.com",
            ),
            ("data-debug", "true"),
            ("data-min-height", "300px"),
            ("data-max-height", "2500"),
            ("data-enable-height-resize", "false"),
        ]));

        assert_eq!(config.measurement_id.as_deref(), Some("G-ABC123"));
        assert_eq!(config.mode, ModeRequest::DataLayer);
        assert_eq!(config.event_prefix, "booking_");
        assert_eq!(
            config.allowed_origins,
            vec!["https://book.mylimobiz.com", "https://staging.mylimobiz.com"]
        );
        assert!(config.debug);
        assert_eq!(config.min_height, 300);
        assert_eq!(config.max_height, 2500);
        assert!(!config.enable_height_resize);
    }

    #[test]
    fn test_data_attribute_fallbacks() {
        let config = BridgeConfig::from_data_attributes(&attrs(&[
            ("data-mode", "bogus"),
            ("data-event-prefix", ""),
            ("data-debug", "yes"),
            ("data-min-height", "abc"),
            ("data-max-height", "0"),
            ("data-enable-height-resize", "no"),
        ]));

        assert_eq!(config.mode, ModeRequest::Auto);
        assert_eq!(config.event_prefix, "la_");
        assert!(!config.debug);
        assert_eq!(config.min_height, 400);
        assert_eq!(config.max_height, 2000);
        assert!(config.enable_height_resize);
        assert!(config.measurement_id.is_none());
    }

    #[test]
    fn test_wildcard_origin() {
        let config = BridgeConfig::from_data_attributes(&attrs(&[("data-allowed-origins", "*")]));
        assert!(config.allows_any_origin());
        assert!(config.validate().is_ok());
        assert!(!BridgeConfig::default().allows_any_origin());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let inverted = BridgeConfig {
            min_height: 900,
            max_height: 100,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let with_path = BridgeConfig {
            allowed_origins: vec!["https://book.mylimobiz.com/path".into()],
            ..Default::default()
        };
        assert!(with_path.validate().is_err());

        let not_url = BridgeConfig {
            allowed_origins: vec!["book.mylimobiz.com".into()],
            ..Default::default()
        };
        assert!(not_url.validate().is_err());

        let no_prefix = BridgeConfig {
            event_prefix: String::new(),
            ..Default::default()
        };
        assert!(no_prefix.validate().is_err());
    }

    #[test]
    fn test_mode_request_deserialize() {
        let mode: ModeRequest = serde_json::from_str(r#""dataLayer""#).unwrap();
        assert_eq!(mode, ModeRequest::DataLayer);
        let mode: ModeRequest = serde_json::from_str(r#""gtag""#).unwrap();
        assert_eq!(mode, ModeRequest::Gtag);
        let mode: ModeRequest = serde_json::from_str(r#""bogus""#).unwrap();
        assert_eq!(mode, ModeRequest::Auto);
    }

    // The only test touching LA_BRIDGE__* variables, so nothing races it.
    #[test]
    fn test_load_file_then_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(
            &path,
            r#"
mode = "gtag"
min_height = 300
event_prefix = "file_"
allowed_origins = ["https://a.example"]
"#,
        )
        .unwrap();

        std::env::set_var(
            "LA_BRIDGE__ALLOWED_ORIGINS",
            "https://x.example, https://y.example",
        );
        std::env::set_var("LA_BRIDGE__EVENT_PREFIX", "bk_");
        let layered = BridgeConfig::load_with_file(Some(&path));

        std::env::set_var("LA_BRIDGE__MODE", "bogus");
        let lenient = BridgeConfig::load_with_file(Some(&path));

        for key in [
            "LA_BRIDGE__ALLOWED_ORIGINS",
            "LA_BRIDGE__EVENT_PREFIX",
            "LA_BRIDGE__MODE",
        ] {
            std::env::remove_var(key);
        }

        let config = layered.unwrap();
        assert_eq!(config.mode, ModeRequest::Gtag);
        assert_eq!(config.min_height, 300);
        assert_eq!(config.max_height, 2000);
        assert_eq!(config.event_prefix, "bk_");
        assert_eq!(
            config.allowed_origins,
            vec!["https://x.example", "https://y.example"]
        );
        assert!(config.validate().is_ok());

        let config = lenient.unwrap();
        assert_eq!(config.mode, ModeRequest::Auto);
        assert_eq!(config.min_height, 300);
        assert_eq!(config.event_prefix, "bk_");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = BridgeConfig::load_with_file(Some(dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("  640"), Some(640));
        assert_eq!(parse_leading_int("+12abc"), Some(12));
        assert_eq!(parse_leading_int("-5"), None);
        assert_eq!(parse_leading_int(""), None);
    }
}
