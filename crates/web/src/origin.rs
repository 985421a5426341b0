//! Origin allow-list for inbound cross-document messages.

use la_bridge_core::config::BridgeConfig;

/// Decides whether a message sender is trusted. Matching is verbatim: no
/// scheme, host-case or port normalisation.
#[derive(Debug, Clone)]
pub struct OriginValidator {
    allowed: Vec<String>,
    allow_any: bool,
}

impl OriginValidator {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            allowed: config.allowed_origins.clone(),
            allow_any: config.allows_any_origin(),
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allow_any || self.allowed.iter().any(|o| o == origin)
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(origins: &[&str]) -> OriginValidator {
        OriginValidator::from_config(&BridgeConfig {
            allowed_origins: origins.iter().map(|o| o.to_string()).collect(),
            ..Default::default()
        })
    }

    #[test]
    fn test_exact_match_only() {
        let validator = validator(&["https://book.mylimobiz.com"]);
        assert!(validator.is_allowed("https://book.mylimobiz.com"));
        assert!(!validator.is_allowed("https://book.mylimobiz.com/"));
        assert!(!validator.is_allowed("http://book.mylimobiz.com"));
        assert!(!validator.is_allowed("https://BOOK.mylimobiz.com"));
        assert!(!validator.is_allowed("https://book.mylimobiz.com:443"));
        assert!(!validator.is_allowed(""));
    }

    #[test]
    fn test_wildcard() {
        let validator = validator(&["https://a.example", "*"]);
        assert!(validator.is_allowed("https://anything.example"));
        assert!(validator.is_allowed("null"));
    }

    #[test]
    fn test_from_config_defaults() {
        let validator = OriginValidator::from_config(&BridgeConfig::default());
        assert_eq!(validator.allowed(), ["https://book.mylimobiz.com"]);
        assert!(!validator.is_allowed("https://evil.example"));
    }
}
