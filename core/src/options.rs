use serde::{Deserialize, Serialize};

/// Engine behaviour switches.
///
/// Usually loaded from the `[engine]` table of a TOML file:
///
/// ```toml
/// validate_on_next = true
/// run_hooks = true
/// back_button_default = true
/// next_button_default = true
/// timeline_limit = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Enforce page validation before `next`.
    pub validate_on_next: bool,
    /// Invoke registered page events.
    pub run_hooks: bool,
    /// Back button visibility when a page does not say.
    pub back_button_default: bool,
    /// Next button visibility when a page does not say.
    pub next_button_default: bool,
    /// Most recent timeline events kept per engine; older ones are dropped.
    pub timeline_limit: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            validate_on_next: true,
            run_hooks: true,
            back_button_default: true,
            next_button_default: true,
            timeline_limit: 1000,
        }
    }
}

impl EngineOptions {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let options = EngineOptions::from_toml_str("validate_on_next = false").unwrap();
        assert!(!options.validate_on_next);
        assert!(options.run_hooks);
        assert!(options.next_button_default);
        assert_eq!(options.timeline_limit, 1000);

        let options = EngineOptions::from_toml_str("timeline_limit = 5").unwrap();
        assert_eq!(options.timeline_limit, 5);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(EngineOptions::from_toml_str("run_hooks = \"yes\"").is_err());
    }
}
