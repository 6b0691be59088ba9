//! CLI configuration file.
//!
//! ```toml
//! [engine]
//! validate_on_next = false
//! run_hooks = true
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use waymark::EngineOptions;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub engine: EngineOptions,
}

impl CliConfig {
    /// Defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&source).with_context(|| format!("Invalid config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_table_overrides_defaults() {
        let config: CliConfig = toml::from_str("[engine]\nvalidate_on_next = false\n").unwrap();
        assert!(!config.engine.validate_on_next);
        assert!(config.engine.run_hooks);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(Some(dir.path().join("absent.toml").as_path())).is_err());
        assert_eq!(CliConfig::load(None).unwrap().engine, EngineOptions::default());
    }
}
