//! Configuration module
//!
//! Discovery-time settings plus the category/feature machinery deciding
//! which fixtures and cases a run includes.

#![allow(dead_code)]

mod features;

pub use features::{TestCategory, TestConfiguration, TestFeature, TestFilter};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Opaque key/value store consulted at discovery and config time only.
///
/// Well-known keys: `repeat` (default suite repeat count), `category`
/// (current category name), `log_level`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsBag {
    values: BTreeMap<String, String>,
}

impl SettingsBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from file, format chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read settings file")?;

        let settings: Self = if path
            .as_ref()
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::from_str(&content).context("Failed to parse YAML settings")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON settings")?
        };

        Ok(settings)
    }

    /// Save settings to file, format chosen by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = if path
            .as_ref()
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::to_string(self).context("Failed to serialize settings")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?
        };

        std::fs::write(path, content).context("Failed to write settings file")?;
        Ok(())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let mut settings = SettingsBag::new();
        settings.set("repeat", "10");
        settings.set("verbose", "true");
        settings.set("category", "Network");

        assert_eq!(settings.get_int("repeat"), Some(10));
        assert_eq!(settings.get_bool("verbose"), Some(true));
        assert_eq!(settings.get("category"), Some("Network"));
        assert_eq!(settings.get_int("category"), None);
        assert_eq!(settings.get("missing"), None);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = SettingsBag::new();
        settings.set("repeat", "3");
        settings.save(&path).unwrap();

        let loaded = SettingsBag::load(&path).unwrap();
        assert_eq!(loaded.get_int("repeat"), Some(3));
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");

        let mut settings = SettingsBag::new();
        settings.set("category", "All");
        settings.save(&path).unwrap();

        let loaded = SettingsBag::load(&path).unwrap();
        assert_eq!(loaded.get("category"), Some("All"));
    }
}
