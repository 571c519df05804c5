//! Categories, features and the run filter
//!
//! Categories partition test selection; features gate tests on optional
//! capabilities of the environment. Both are registered once per process
//! and identified by name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::SettingsBag;

/// Named partition of the test selection. `All` is the universal category.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestCategory {
    name: String,
}

impl TestCategory {
    pub const ALL: &'static str = "All";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn all() -> Self {
        Self::new(Self::ALL)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_all(&self) -> bool {
        self.name == Self::ALL
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Optional capability a test may require.
///
/// Tri-state: forced on or off by a constant, otherwise defaultable and
/// settable through the configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestFeature {
    name: String,
    description: String,
    constant: Option<bool>,
    default: bool,
}

impl TestFeature {
    pub fn new(name: impl Into<String>, description: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            constant: None,
            default,
        }
    }

    /// A feature pinned on or off for the whole process.
    pub fn constant(name: impl Into<String>, description: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            constant: Some(value),
            default: value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn constant_value(&self) -> Option<bool> {
        self.constant
    }

    pub fn default_value(&self) -> bool {
        self.default
    }

    pub fn can_modify(&self) -> bool {
        self.constant.is_none()
    }
}

/// Registered categories and features plus the current selection state.
#[derive(Clone, Debug, Default)]
pub struct TestConfiguration {
    categories: Vec<TestCategory>,
    features: Vec<TestFeature>,
    current_category: Option<TestCategory>,
    enabled: BTreeMap<String, bool>,
}

impl TestConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the current category and feature states from settings.
    ///
    /// Recognized keys: `category`, `feature.<name>` = `true`/`false`.
    pub fn from_settings(settings: &SettingsBag) -> Self {
        let mut config = Self::new();
        if let Some(name) = settings.get("category") {
            config.current_category = Some(TestCategory::new(name));
        }
        for (key, value) in settings.iter() {
            if let Some(name) = key.strip_prefix("feature.") {
                if let Ok(enabled) = value.parse() {
                    config.enabled.insert(name.to_string(), enabled);
                }
            }
        }
        config
    }

    pub fn register_category(&mut self, category: TestCategory) {
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
    }

    pub fn register_feature(&mut self, feature: TestFeature) {
        if !self.features.iter().any(|f| f.name() == feature.name()) {
            self.features.push(feature);
        }
    }

    pub fn categories(&self) -> &[TestCategory] {
        &self.categories
    }

    pub fn features(&self) -> &[TestFeature] {
        &self.features
    }

    /// Current category; `All` when none was selected.
    pub fn current_category(&self) -> TestCategory {
        self.current_category.clone().unwrap_or_else(TestCategory::all)
    }

    pub fn set_current_category(&mut self, category: TestCategory) {
        self.current_category = Some(category);
    }

    /// Enable or disable a feature. Constants are not modifiable.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        let pinned = self
            .features
            .iter()
            .find(|f| f.name() == name)
            .is_some_and(|f| !f.can_modify());
        if !pinned {
            self.enabled.insert(name.to_string(), enabled);
        }
    }

    /// Constant value, else explicit setting, else registered default.
    pub fn is_enabled(&self, name: &str) -> bool {
        if let Some(feature) = self.features.iter().find(|f| f.name() == name) {
            if let Some(constant) = feature.constant_value() {
                return constant;
            }
            return self
                .enabled
                .get(name)
                .copied()
                .unwrap_or(feature.default_value());
        }
        self.enabled.get(name).copied().unwrap_or(false)
    }
}

/// Decides inclusion of a fixture or case from its declared categories and
/// required features.
#[derive(Clone, Debug, Default)]
pub struct TestFilter {
    config: TestConfiguration,
}

impl TestFilter {
    pub fn new(config: TestConfiguration) -> Self {
        Self { config }
    }

    pub fn configuration(&self) -> &TestConfiguration {
        &self.config
    }

    /// Inclusion rules: the current category must match one of the declared
    /// categories (or be `All`, or the declaration be empty), and every
    /// required feature must be enabled.
    pub fn matches(&self, categories: &[TestCategory], required_features: &[String]) -> bool {
        let current = self.config.current_category();
        let category_ok =
            current.is_all() || categories.is_empty() || categories.contains(&current);
        category_ok
            && required_features
                .iter()
                .all(|feature| self.config.is_enabled(feature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_filtering() {
        let mut config = TestConfiguration::new();
        config.set_current_category(TestCategory::new("Network"));
        let filter = TestFilter::new(config);

        let network = vec![TestCategory::new("Network")];
        let storage = vec![TestCategory::new("Storage")];

        assert!(filter.matches(&network, &[]));
        assert!(!filter.matches(&storage, &[]));
        // Undeclared cases always run.
        assert!(filter.matches(&[], &[]));
    }

    #[test]
    fn test_all_category_includes_everything() {
        let filter = TestFilter::default();
        assert!(filter.matches(&[TestCategory::new("Storage")], &[]));
    }

    #[test]
    fn test_feature_gating() {
        let mut config = TestConfiguration::new();
        config.register_feature(TestFeature::new("ipv6", "IPv6 support", false));
        let filter = TestFilter::new(config.clone());
        assert!(!filter.matches(&[], &["ipv6".to_string()]));

        config.set_enabled("ipv6", true);
        let filter = TestFilter::new(config);
        assert!(filter.matches(&[], &["ipv6".to_string()]));
    }

    #[test]
    fn test_constant_feature_is_pinned() {
        let mut config = TestConfiguration::new();
        config.register_feature(TestFeature::constant("dns", "working DNS", false));
        config.set_enabled("dns", true);
        assert!(!config.is_enabled("dns"));
    }

    #[test]
    fn test_seeding_from_settings() {
        let mut settings = SettingsBag::new();
        settings.set("category", "Network");
        settings.set("feature.ipv6", "true");

        let config = TestConfiguration::from_settings(&settings);
        assert_eq!(config.current_category().name(), "Network");
        assert!(config.is_enabled("ipv6"));
    }
}
