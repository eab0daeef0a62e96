use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::feature;
use crate::manifest::Manifest;

/// Failure reported by the configuration evaluator.
///
/// When present, the manifest list of the same load result is incomplete and
/// must never be used to decide what to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadError(String);

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for LoadError {}

/// Output of evaluating one configuration script.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadResult {
    #[serde(default)]
    pub manifests: Vec<Manifest>,
    #[serde(default)]
    pub error: Option<LoadError>,
    #[serde(default)]
    pub feature_flags: BTreeMap<String, bool>,
}

impl LoadResult {
    pub fn new(manifests: Vec<Manifest>) -> Self {
        Self {
            manifests,
            ..Default::default()
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(LoadError::new(message));
        self
    }

    pub fn with_feature_flag(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.feature_flags.insert(name.into(), enabled);
        self
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn feature_enabled(&self, name: &str) -> bool {
        feature::is_enabled(&self.feature_flags, name)
    }

    /// Fills in flags the evaluator did not set from `defaults`.
    pub fn merge_feature_defaults(&mut self, defaults: &BTreeMap<String, bool>) {
        for (name, enabled) in defaults {
            self.feature_flags.entry(name.clone()).or_insert(*enabled);
        }
    }

    /// Checks manifest names are unique and each manifest is well formed.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for manifest in &self.manifests {
            if !seen.insert(manifest.name.as_str()) {
                return Err(CoreError::duplicate_manifest(manifest.name.as_str()));
            }
            manifest.validate()?;
        }
        Ok(())
    }
}

/// How the engine consuming the reconciled objects is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// Long-lived interactive session that keeps watching for changes.
    #[default]
    Up,
    /// One-shot run that exits once every resource is ready or failed.
    Ci,
}

impl EngineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Ci => "ci",
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EngineMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "ci" => Ok(Self::Ci),
            other => Err(CoreError::invalid_engine_mode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Manifest;

    #[test]
    fn test_validate_duplicate_manifests() {
        let lr = LoadResult::new(vec![
            Manifest::new("fe").with_k8s_yaml("a"),
            Manifest::new("fe").with_k8s_yaml("b"),
        ]);
        let err = lr.validate().unwrap_err();
        assert!(matches!(err, CoreError::DuplicateManifest(name) if name == "fe"));
    }

    #[test]
    fn test_feature_defaults_do_not_override() {
        let mut lr = LoadResult::default().with_feature_flag(feature::DISABLE_RESOURCES, false);
        let defaults = BTreeMap::from([
            (feature::DISABLE_RESOURCES.to_string(), true),
            ("other".to_string(), true),
        ]);
        lr.merge_feature_defaults(&defaults);

        assert!(!lr.feature_enabled(feature::DISABLE_RESOURCES));
        assert!(lr.feature_enabled("other"));
    }

    #[test]
    fn test_engine_mode_parse() {
        assert_eq!("up".parse::<EngineMode>().unwrap(), EngineMode::Up);
        assert_eq!("CI".parse::<EngineMode>().unwrap(), EngineMode::Ci);
        let err = "batch".parse::<EngineMode>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidEngineMode(ref mode) if mode == "batch"));
        assert_eq!(err.to_string(), "Unknown engine mode: batch");
    }

    #[test]
    fn test_load_result_json() {
        let lr: LoadResult = serde_json::from_str(
            r#"{"error": "random failure", "feature_flags": {"disable_resources": true}}"#,
        )
        .unwrap();
        assert!(lr.has_error());
        assert_eq!(lr.error.as_ref().unwrap().message(), "random failure");
        assert!(lr.manifests.is_empty());
        assert!(lr.feature_enabled(feature::DISABLE_RESOURCES));
    }
}
