use std::collections::BTreeMap;

use keel_core::{EngineMode, feature};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeelConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reconcile: ReconcileSettings,
    /// Feature flag defaults. Flags set by a load result take precedence.
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
}

impl KeelConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Reconcile validation
        if self.reconcile.default_namespace.contains('/') {
            return Err("reconcile.default_namespace must not contain '/'".into());
        }
        // Feature validation
        let known: Vec<&str> = feature::KNOWN_FLAGS.iter().map(|(name, _)| *name).collect();
        if let Some(unknown) = self.features.keys().find(|k| !known.contains(&k.as_str())) {
            return Err(format!(
                "features.{unknown} is not a known flag; expected one of {known:?}"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReconcileSettings {
    /// Namespace for owners given without one.
    #[serde(default)]
    pub default_namespace: String,
    #[serde(default)]
    pub default_mode: EngineMode,
    /// Treat a pass with failed store operations as an error.
    #[serde(default)]
    pub fail_on_partial: bool,
}

pub mod loader {
    use super::KeelConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub const DEFAULT_CONFIG_FILE: &str = "keel.toml";

    pub fn load_config(path: Option<&str>) -> Result<KeelConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                // Try default root-level file
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., KEEL__RECONCILE__DEFAULT_MODE=ci
        builder = builder.add_source(
            Environment::with_prefix("KEEL")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: KeelConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<KeelConfig, String> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}
