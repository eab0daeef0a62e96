use std::{env, fs};

use keel_controller::config::loader::load_config;
use keel_core::{EngineMode, feature};

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    // Create a temporary TOML configuration file
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("keel.toml");

    let toml_content = r#"
[logging]
level = "debug"

[reconcile]
default_namespace = "dev"
default_mode = "up"
fail_on_partial = true

[features]
disable_resources = true
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.logging.level.to_ascii_lowercase(), "debug");
    assert_eq!(cfg.reconcile.default_namespace, "dev");
    assert_eq!(cfg.reconcile.default_mode, EngineMode::Up);
    assert!(cfg.reconcile.fail_on_partial);
    assert_eq!(cfg.features.get(feature::DISABLE_RESOURCES), Some(&true));

    // 2) Env override should win over file
    unsafe {
        env::set_var("KEEL__RECONCILE__DEFAULT_MODE", "ci");
        env::set_var("KEEL__FEATURES__DISABLE_RESOURCES", "false");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.reconcile.default_mode, EngineMode::Ci);
    assert_eq!(cfg_env.features.get(feature::DISABLE_RESOURCES), Some(&false));
    // cleanup env vars
    unsafe {
        env::remove_var("KEEL__RECONCILE__DEFAULT_MODE");
        env::remove_var("KEEL__FEATURES__DISABLE_RESOURCES");
    }

    // 3) Invalid logging level should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[logging]
level = "verbose"
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("logging.level must be one of"));

    // 4) Unknown feature flags are rejected
    let unknown_path = dir.path().join("unknown.toml");
    fs::write(&unknown_path, "[features]\nwarp_drive = true\n").expect("write toml");
    let err = load_config(unknown_path.to_str()).expect_err("expected unknown flag error");
    assert!(err.contains("features.warp_drive"));

    // 5) Minimal file falls back to defaults
    let empty_path = dir.path().join("empty.toml");
    fs::write(&empty_path, "").expect("write empty toml");
    let cfg = load_config(empty_path.to_str()).expect("empty config is valid");
    assert_eq!(cfg.logging.level, "info");
    assert_eq!(cfg.reconcile.default_namespace, "");
    assert!(!cfg.reconcile.fail_on_partial);
    assert!(cfg.features.is_empty());
}

#[test]
fn missing_explicit_config_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");
    let err = load_config(path.to_str()).expect_err("expected missing file error");
    assert!(err.contains("config file not found"));
}
