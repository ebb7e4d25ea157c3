//! Integration tests for argofire-config

use argofire_config::*;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

fn temp_file(name: &str, content: &str) -> PathBuf {
    let path = env::temp_dir().join(format!("argofire-{}-{}", std::process::id(), name));
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_toml_file_layer() {
    let path = temp_file(
        "gateway.toml",
        r#"
        mode = "live"
        username = "file-user"
        password = "file-pass"
        timeout_secs = 25
        avs_check = true
        "#,
    );

    let settings = SettingsLoader::new().file(&path).unwrap().build().unwrap();
    assert_eq!(settings.mode, Mode::Live);
    assert_eq!(settings.username, "file-user");
    assert_eq!(settings.timeout, Duration::from_secs(25));
    assert!(settings.avs_check);
    assert_eq!(settings.endpoint(), LIVE_ENDPOINT);

    fs::remove_file(path).ok();
}

#[test]
fn test_dotenv_layer_does_not_leak_into_process_env() {
    let path = temp_file(
        "gateway.env",
        "ARGOFIRE_USERNAME=dotenv-user\nARGOFIRE_PASSWORD=dotenv-pass\nUNRELATED=1\n",
    );

    let settings = SettingsLoader::new()
        .dotenv(Some(&path))
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(settings.username, "dotenv-user");
    assert!(env::var("UNRELATED").is_err());

    fs::remove_file(path).ok();
}

#[test]
fn test_later_layers_override_earlier_ones() {
    let path = temp_file(
        "override.json",
        r#"{"username": "file-user", "password": "file-pass", "mode": "live"}"#,
    );

    let settings = SettingsLoader::new()
        .file(&path)
        .unwrap()
        .options([("gb_argofire_mode", "sandbox")])
        .build()
        .unwrap();
    assert_eq!(settings.mode, Mode::Sandbox);
    assert_eq!(settings.username, "file-user");

    fs::remove_file(path).ok();
}

#[test]
fn test_process_env_layer() {
    unsafe {
        env::set_var("ARGOFIRE_INTEGRATION_PROBE", "probe");
    }

    let loader = EnvLoader::default();
    assert_eq!(loader.load_var("INTEGRATION_PROBE").unwrap(), "probe");
    assert_eq!(
        loader.load().get("integration_probe").map(String::as_str),
        Some("probe")
    );

    unsafe {
        env::remove_var("ARGOFIRE_INTEGRATION_PROBE");
    }
}

#[test]
fn test_missing_file_is_load_error() {
    let err = SettingsLoader::new()
        .file(std::path::Path::new("/definitely/not/here.toml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::LoadError(_)));
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::InvalidValue {
        key: "mode".to_string(),
        value: "staging".to_string(),
    };
    assert_eq!(err.to_string(), "Invalid value for mode: staging");
}
