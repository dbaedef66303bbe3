//! Integration tests for configuration loading

use geofence_engine::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[service]
name = "geofence-test"

[server]
bind_address = "127.0.0.1"
port = 9100
max_body_bytes = 1024

[zones]
file = "/etc/geofence/zones.json"
fallback_to_builtin = false

[state]
history_limit = 25

[metrics]
interval_secs = 15
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.service_name(), "geofence-test");
    assert_eq!(config.bind_address(), "127.0.0.1");
    assert_eq!(config.port(), 9100);
    assert_eq!(config.max_body_bytes(), 1024);
    assert_eq!(config.zones_file(), "/etc/geofence/zones.json");
    assert!(!config.zones_fallback_to_builtin());
    assert_eq!(config.history_limit(), 25);
    assert_eq!(config.metrics_interval_secs(), 15);
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.port(), 8000);
    assert_eq!(config.zones_file(), "zones.json");
    assert_eq!(config.history_limit(), 100);
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_invalid_file_falls_back_to_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[server\nport = 1").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
    assert_eq!(Config::load_from_path(temp_file.path()).port(), 8000);
}
