use std::time::Duration;

use super::*;

#[test]
fn empty_file_yields_defaults() {
    let config: EphemeraConfig = toml::from_str("").unwrap();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert!(config.server.external_url.is_none());

    let policy = config.lifecycle.policy();
    assert_eq!(policy.cleanup_interval, Duration::from_secs(300));
    assert_eq!(policy.unviewed_expiry, Duration::from_secs(300));
    assert_eq!(policy.view_duration, Duration::from_secs(30));

    assert_eq!(config.storage.backend, "fs");
    assert_eq!(config.storage.upload_dir, "uploaded-img");
    assert_eq!(config.storage.max_upload_bytes, 10 * 1024 * 1024);

    assert_eq!(config.logging.level, "info");
    assert!(config.logging.ansi);
    assert!(config.validate().is_ok());
}

#[test]
fn custom_config() {
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000
        external_url = "https://share.example.com"

        [lifecycle]
        view_duration_seconds = 10

        [storage]
        backend = "memory"
        max_upload_bytes = 1024

        [logging]
        level = "debug"
        ansi = false
    "#;

    let config: EphemeraConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9000);
    assert_eq!(
        config.server.external_url.as_deref(),
        Some("https://share.example.com")
    );

    let policy = config.lifecycle.policy();
    assert_eq!(policy.view_duration, Duration::from_secs(10));
    // Unset fields in a present section still get defaults.
    assert_eq!(policy.unviewed_expiry, Duration::from_secs(300));

    assert_eq!(config.storage.backend, "memory");
    assert_eq!(config.storage.upload_dir, "uploaded-img");
    assert_eq!(config.storage.max_upload_bytes, 1024);
    assert_eq!(config.logging.level, "debug");
    assert!(!config.logging.ansi);
}

#[test]
fn zero_durations_are_rejected() {
    let config: EphemeraConfig = toml::from_str(
        r#"
        [lifecycle]
        cleanup_interval_seconds = 0
    "#,
    )
    .unwrap();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("cleanup_interval_seconds"));
}

#[test]
fn zero_upload_limit_is_rejected() {
    let config: EphemeraConfig = toml::from_str(
        r#"
        [storage]
        max_upload_bytes = 0
    "#,
    )
    .unwrap();

    assert!(config.validate().is_err());
}

#[test]
fn unknown_backend_parses() {
    // Backend names are resolved by the asset factory, not the parser.
    let config: StorageConfig = toml::from_str(r#"backend = "s3""#).unwrap();
    assert_eq!(config.backend, "s3");
}
