use crate::server::{CONFIG_VERSION, ShellConfig};

#[test]
fn test_defaults_match_fixed_contract() {
    let config = ShellConfig::default();

    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.probe.interval_ms, 250);
    assert_eq!(config.probe.connect_timeout_ms, 200);
    assert_eq!(config.probe.max_attempts, 240);
    // 240 attempts at 250ms each: a one-minute budget
    assert_eq!(config.probe.budget_secs(), 60);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_or_create_writes_default_file() {
    let dir = tempfile::tempdir().unwrap();

    let config = ShellConfig::load_or_create(dir.path()).unwrap();
    assert!(dir.path().join("config.toml").exists());
    assert_eq!(config.server.port, 8000);

    // Second load reads the saved file back
    let reloaded = ShellConfig::load_or_create(dir.path()).unwrap();
    assert_eq!(reloaded.probe.max_attempts, config.probe.max_attempts);
    assert_eq!(reloaded.server.host, config.server.host);
}

#[test]
fn test_load_rejects_invalid_toml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "server = not-a-table").unwrap();

    assert!(ShellConfig::load_or_create(dir.path()).is_err());
}

#[test]
fn test_validate_rejects_non_loopback_host() {
    let mut config = ShellConfig::default();
    config.server.host = "0.0.0.0".into();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_accepts_localhost_spelling() {
    let mut config = ShellConfig::default();
    config.server.host = "localhost".into();
    assert!(config.validate().is_ok());

    let addr = config.server.probe_addr();
    assert!(addr.ip().is_loopback());
    assert_eq!(addr.port(), 8000);
}

#[test]
fn test_validate_rejects_privileged_port() {
    let mut config = ShellConfig::default();
    config.server.port = 80;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_probe_bounds() {
    let mut config = ShellConfig::default();
    config.probe.max_attempts = 0;
    assert!(config.validate().is_err());

    let mut config = ShellConfig::default();
    config.probe.interval_ms = 0;
    assert!(config.validate().is_err());

    let mut config = ShellConfig::default();
    config.probe.connect_timeout_ms = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_missing_sections_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "version = 1\n\n[probe]\nmax_attempts = 10\n",
    )
    .unwrap();

    let config = ShellConfig::load_or_create(dir.path()).unwrap();
    assert_eq!(config.probe.max_attempts, 10);
    assert_eq!(config.probe.interval_ms, 250);
    assert_eq!(config.server.port, 8000);
}
