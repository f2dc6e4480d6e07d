use traffic_router_domain::config::{CliOverrides, Config, ConfigError};

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.server.dns_port, 53);
    assert_eq!(config.dns.queue_depth, 0);
    assert_eq!(config.dns.worker_threads, 64);
    assert_eq!(config.logging.level, "info");
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_toml_fills_defaults() {
    let config = Config::from_toml(
        r#"
        [server]
        dns_port = 5353

        [dns]
        queue_depth = 16
        task_timeout_ms = 250
        "#,
    )
    .unwrap();

    assert_eq!(config.server.dns_port, 5353);
    assert_eq!(config.server.bind_address, "0.0.0.0");
    assert_eq!(config.dns.queue_depth, 16);
    assert_eq!(config.dns.task_timeout().as_millis(), 250);
    assert_eq!(config.dns.tcp_read_timeout_ms, 3000);
}

#[test]
fn test_validation_rejects_zero_workers() {
    let config = Config::from_toml("[dns]\nworker_threads = 0\n").unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid { section: "dns", .. })));
}

#[test]
fn test_validation_rejects_zero_timeout() {
    let config = Config::from_toml("[dns]\ntask_timeout_ms = 0\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_toml_is_parse_error() {
    assert!(matches!(Config::from_toml("[server"), Err(ConfigError::Parse(_))));
}

#[test]
fn test_load_from_file_with_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("router.toml");
    std::fs::write(&path, "[routing]\nsnapshot_path = \"/tmp/cr.json\"\n").unwrap();

    let config = Config::load(
        path.to_str(),
        CliOverrides {
            dns_port: Some(1053),
            log_level: Some("debug".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(config.routing.snapshot_path, "/tmp/cr.json");
    assert_eq!(config.server.dns_port, 1053);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_missing_file_is_read_error() {
    let result = Config::load(Some("/nonexistent/router.toml"), CliOverrides::default());
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn test_validation_rejects_hostname_bind_address() {
    let config = Config::from_toml("[server]\nbind_address = \"localhost\"\n").unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { section: "server", .. })
    ));
}
