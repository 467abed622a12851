//! Tests for [`ServiceConfig`] and its sections.

use super::*;

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn test_default_config_is_valid() {
    let config = ServiceConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.movie_route(), "/movie");
    assert_eq!(config.store.effective_backend(), StoreBackend::Memory);
    assert_eq!(config.store.timeout(), Duration::from_secs(10));
}

/// Verify that a partial document keeps defaults for omitted fields.
#[test]
fn test_partial_config_deserializes_with_defaults() {
    let json = r#"{"server":{"port":9090,"base_path":"/api"},"store":{"table_name":"movies"}}"#;

    let config: ServiceConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.movie_route(), "/api/movie");
    assert_eq!(config.store.effective_backend(), StoreBackend::Dynamodb);
    assert_eq!(config.telemetry.service_name, "movies");
    assert!(config.validate().is_ok());
}

// ============================================================================
// Validation
// ============================================================================

mod validation {
    use super::*;

    #[test]
    fn test_zero_port_fails() {
        let mut config = ServiceConfig::default();
        config.server.port = 0;

        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_base_path_shape() {
        for valid in ["", "/api", "/v1/movies"] {
            let mut config = ServiceConfig::default();
            config.server.base_path = valid.to_string();
            assert!(config.validate().is_ok(), "'{}' should be accepted", valid);
        }

        for invalid in ["api", "/api/", "/"] {
            let mut config = ServiceConfig::default();
            config.server.base_path = invalid.to_string();
            assert!(config.validate().is_err(), "'{}' should be rejected", invalid);
        }
    }

    #[test]
    fn test_dynamodb_backend_requires_table_name() {
        let mut config = ServiceConfig::default();
        config.store.backend = Some(StoreBackend::Dynamodb);

        let result = config.validate();

        assert!(
            matches!(result, Err(ConfigError::Missing { ref key }) if key == "store.table_name"),
            "expected missing table name, got {:?}",
            result
        );
    }

    #[test]
    fn test_explicit_memory_backend_ignores_table_name() {
        let mut config = ServiceConfig::default();
        config.store.backend = Some(StoreBackend::Memory);
        config.store.table_name = Some("movies".to_string());

        assert_eq!(config.store.effective_backend(), StoreBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeouts_fail() {
        let mut config = ServiceConfig::default();
        config.store.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.server.request_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sampling_ratio_out_of_range_fails() {
        let mut config = ServiceConfig::default();
        config.telemetry.sampling_ratio = -0.1;

        assert!(config.validate().is_err());
    }
}

// ============================================================================
// Layered Loading
// ============================================================================

mod loading {
    use super::*;
    use movies_core::settings::{load_from, ConfigSources};
    use serial_test::serial;
    use std::path::PathBuf;

    fn no_files() -> ConfigSources {
        ConfigSources {
            system_file: PathBuf::from("/nonexistent/movies/service"),
            local_file: PathBuf::from("/nonexistent/movies/local/service"),
            explicit_file: None,
        }
    }

    #[test]
    #[serial]
    fn test_environment_and_legacy_table_name() {
        std::env::set_var("MOVIES__SERVER__PORT", "9191");
        std::env::set_var("MOVIES_NAME", "movies-prod");

        let loaded = load_from(&no_files(), LEGACY_VARIABLES)
            .expect("should load")
            .try_deserialize::<ServiceConfig>();

        std::env::remove_var("MOVIES__SERVER__PORT");
        std::env::remove_var("MOVIES_NAME");

        let config = loaded.expect("should deserialize");
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.store.table_name.as_deref(), Some("movies-prod"));
        assert_eq!(config.store.effective_backend(), StoreBackend::Dynamodb);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_empty_environment_yields_defaults() {
        std::env::remove_var("MOVIES_NAME");

        let config: ServiceConfig = load_from(&no_files(), LEGACY_VARIABLES)
            .expect("should load")
            .try_deserialize()
            .expect("should deserialize");

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.effective_backend(), StoreBackend::Memory);
    }
}
