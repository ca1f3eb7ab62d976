// ABOUTME: Integration tests for configuration parsing and validation.
// ABOUTME: Tests YAML parsing, defaults, environment and flag overrides, and discovery.

use nocli::config::*;
use nocli::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

mod parsing {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.listen, addr("0.0.0.0:8080"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.stop_timeout, Duration::from_secs(10));
        assert_eq!(config.streams.buffer_limit, 256);
        assert_eq!(config.streams.overflow, OverflowPolicy::Block);
        assert_eq!(config.streams.shutdown_grace, Duration::from_secs(5));
        assert_eq!(config.health.timeout, Duration::from_secs(3));
        assert!(config.health.interval.is_none());
        assert!(config.daemon.endpoint.is_none());
        assert_eq!(config.daemon.connect_timeout, Duration::from_secs(120));
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
listen: "127.0.0.1:9000"
daemon:
  endpoint: unix:///run/podman/podman.sock
  connect_timeout: 30s
request_timeout: 20s
stop_timeout: 5s
streams:
  buffer_limit: 64
  overflow: drop-oldest
  shutdown_grace: 2s
health:
  timeout: 1s
  interval: 15s
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.listen, addr("127.0.0.1:9000"));
        assert_eq!(
            config.daemon.endpoint.as_deref(),
            Some("unix:///run/podman/podman.sock")
        );
        assert_eq!(config.daemon.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert_eq!(config.stop_timeout, Duration::from_secs(5));
        assert_eq!(config.streams.buffer_limit, 64);
        assert_eq!(config.streams.overflow, OverflowPolicy::DropOldest);
        assert_eq!(config.streams.shutdown_grace, Duration::from_secs(2));
        assert_eq!(config.health.timeout, Duration::from_secs(1));
        assert_eq!(config.health.interval, Some(Duration::from_secs(15)));
        config.validate().unwrap();
    }

    #[test]
    fn listen_accepts_bare_port_forms() {
        let config = Config::from_yaml("listen: 9090").unwrap();
        assert_eq!(config.listen, addr("0.0.0.0:9090"));

        let config = Config::from_yaml("listen: \":9191\"").unwrap();
        assert_eq!(config.listen, addr("0.0.0.0:9191"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_yaml("listen: \"not-an-address\"").is_err());
        assert!(Config::from_yaml("request_timeout: soon").is_err());
        assert!(Config::from_yaml("streams:\n  overflow: spill").is_err());
    }

    #[test]
    fn yaml_round_trips_effective_config() {
        let mut config = Config::default();
        config.streams.overflow = OverflowPolicy::DropOldest;
        config.health.interval = Some(Duration::from_secs(10));

        let rendered = config.to_yaml().unwrap();
        assert!(rendered.contains("drop-oldest"));

        let parsed = Config::from_yaml(&rendered).unwrap();
        assert_eq!(parsed.listen, config.listen);
        assert_eq!(parsed.streams.overflow, OverflowPolicy::DropOldest);
        assert_eq!(parsed.health.interval, Some(Duration::from_secs(10)));
    }
}

mod validation {
    use super::*;

    fn invalid(config: &Config) -> String {
        match config.validate() {
            Err(Error::InvalidConfig(msg)) => msg,
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn stop_timeout_must_fit_in_request_timeout() {
        let mut config = Config::default();
        config.stop_timeout = config.request_timeout;
        assert!(invalid(&config).contains("stop_timeout"));
    }

    #[test]
    fn zero_durations_rejected() {
        let mut config = Config::default();
        config.request_timeout = Duration::ZERO;
        assert!(invalid(&config).contains("request_timeout"));

        let mut config = Config::default();
        config.health.timeout = Duration::ZERO;
        assert!(invalid(&config).contains("health.timeout"));

        let mut config = Config::default();
        config.health.interval = Some(Duration::ZERO);
        assert!(invalid(&config).contains("health.interval"));
    }

    #[test]
    fn buffer_limit_must_be_positive() {
        let mut config = Config::default();
        config.streams.buffer_limit = 0;
        assert!(invalid(&config).contains("buffer_limit"));
    }

    #[test]
    fn endpoint_must_parse() {
        let mut config = Config::default();
        config.daemon.endpoint = Some("ssh://example.com".to_string());
        assert!(invalid(&config).contains("daemon.endpoint"));

        config.daemon.endpoint = Some("tcp://127.0.0.1:2375".to_string());
        config.validate().unwrap();
    }
}

mod overrides {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn api_port_wins_over_port() {
        let mut config = Config::default();
        config
            .apply_env_from(lookup(&[("API_PORT", "9001"), ("PORT", "9002")]))
            .unwrap();
        assert_eq!(config.listen.port(), 9001);
    }

    #[test]
    fn port_used_when_api_port_unset_or_blank() {
        let mut config = Config::default();
        config.apply_env_from(lookup(&[("PORT", "9002")])).unwrap();
        assert_eq!(config.listen.port(), 9002);

        let mut config = Config::default();
        config
            .apply_env_from(lookup(&[("API_PORT", " "), ("PORT", "9003")]))
            .unwrap();
        assert_eq!(config.listen.port(), 9003);
    }

    #[test]
    fn port_keeps_configured_host() {
        let mut config = Config::from_yaml("listen: \"127.0.0.1:8000\"").unwrap();
        config.apply_env_from(lookup(&[("PORT", "9004")])).unwrap();
        assert_eq!(config.listen, addr("127.0.0.1:9004"));
    }

    #[test]
    fn unparsable_port_keeps_configured_listen() {
        let mut config = Config::default();
        config
            .apply_env_from(lookup(&[("API_PORT", "http")]))
            .unwrap();
        assert_eq!(config.listen, addr("0.0.0.0:8080"));

        config.apply_env_from(lookup(&[("PORT", "0")])).unwrap();
        assert_eq!(config.listen, addr("0.0.0.0:8080"));
    }

    #[test]
    fn unparsable_api_port_still_shadows_port() {
        let mut config = Config::default();
        config
            .apply_env_from(lookup(&[("API_PORT", "eighty"), ("PORT", "9002")]))
            .unwrap();
        assert_eq!(config.listen, addr("0.0.0.0:8080"));
    }

    #[test]
    fn docker_host_sets_endpoint() {
        let mut config = Config::default();
        config
            .apply_env_from(lookup(&[("DOCKER_HOST", "tcp://10.0.0.5:2375")]))
            .unwrap();
        assert_eq!(config.daemon.endpoint.as_deref(), Some("tcp://10.0.0.5:2375"));
    }

    #[test]
    fn apply_env_reads_process_environment() {
        temp_env::with_vars(
            [
                ("API_PORT", Some("7777")),
                ("PORT", None),
                ("DOCKER_HOST", Some("unix:///tmp/test.sock")),
            ],
            || {
                let mut config = Config::default();
                config.apply_env().unwrap();
                assert_eq!(config.listen.port(), 7777);
                assert_eq!(
                    config.daemon.endpoint.as_deref(),
                    Some("unix:///tmp/test.sock")
                );
            },
        );
    }

    #[test]
    fn flags_win_over_environment() {
        let mut config = Config::default();
        config
            .apply_env_from(lookup(&[("PORT", "9002"), ("DOCKER_HOST", "tcp://a:1")]))
            .unwrap();
        config
            .apply_overrides(Some("127.0.0.1:9500"), Some("unix:///var/run/docker.sock"))
            .unwrap();
        assert_eq!(config.listen, addr("127.0.0.1:9500"));
        assert_eq!(
            config.daemon.endpoint.as_deref(),
            Some("unix:///var/run/docker.sock")
        );
    }

    #[test]
    fn bad_listen_flag_rejected() {
        let mut config = Config::default();
        assert!(matches!(
            config.apply_overrides(Some("nowhere"), None),
            Err(Error::InvalidConfig(_))
        ));
    }
}

mod discovery {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discover_prefers_primary_name() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "listen: 9100").unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME_ALT), "listen: 9200").unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.listen.port(), 9100);
    }

    #[test]
    fn discover_finds_dot_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".nocli")).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME_DIR), "listen: 9300").unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.listen.port(), 9300);
    }

    #[test]
    fn discover_reports_missing() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }

    #[test]
    fn resolve_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::resolve(dir.path(), None).unwrap();
        assert_eq!(config.listen, addr("0.0.0.0:8080"));
    }

    #[test]
    fn resolve_explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("elsewhere.yml");
        assert!(matches!(
            Config::resolve(dir.path(), Some(&missing)),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn init_writes_valid_template() {
        let dir = TempDir::new().unwrap();
        let path = init_config(dir.path(), false).unwrap();
        assert_eq!(path, dir.path().join(CONFIG_FILENAME));

        let config = Config::load(&path).unwrap();
        config.validate().unwrap();

        assert!(matches!(
            init_config(dir.path(), false),
            Err(Error::AlreadyExists(_))
        ));
        init_config(dir.path(), true).unwrap();
    }
}
