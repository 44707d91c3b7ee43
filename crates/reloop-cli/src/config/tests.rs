#[cfg(test)]
mod tests {
    use crate::config::*;
    use serial_test::serial;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    const BLOG: &str = r#"
[app]
name = "blog"

[server]
port = 8080

[build]
command = ["go", "build", "-o", "build/bin/blog", "."]
binary = "build/bin/blog"
generated_entry = "app/main_gen.go"

[run]
args = ["-profile", "{profile}", "-listen", "{address}:{port}"]
ready_marker = "server listening"
grace_period_ms = 500

[run.env]
BLOG_DB = "dev.sqlite"

[hot_reload]
exclude_dirs = ["node_modules", "./build/"]
exclude_files = ["*_test.go"]

[profiles.prod]
server = { address = "0.0.0.0", port = 80 }
hot_reload = { enable = false }
"#;

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), BLOG).unwrap();
        temp
    }

    fn clear_env() {
        for key in [
            "RELOOP_APP__PROFILE",
            "RELOOP_SERVER__PORT",
            "RELOOP_RUN__GRACE_PERIOD_MS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_file_values_load() {
        clear_env();
        let temp = project();
        let config = load_config(temp.path(), &Overrides::default()).unwrap();
        assert_eq!(config.app.name.as_deref(), Some("blog"));
        assert_eq!(config.app.profile, DEV_PROFILE);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.run.grace_period_ms, 500);
        assert!(config.hot_reload_active());
        assert!(config.profiles.contains_key("prod"));
    }

    #[test]
    #[serial]
    fn test_profile_flag_applies_overrides() {
        clear_env();
        let temp = project();
        let overrides = Overrides {
            profile: Some("prod".into()),
            ..Overrides::default()
        };
        let config = load_config(temp.path(), &overrides).unwrap();
        assert_eq!(config.app.profile, "prod");
        assert_eq!(config.server.address, "0.0.0.0");
        assert_eq!(config.server.port, 80);
        assert!(!config.hot_reload_active());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file_and_profile() {
        clear_env();
        let temp = project();
        std::env::set_var("RELOOP_APP__PROFILE", "prod");
        std::env::set_var("RELOOP_SERVER__PORT", "9090");
        std::env::set_var("RELOOP_RUN__GRACE_PERIOD_MS", "1200");

        let config = load_config(temp.path(), &Overrides::default()).unwrap();
        clear_env();

        assert_eq!(config.app.profile, "prod");
        assert_eq!(config.server.address, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.run.grace_period_ms, 1200);
    }

    #[test]
    #[serial]
    fn test_flags_override_env() {
        clear_env();
        let temp = project();
        std::env::set_var("RELOOP_SERVER__PORT", "9090");

        let overrides = Overrides {
            port: Some(3000),
            no_hot_reload: true,
            ..Overrides::default()
        };
        let config = load_config(temp.path(), &overrides).unwrap();
        clear_env();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.app.profile, DEV_PROFILE);
        assert!(!config.hot_reload_active());
    }

    #[test]
    #[serial]
    fn test_missing_config_is_not_found() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let err = load_config(temp.path(), &Overrides::default()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CliError::Config(reloop_config::ConfigError::NotFound(_))
        ));
    }

    fn loaded(root: &Path) -> ReloopConfig {
        clear_env();
        load_config(root, &Overrides::default()).unwrap()
    }

    #[test]
    #[serial]
    fn test_process_spec_renders_args() {
        let temp = project();
        let config = loaded(temp.path());
        let spec = process_spec(&config, temp.path(), "127.0.0.1", 41000);

        assert_eq!(spec.program, temp.path().join("build/bin/blog"));
        assert_eq!(spec.args, ["-profile", "dev", "-listen", "127.0.0.1:41000"]);
        assert_eq!(spec.ready_marker, "server listening");
        assert_eq!(spec.shutdown_marker, "");
        assert_eq!(spec.grace_period, Duration::from_millis(500));
        assert_eq!(spec.envs, [("BLOG_DB".to_string(), "dev.sqlite".to_string())]);
        assert_eq!(spec.working_dir.as_deref(), Some(temp.path()));
    }

    #[test]
    #[serial]
    fn test_session_config_puts_app_on_backend_port() {
        let temp = project();
        let config = loaded(temp.path());
        let session = session_config(&config, temp.path(), 41000).unwrap();

        assert_eq!(session.address, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(session.backend_port, 41000);
        assert_eq!(session.entry_dir, temp.path().join("."));
        assert!(session.tls.is_none());
        assert!(session.process.args.contains(&"127.0.0.1:41000".to_string()));
        assert_eq!(session.exclude_files, ["*_test.go"]);
        assert_eq!(
            session.exclude_paths,
            [PathBuf::from("app/main_gen.go"), PathBuf::from("build/bin/blog")]
        );
        assert_eq!(session.port_wait, Duration::from_secs(10));
    }

    #[test]
    fn test_watch_excludes_add_output_dir_once() {
        let mut config = ReloopConfig::default();
        config.hot_reload.exclude_dirs = vec!["node_modules".into()];
        config.build.output_dir = PathBuf::from("./out/");
        assert_eq!(watch_excludes(&config), ["node_modules", "out"]);

        config.hot_reload.exclude_dirs = vec!["out".into()];
        assert_eq!(watch_excludes(&config), ["out"]);

        config.build.output_dir = PathBuf::from(".");
        assert_eq!(watch_excludes(&config), ["out"]);
    }

    #[test]
    fn test_tls_files_need_both_paths() {
        let mut config = ReloopConfig::default();
        assert!(tls_files(&config, Path::new("/srv/blog")).is_none());

        config.server.tls = Some(reloop_config::TlsConfig {
            cert: Some("certs/dev.pem".into()),
            key: Some("/etc/blog/dev-key.pem".into()),
        });
        let files = tls_files(&config, Path::new("/srv/blog")).unwrap();
        assert_eq!(files.cert, PathBuf::from("/srv/blog/certs/dev.pem"));
        assert_eq!(files.key, PathBuf::from("/etc/blog/dev-key.pem"));
    }

    #[test]
    fn test_listen_addr_rejects_garbage() {
        let mut config = ReloopConfig::default();
        config.server.address = "not an address".into();
        assert!(listen_addr(&config).is_err());

        config.server.address = "127.0.0.1".into();
        config.server.port = 4000;
        assert_eq!(listen_addr(&config).unwrap().port(), 4000);
    }
}
