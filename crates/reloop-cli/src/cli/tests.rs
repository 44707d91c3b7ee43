#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["reloop", "run"]).unwrap();
        match cli.command {
            Command::Run(args) => {
                assert!(args.cwd.is_none());
                assert!(args.profile.is_none());
                assert!(args.port.is_none());
                assert!(!args.no_hot_reload);
            }
            other => panic!("expected run, got {other:?}"),
        }
        assert!(!cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_run_with_all_flags() {
        let cli = Cli::try_parse_from([
            "reloop",
            "run",
            "-C",
            "sites/blog",
            "--profile",
            "prod",
            "--port",
            "9000",
            "--no-hot-reload",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.cwd, Some(PathBuf::from("sites/blog")));
        assert_eq!(args.profile.as_deref(), Some("prod"));
        assert_eq!(args.port, Some(9000));
        assert!(args.no_hot_reload);
    }

    #[test]
    fn test_port_zero_is_rejected() {
        assert!(Cli::try_parse_from(["reloop", "run", "--port", "0"]).is_err());
        assert!(Cli::try_parse_from(["reloop", "run", "--port", "70000"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["reloop", "check", "--verbose", "--no-color"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.no_color);
        assert!(matches!(cli.command, Command::Check(_)));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["reloop", "-v", "-q", "run"]).is_err());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["reloop"]).is_err());
    }
}
