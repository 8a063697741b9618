#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_run_with_all_flags() {
        let cli = Cli::try_parse_from([
            "glance",
            "run",
            "dashboard",
            "--base-url",
            "http://127.0.0.1:8080",
            "--headful",
            "--out-dir",
            "results",
            "--skeleton-deadline-ms",
            "300",
            "--first-data-deadline-ms",
            "5000",
            "--full-load-deadline-ms",
            "9000",
            "--poll-interval-ms",
            "50",
            "--parallel",
            "2",
            "--scenario-file",
            "extra.json",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.set.as_deref(), Some("dashboard"));
        assert_eq!(args.base_url.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(args.headless_override(), Some(false));
        assert_eq!(args.out_dir, Some(PathBuf::from("results")));
        assert_eq!(args.skeleton_deadline_ms, Some(300));
        assert_eq!(args.first_data_deadline_ms, Some(5_000));
        assert_eq!(args.full_load_deadline_ms, Some(9_000));
        assert_eq!(args.poll_interval_ms, Some(50));
        assert_eq!(args.parallel, Some(2));
        assert_eq!(args.scenario_file, Some(PathBuf::from("extra.json")));
    }

    #[test]
    fn test_run_defaults_leave_config_untouched() {
        let cli = Cli::try_parse_from(["glance", "run"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.set.is_none());
        assert!(args.base_url.is_none());
        assert_eq!(args.headless_override(), None);
        assert!(args.parallel.is_none());
    }

    #[test]
    fn test_headless_and_headful_conflict() {
        assert!(Cli::try_parse_from(["glance", "run", "--headless", "--headful"]).is_err());
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["glance", "-v", "-q", "list"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["glance", "show", "out", "--no-color", "--all"]).unwrap();
        assert!(cli.no_color);
        let Command::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.report, PathBuf::from("out"));
        assert!(args.all);
    }

    #[test]
    fn test_deadlines_must_be_numbers() {
        assert!(
            Cli::try_parse_from(["glance", "run", "--skeleton-deadline-ms", "soon"]).is_err()
        );
    }
}
