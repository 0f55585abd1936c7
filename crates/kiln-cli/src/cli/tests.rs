#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_dev_args_defaults() {
        let args = Cli::try_parse_from(["kiln", "dev"]).unwrap();

        if let Command::Dev(dev) = args.command {
            assert_eq!(dev.config.root, None);
            assert_eq!(dev.config.port, None);
            assert_eq!(dev.config.base, None);
            assert_eq!(dev.grace_period, 5);
        } else {
            panic!("Expected Dev command");
        }
    }

    #[test]
    fn test_dev_args_overrides() {
        let args = Cli::try_parse_from([
            "kiln", "dev", "--root", "web", "--mode", "staging", "--host", "0.0.0.0", "--port",
            "3000", "--base", "meqr",
        ])
        .unwrap();

        let Command::Dev(dev) = args.command else {
            panic!("Expected Dev command");
        };
        assert_eq!(dev.config.root, Some(PathBuf::from("web")));
        assert_eq!(dev.config.mode.as_deref(), Some("staging"));
        assert_eq!(dev.config.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(dev.config.port, Some(3000));
        assert_eq!(dev.config.base.as_deref(), Some("meqr"));
    }

    #[test]
    fn test_out_of_range_port_parses() {
        // Range checking happens during config resolution, not in clap.
        let args = Cli::try_parse_from(["kiln", "check", "--port", "70000"]).unwrap();
        let Command::Check(check) = args.command else {
            panic!("Expected Check command");
        };
        assert_eq!(check.config.port, Some(70000));
    }

    #[test]
    fn test_non_numeric_port_is_rejected() {
        assert!(Cli::try_parse_from(["kiln", "dev", "--port", "http"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["kiln", "-v", "-q", "check"]).is_err());
        assert!(Cli::try_parse_from(["kiln", "check", "--no-color"]).is_ok());
    }
}
