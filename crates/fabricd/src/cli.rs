//! Command line arguments.

use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Compile a leaf/spine VLAN fabric and install its rules on the controller
#[derive(Parser, Debug, Clone)]
#[command(name = "fabricd")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Topology description (TOML)
    #[arg(short = 't', long)]
    pub topology: PathBuf,

    /// Daemon configuration; a missing file means defaults
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Compile and print the flows as JSON without installing them
    #[arg(long)]
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["fabricd", "--topology", "fabric.toml"]).unwrap();
        assert_eq!(args.topology, PathBuf::from("fabric.toml"));
        assert_eq!(args.config, PathBuf::from("/etc/fabricd/fabricd.toml"));
        assert!(!args.dry_run);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_topology_is_required() {
        assert!(Args::try_parse_from(["fabricd", "--dry-run"]).is_err());
    }

    #[test]
    fn test_all_flags() {
        let args = Args::try_parse_from([
            "fabricd",
            "-t",
            "fabric.toml",
            "-c",
            "local.toml",
            "--dry-run",
            "-l",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("local.toml"));
        assert!(args.dry_run);
        assert_eq!(args.log_level, "debug");
    }
}
