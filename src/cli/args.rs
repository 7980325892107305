//! CLI argument definitions using clap
//!
//! Commands:
//! - scalar-index --config <path> namespaces
//! - scalar-index --config <path> scan --namespace <name> [--limit N]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect a durable scalar range index store
#[derive(Parser, Debug)]
#[command(name = "scalar-index")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./scalar-index.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List namespaces with their row counts
    Namespaces,

    /// Print the rows of one namespace in key order
    Scan {
        /// Namespace name, e.g. "scalar:7"
        #[arg(long)]
        namespace: String,

        /// Stop after this many rows
        #[arg(long)]
        limit: Option<usize>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan() {
        let cli = Cli::try_parse_from([
            "scalar-index",
            "--config",
            "idx.json",
            "scan",
            "--namespace",
            "scalar:7",
            "--limit",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("idx.json"));
        assert_eq!(
            cli.command,
            Command::Scan {
                namespace: "scalar:7".to_string(),
                limit: Some(5)
            }
        );
    }

    #[test]
    fn test_config_default_and_after_subcommand() {
        let cli = Cli::try_parse_from(["scalar-index", "namespaces"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("./scalar-index.json"));

        let cli = Cli::try_parse_from(["scalar-index", "namespaces", "--config", "a.json"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("a.json"));
    }

    #[test]
    fn test_scan_requires_namespace() {
        assert!(Cli::try_parse_from(["scalar-index", "scan"]).is_err());
    }
}
