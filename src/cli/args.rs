//! CLI argument definitions using clap
//!
//! Commands:
//! - aphreton serve --config <path>
//! - aphreton check-config --config <path>
//! - aphreton hash-password --config <path> <password>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Aphreton - a single-endpoint JSON API gateway
#[derive(Parser, Debug)]
#[command(name = "aphreton")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the gateway
    Serve,

    /// Load and validate the configuration, then exit
    CheckConfig,

    /// Hash a password with the configured pepper
    HashPassword {
        /// Plain-text password
        password: String,
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
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["aphreton", "serve"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(cli.command, Command::Serve);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["aphreton", "check-config", "--config", "/etc/a.json", "-vv"])
                .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/a.json"));
        assert_eq!(cli.command, Command::CheckConfig);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_hash_password_requires_password() {
        assert!(Cli::try_parse_from(["aphreton", "hash-password"]).is_err());
        let cli = Cli::try_parse_from(["aphreton", "hash-password", "qwerty"]).unwrap();
        assert_eq!(
            cli.command,
            Command::HashPassword {
                password: "qwerty".to_string()
            }
        );
    }
}
