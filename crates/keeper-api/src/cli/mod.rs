//! CLI command definitions for the `bmk` binary.
//!
//! Commands follow a verb style (`bmk add <user> <items>`). Every command
//! accepts the global `--json`, `--quiet`, `-v` and `--otel` flags.

pub mod bookmarks;
pub mod config;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Keep per-user bookmark lists in blob storage.
#[derive(Parser)]
#[command(name = "bmk", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Only log errors. Command results are still printed.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List a user's bookmarks.
    #[command(alias = "ls")]
    List {
        /// User id.
        user: String,

        /// Bookmarks per row.
        #[arg(long, short = 'c', default_value_t = 2)]
        columns: usize,
    },

    /// Add bookmarks (comma-separated).
    Add {
        /// User id.
        user: String,

        /// Bookmarks to add, e.g. "news, weather".
        items: String,
    },

    /// Delete bookmarks (comma-separated).
    #[command(alias = "rm")]
    Delete {
        /// User id.
        user: String,

        /// Bookmarks to delete.
        items: String,
    },

    /// Remove all of a user's bookmarks.
    Clear {
        /// User id.
        user: String,
    },

    /// Print a user's raw bookmark document.
    Show {
        /// User id.
        user: String,
    },

    /// Print the effective configuration (secrets masked).
    Config,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_list_defaults_to_two_columns() {
        let cli = Cli::try_parse_from(["bmk", "list", "42"]).unwrap();
        match cli.command {
            Commands::List { user, columns } => {
                assert_eq!(user, "42");
                assert_eq!(columns, 2);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bmk", "add", "42", "a, b", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.otel);
        assert!(matches!(cli.command, Commands::Add { .. }));
    }

    #[test]
    fn test_quiet_only_lowers_log_level() {
        let cli = Cli::try_parse_from(["bmk", "list", "42", "--quiet"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(
            keeper_observe::tracing_setup::default_directive(cli.verbose, cli.quiet),
            "error"
        );

        let command = Cli::command();
        let help = command
            .get_arguments()
            .find(|arg| arg.get_id() == "quiet")
            .and_then(|arg| arg.get_help())
            .map(|help| help.to_string())
            .unwrap();
        assert!(help.contains("still printed"), "{help}");
    }

    #[test]
    fn test_rm_alias() {
        let cli = Cli::try_parse_from(["bmk", "rm", "42", "a"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { .. }));
    }

    #[test]
    fn test_add_requires_items() {
        assert!(Cli::try_parse_from(["bmk", "add", "42"]).is_err());
    }
}
