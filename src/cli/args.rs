//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Reset a disposable deployment: object store, metadata database and handle table
#[derive(Parser, Debug)]
#[command(name = "wipedev")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Config file layered over the global one
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Destroy and recreate object store, metadata database and handle table
    Wipe {
        /// Caller identity; must match auth.allowed_caller
        #[arg(long, env = "WIPEDEV_CALLER")]
        caller: String,
    },

    /// Stop or start only the workspace (metadata) service
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommands,
    },

    /// Show the steps `wipe` would run with the current configuration
    Plan,

    /// Generate the integration test runner script
    Runner {
        /// TOML test config
        #[arg(value_hint = ValueHint::FilePath, default_value = "test.cfg")]
        test_config: PathBuf,

        /// Output script
        #[arg(short, long, value_hint = ValueHint::FilePath, default_value = "run_tests.sh")]
        output: PathBuf,

        /// Build target (default from config)
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Summarize CI test results over a range of jobs
    Summarize {
        /// First job id
        start: u32,

        /// Last job id (inclusive)
        stop: u32,

        /// Job ids to leave out
        #[arg(long, value_delimiter = ',')]
        invalid: Vec<u32>,
    },

    /// Translate identifiers, one per line, via the configured HTTP endpoint
    Translate {
        /// Input file (default: stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        input: Option<PathBuf>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum WorkspaceCommands {
    /// Stop the workspace service
    Stop {
        #[arg(long, env = "WIPEDEV_CALLER")]
        caller: String,
    },

    /// Start the workspace service
    Start {
        #[arg(long, env = "WIPEDEV_CALLER")]
        caller: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print effective settings as TOML
    Show,

    /// Print a commented config template
    Template,
}
