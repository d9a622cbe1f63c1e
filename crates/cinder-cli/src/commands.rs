//! CLI command definitions.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new workflow
    Init,

    /// Validate a workflow file
    Validate {
        /// Path to workflow file
        #[arg(default_value = "cinder.yaml")]
        path: String,
    },

    /// List the job instances a workflow expands to
    Jobs {
        /// Path to workflow file
        #[arg(default_value = "cinder.yaml")]
        path: String,
    },

    /// Run a workflow locally
    Run {
        /// Path to workflow file
        #[arg(default_value = "cinder.yaml")]
        path: String,

        /// Event kind: push or pull_request
        #[arg(short, long, default_value = "push")]
        event: String,

        /// Branch the event refers to
        #[arg(short, long, default_value = "main")]
        branch: String,

        /// Number of concurrent execution environments
        #[arg(short, long)]
        workers: Option<usize>,

        /// Extra global variables (KEY=VALUE)
        #[arg(long = "var")]
        vars: Vec<String>,

        /// Emit the final report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// New value
        value: String,
    },
}
