//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Connects to an AcTEC gateway and logs what its units report
#[derive(Parser, Debug, Clone)]
#[command(name = "actec-bridge")]
#[command(version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Gateway configuration file, run when no subcommand is given
    #[arg(required = true, value_name = "CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Connect, load units and log their reports until Ctrl-C
    Run {
        /// Gateway configuration file
        config: PathBuf,
    },

    /// Check that the gateway accepts the configured token
    Probe {
        /// Gateway configuration file
        config: PathBuf,
    },
}

impl Cli {
    /// The command to execute, `run` when only a config path was given
    pub fn into_command(self) -> Commands {
        match self.command {
            Some(command) => command,
            // clap requires CONFIG whenever the subcommand is absent
            None => Commands::Run {
                config: self.config.unwrap_or_default(),
            },
        }
    }
}
