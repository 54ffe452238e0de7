// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skylift")]
#[command(about = "GPU instance provisioning and workload container deployment")]
#[command(version)]
pub struct Cli {
    /// Directory containing preset YAML files
    #[arg(long, default_value = "presets", global = true)]
    pub presets_dir: PathBuf,

    /// Directory for workflow and deployment state
    #[arg(long, default_value = ".skylift", global = true)]
    pub state_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision an instance and deploy a preset's workload to it
    Deploy {
        /// Preset name (file stem under the presets directory)
        preset: String,
    },

    /// Check whether a preset's workload is deployed and healthy
    Status {
        /// Preset name
        preset: String,
    },

    /// Terminate a preset's instance and clear its deployment record
    Shutdown {
        /// Preset name
        preset: String,
    },

    /// List the presets available in the presets directory
    ListPresets,
}
