//! CLI Module
//!
//! Command-line interface for offline use of the KeroMix engine.

pub mod commands;
pub mod wav;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// KeroMix - mix chain with AI parameter suggestions
#[derive(Parser, Debug)]
#[command(name = "keromix")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the per-user KeroMix config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the parameter schema
    #[command(name = "params")]
    Params,

    /// Run a WAV file through the chain
    #[command(name = "process")]
    Process {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        /// Parameter override, e.g. --set lowG=3.5 (repeatable)
        #[arg(short, long = "set", value_name = "ID=VALUE")]
        set: Vec<String>,

        /// Preset applied before any --set overrides
        #[arg(short, long)]
        preset: Option<String>,
    },

    /// Ask the suggestion service for parameters matching a request
    #[command(name = "suggest")]
    Suggest {
        /// WAV file whose spectrum describes the material
        input: PathBuf,

        /// Free-text request, e.g. "warmer vocals"
        prompt: Option<String>,

        /// Use one of the built-in quick commands (0-based index)
        #[arg(short, long, conflicts_with = "prompt")]
        quick: Option<usize>,

        /// Write the input processed with the suggested values
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Lock groups the suggestion may not touch (eq, comp, delay, reverb, master)
        #[arg(short, long, value_delimiter = ',')]
        lock: Vec<String>,

        /// Seconds to wait for the service
        #[arg(short, long, default_value_t = 30)]
        timeout: u64,
    },

    /// Manage saved presets
    #[command(name = "preset")]
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum PresetAction {
    /// List saved presets
    List,

    /// Save default values, with optional overrides, under a name
    Save {
        name: String,

        /// Parameter override, e.g. --set revMix=0.3 (repeatable)
        #[arg(short, long = "set", value_name = "ID=VALUE")]
        set: Vec<String>,
    },

    /// Print the values stored in a preset
    Load { name: String },

    /// Delete a preset
    Delete { name: String },
}
