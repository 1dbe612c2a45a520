//! KeroMix CLI
//!
//! Command-line interface for the KeroMix engine.

use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use keromix::cli::commands;
use keromix::cli::{Cli, Commands, PresetAction};
use keromix::config::{default_config_path, EngineConfig};
use keromix::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("KeroMix v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?.with_env_overrides(),
        None => EngineConfig::load_or_default(),
    };

    match cli.command {
        Some(cmd) => handle_command(cmd, &config),
        None => {
            println!("KeroMix v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", default_config_path().display());
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: &EngineConfig) -> Result<()> {
    match cmd {
        Commands::Params => commands::print_params(),
        Commands::Process {
            input,
            output,
            set,
            preset,
        } => commands::process_file(config, &input, &output, &set, preset.as_deref()),
        Commands::Suggest {
            input,
            prompt,
            quick,
            output,
            lock,
            timeout,
        } => commands::suggest(
            config,
            &input,
            prompt.as_deref(),
            quick,
            output.as_deref(),
            &lock,
            Duration::from_secs(timeout),
        ),
        Commands::Preset { action } => match action {
            PresetAction::List => commands::preset_list(config),
            PresetAction::Save { name, set } => commands::preset_save(config, &name, &set),
            PresetAction::Load { name } => commands::preset_load(config, &name),
            PresetAction::Delete { name } => commands::preset_delete(config, &name),
        },
    }
}
