//! WhiteNoise CLI - Ambient Soundscape Renderer
//!
//! Command-line interface for rendering, listing and generating
//! soundscape compositions.

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use whitenoise::cli::{commands, Cli, Commands};
use whitenoise::config::Config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("WhiteNoise v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env();
    if let Some(base) = &cli.base_dir {
        config.set_base_dir(base);
    }
    if let Some(audio_dir) = cli.audio_dir {
        config.audio_dir = audio_dir;
    }

    match cli.command {
        Some(cmd) => handle_command(&config, cmd),
        None => {
            println!("WhiteNoise v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(config: &Config, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::List => commands::list(config).context("failed to list compositions")?,
        Commands::Info { id } => {
            commands::info(config, &id).with_context(|| format!("failed to show '{}'", id))?
        }
        Commands::Render {
            ids,
            format,
            bitrate,
            strict,
        } => {
            let failed = commands::render(
                config,
                &ids,
                format.as_deref(),
                bitrate.as_deref(),
                strict,
            )
            .context("render failed")?;
            if failed > 0 {
                bail!("{} of {} renders failed", failed, ids.len());
            }
        }
        Commands::Generate { scene, save } => {
            commands::generate(config, &scene, save).context("generation failed")?
        }
        Commands::Rescan { dry_run } => {
            commands::rescan(config, dry_run).context("catalog rescan failed")?
        }
        Commands::Sounds => commands::sounds(config).context("failed to read catalog")?,
        Commands::Classify { db } => commands::classify(db)?,
    }
    Ok(())
}
