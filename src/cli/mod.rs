//! CLI Module
//!
//! Command-line interface for the WhiteNoise soundscape renderer.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// WhiteNoise - layered ambient soundscape renderer
#[derive(Parser, Debug)]
#[command(name = "whitenoise-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Root holding pixabay/, compositions/, composed/ and the catalog
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Source clip directory (defaults to <base-dir>/pixabay)
    #[arg(long, global = true)]
    pub audio_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List stored compositions
    #[command(name = "list")]
    List,

    /// Show a composition with catalog details for each track
    #[command(name = "info")]
    Info {
        /// Composition id
        id: String,
    },

    /// Render one or more compositions
    #[command(name = "render")]
    Render {
        /// Composition ids
        #[arg(required = true)]
        ids: Vec<String>,

        /// Output format: wav, flac, mp3 or ogg
        #[arg(short, long)]
        format: Option<String>,

        /// Bitrate for lossy formats, e.g. 192k
        #[arg(short, long)]
        bitrate: Option<String>,

        /// Refuse compositions that use clips missing from the catalog
        #[arg(long)]
        strict: bool,
    },

    /// Generate a composition from a scene description
    #[command(name = "generate")]
    Generate {
        /// Natural-language scene description
        scene: String,

        /// Save the result to the compositions directory
        #[arg(short, long)]
        save: bool,
    },

    /// Re-measure every catalogued clip and update the catalog
    #[command(name = "rescan")]
    Rescan {
        /// Report without writing the catalog
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the sound catalog as JSON
    #[command(name = "sounds")]
    Sounds,

    /// Classify a mean level in dBFS
    #[command(name = "classify")]
    Classify {
        /// Level in dBFS, e.g. -22.5
        #[arg(allow_hyphen_values = true)]
        db: f64,
    },
}
