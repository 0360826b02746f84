//! WhiteNoise - Layered Ambient Soundscape Renderer
//!
//! Renders "soundscapes" by overlaying looping audio clips onto a silent
//! master track, driven by declarative composition documents.
//!
//! # Architecture
//!
//! - `catalog`: read-only metadata about the source clip library
//! - `composition`: document parsing, validation and storage
//! - `engine`: audio buffers, envelopes, decoding and WAV encoding
//! - `render`: the mixer, export/publishing and background scheduling
//! - `generate`: LLM-driven authoring of new compositions
//!
//! ```
//! use std::sync::Arc;
//! use whitenoise::composition::{parse_composition, TrackDefaults};
//! use whitenoise::engine::{AudioBuffer, ChannelLayout};
//! use whitenoise::render::{MemorySource, RenderSettings, Renderer};
//!
//! let doc = "name: Hum\nduration: 2\ntracks:\n  - audio: hum\n";
//! let composition = parse_composition(doc, &TrackDefaults::document(), None).unwrap();
//!
//! let clip = AudioBuffer::from_channels(vec![vec![0.1; 500]], 1000).unwrap();
//! let renderer = Renderer::new(
//!     Arc::new(MemorySource::new().with("hum", clip)),
//!     RenderSettings { sample_rate: 1000, layout: ChannelLayout::Stereo },
//! );
//!
//! let output = renderer.render(&composition);
//! assert_eq!(output.buffer.duration_secs(), 2.0);
//! assert!(output.warnings.is_empty());
//! ```

pub mod catalog;
pub mod cli;
pub mod composition;
pub mod config;
pub mod engine;
pub mod error;
pub mod generate;
pub mod render;

pub use catalog::{Catalog, CatalogSnapshot, LoudnessLevel};
pub use composition::{Composition, Track};
pub use config::Config;
pub use error::{ErrorCategory, Result, WhitenoiseError};
pub use render::{ExportFormat, RenderOutput, Renderer};
