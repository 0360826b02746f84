//! Rendering pipeline
//!
//! - `source`: resolves track audio ids to decoded clips
//! - `renderer`: mixes a composition into a master buffer
//! - `export`: encodes and atomically publishes the master
//! - `scheduler`: runs renders in the background, one per composition id

mod export;
mod renderer;
mod scheduler;
mod source;

pub use export::{sha256_file, ExportFormat, Exporter, PublishedArtifact, DEFAULT_BITRATE_KBPS};
pub use renderer::{
    prepare_segment, RenderOutput, RenderSettings, Renderer, TrackWarning, WarningKind,
};
pub use scheduler::{
    artifact_status, ArtifactStatus, RenderPipeline, RenderRecord, RenderScheduler, RenderStatus,
};
pub use source::{DirectorySource, MemorySource, SourceLoader};
