//! Source clip loading
//!
//! The renderer asks a `SourceLoader` for each track's clip by id. Loaders
//! return clips at their native format; the renderer conforms them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::engine::{import_audio, AudioBuffer};
use crate::error::{Result, WhitenoiseError};

/// Resolves a source id to decoded audio
pub trait SourceLoader: Send + Sync {
    fn load(&self, audio: &str) -> Result<AudioBuffer>;
}

/// Clips stored as files in one directory, addressed by file name
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SourceLoader for DirectorySource {
    fn load(&self, audio: &str) -> Result<AudioBuffer> {
        // Ids are plain file names; anything that walks out of the directory is rejected
        let relative = Path::new(audio);
        if relative.is_absolute() || relative.components().count() != 1 {
            return Err(WhitenoiseError::SourceNotFound {
                path: relative.to_path_buf(),
            });
        }
        import_audio(&self.dir.join(relative))
    }
}

/// In-memory clips, keyed by id
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    clips: HashMap<String, AudioBuffer>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, audio: impl Into<String>, buffer: AudioBuffer) {
        self.clips.insert(audio.into(), buffer);
    }

    pub fn with(mut self, audio: impl Into<String>, buffer: AudioBuffer) -> Self {
        self.insert(audio, buffer);
        self
    }
}

impl SourceLoader for MemorySource {
    fn load(&self, audio: &str) -> Result<AudioBuffer> {
        self.clips
            .get(audio)
            .cloned()
            .ok_or_else(|| WhitenoiseError::SourceNotFound {
                path: PathBuf::from(audio),
            })
    }
}
