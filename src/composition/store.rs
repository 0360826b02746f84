//! Composition storage
//!
//! One YAML file per composition inside a directory; the file stem is the
//! composition id.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::model::{Composition, RawComposition, Track};
use super::validate::{validate, TrackDefaults};
use crate::catalog::Catalog;
use crate::error::{Result, WhitenoiseError};

const DOCUMENT_EXTENSION: &str = "yaml";

/// Listing row for one stored composition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration: f64,
    pub track_count: usize,
}

/// Catalog information attached to a track in a detail view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInfo {
    pub description_zh: String,
    pub description_en: String,
    pub scene: String,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackDetail {
    #[serde(flatten)]
    pub track: Track,
    /// `end - start` in seconds
    pub segment_duration: f64,
    /// `None` when the clip is not catalogued
    pub audio_info: Option<AudioInfo>,
}

/// A composition enriched with catalog data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionDetail {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration: f64,
    pub tracks: Vec<TrackDetail>,
}

/// Directory of composition documents
#[derive(Debug, Clone)]
pub struct CompositionStore {
    dir: PathBuf,
}

impl CompositionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Strip a trailing `.yaml` / `.yml` from an id
    pub fn normalize_id(id: &str) -> &str {
        id.strip_suffix(".yaml")
            .or_else(|| id.strip_suffix(".yml"))
            .unwrap_or(id)
    }

    /// File backing composition `id`
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", Self::normalize_id(id), DOCUMENT_EXTENSION))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).is_file()
    }

    /// Read a document without validating it
    pub fn load_raw(&self, id: &str) -> Result<RawComposition> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(WhitenoiseError::CompositionNotFound {
                id: Self::normalize_id(id).to_string(),
            });
        }
        let text = fs::read_to_string(&path)?;
        RawComposition::from_yaml_str(&text)
    }

    /// Load and validate a composition with document defaults
    ///
    /// # Arguments
    /// * `id` - Composition id, with or without the `.yaml` suffix
    /// * `catalog` - Optional catalog for fail-fast source checks
    pub fn load(&self, id: &str, catalog: Option<&Catalog>) -> Result<Composition> {
        let raw = self.load_raw(id)?;
        validate(&raw, &TrackDefaults::document(), catalog)
    }

    /// Write a composition, replacing any existing document with that id
    pub fn save(&self, id: &str, composition: &Composition) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(id);
        fs::write(&path, composition.to_yaml_string()?)?;
        debug!(id, path = %path.display(), "Saved composition");
        Ok(path)
    }

    /// Summaries of every stored composition, sorted by id
    ///
    /// Only `<id>.yaml` files are listed, the same names `load` resolves.
    /// Files that fail to parse are logged and skipped.
    pub fn list(&self) -> Result<Vec<CompositionSummary>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries: Vec<CompositionSummary> = WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let path = entry.path();
                let ext = path.extension()?.to_str()?;
                if ext != DOCUMENT_EXTENSION {
                    return None;
                }
                let id = path.file_stem()?.to_string_lossy().into_owned();

                let raw = fs::read_to_string(path)
                    .map_err(WhitenoiseError::from)
                    .and_then(|text| RawComposition::from_yaml_str(&text));
                match raw {
                    Ok(raw) => Some(CompositionSummary {
                        name: raw.name.unwrap_or_else(|| id.clone()),
                        description: raw.description.unwrap_or_default(),
                        duration: raw.duration.unwrap_or(0.0),
                        track_count: raw.tracks.len(),
                        id,
                    }),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable composition");
                        None
                    }
                }
            })
            .collect();

        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    /// Load a composition and attach catalog information to each track
    pub fn detail(&self, id: &str, catalog: &Catalog) -> Result<CompositionDetail> {
        let composition = self.load(id, None)?;

        let tracks = composition
            .tracks
            .into_iter()
            .map(|track| {
                let audio_info = catalog.resolve(&track.audio).entry.map(|entry| AudioInfo {
                    description_zh: entry.description_zh.clone(),
                    description_en: entry.description_en.clone(),
                    scene: entry.scene.clone(),
                    duration_seconds: entry.duration_seconds,
                });
                TrackDetail {
                    segment_duration: track.segment_secs(),
                    track,
                    audio_info,
                }
            })
            .collect();

        Ok(CompositionDetail {
            id: Self::normalize_id(id).to_string(),
            name: composition.name,
            description: composition.description,
            duration: composition.duration,
            tracks,
        })
    }
}
