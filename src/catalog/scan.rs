//! Catalog rescan
//!
//! Decodes every catalogued clip, measures its length and mean level, and
//! writes the results back into a fresh catalog snapshot.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::entry::{format_duration, CatalogEntry};
use super::loudness::LoudnessLevel;
use super::Catalog;
use crate::engine::{calculate_rms, import_audio, SILENT_GAIN_DB};
use crate::error::Result;

/// File extensions treated as source clips when scanning a directory
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a", "aac"];

/// Measurements taken from one decoded clip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipAnalysis {
    pub duration_seconds: f64,
    /// Mean RMS level in dBFS, floored at -100
    pub volume_db: f64,
    pub volume_level: LoudnessLevel,
    /// Average bitrate estimated from file size and duration
    pub bitrate_kbps: u32,
}

impl ClipAnalysis {
    /// Copy the measurements onto a catalog entry
    pub fn apply_to(&self, entry: &mut CatalogEntry) {
        entry.duration_seconds = Some(self.duration_seconds);
        entry.duration_formatted = Some(format_duration(self.duration_seconds));
        entry.volume_db = Some(self.volume_db);
        entry.volume_level = self.volume_level;
        entry.bitrate_kbps = Some(self.bitrate_kbps);
    }
}

/// One file that could not be analysed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanError {
    pub filename: String,
    pub reason: String,
}

/// Summary of a rescan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    /// Catalogued entries visited
    pub total: usize,
    /// Entries whose measurements were refreshed
    pub updated: usize,
    pub errors: Vec<ScanError>,
    /// Audio files on disk that the catalog does not describe
    pub unknown_files: Vec<String>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Decode a clip and measure it
pub fn analyze_clip(path: &Path) -> Result<ClipAnalysis> {
    let buffer = import_audio(path)?;
    let duration_seconds = buffer.duration_secs();

    let rms = calculate_rms(&buffer) as f64;
    let volume_db = if rms.is_finite() {
        rms.max(SILENT_GAIN_DB as f64)
    } else {
        SILENT_GAIN_DB as f64
    };

    let size = fs::metadata(path)?.len();
    let bitrate_kbps = if duration_seconds > 0.0 {
        (size as f64 * 8.0 / duration_seconds / 1000.0).round() as u32
    } else {
        0
    };

    Ok(ClipAnalysis {
        duration_seconds: round2(duration_seconds),
        volume_db: round2(volume_db),
        volume_level: LoudnessLevel::classify(volume_db),
        bitrate_kbps,
    })
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.iter().any(|a| e.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

impl Catalog {
    /// Re-measure every catalogued clip found in `audio_dir`
    ///
    /// The current snapshot is left untouched; the refreshed catalog is
    /// returned alongside the report. Uncatalogued audio files are listed in
    /// the report and recorded under `unknown_files` with whatever
    /// measurements could be taken.
    pub fn rescan(&self, audio_dir: &Path) -> (Catalog, ScanReport) {
        let mut document = self.document().clone();
        let mut report = ScanReport::default();

        for category in document.categories.values_mut() {
            for entry in &mut category.files {
                report.total += 1;
                let path = audio_dir.join(&entry.filename);
                match analyze_clip(&path) {
                    Ok(analysis) => {
                        debug!(
                            file = %entry.filename,
                            volume_db = analysis.volume_db,
                            level = %analysis.volume_level,
                            "Analysed clip"
                        );
                        analysis.apply_to(entry);
                        report.updated += 1;
                    }
                    Err(e) => {
                        warn!(file = %entry.filename, error = %e, "Failed to analyse clip");
                        report.errors.push(ScanError {
                            filename: entry.filename.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        let known = self.available_files();
        let mut on_disk: BTreeSet<String> = BTreeSet::new();
        if audio_dir.exists() {
            on_disk = WalkDir::new(audio_dir)
                .max_depth(1)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| is_audio_file(entry.path()))
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect();
        }

        document.unknown_files = on_disk
            .difference(&known)
            .map(|filename| {
                let mut entry = CatalogEntry::bare(filename.clone());
                if let Ok(analysis) = analyze_clip(&audio_dir.join(filename)) {
                    analysis.apply_to(&mut entry);
                }
                entry
            })
            .collect();
        report.unknown_files = document
            .unknown_files
            .iter()
            .map(|e| e.filename.clone())
            .collect();

        info!(
            total = report.total,
            updated = report.updated,
            errors = report.errors.len(),
            unknown = report.unknown_files.len(),
            "Catalog rescan complete"
        );

        (Catalog::from_document(document), report)
    }
}
