//! Catalog document types
//!
//! Mirrors the YAML layout of `audio_descriptions.yaml`: categories keyed by
//! id, each holding a list of described clips.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::loudness::LoudnessLevel;

/// Descriptive metadata for one source clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// File name inside the audio directory; doubles as the source id
    pub filename: String,

    #[serde(default)]
    pub description_zh: String,

    #[serde(default)]
    pub description_en: String,

    /// Suggested listening scenes
    #[serde(default)]
    pub scene: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    /// `m:ss`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_formatted: Option<String>,

    #[serde(default)]
    pub volume_level: LoudnessLevel,

    /// Mean level in dBFS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_db: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
}

impl CatalogEntry {
    /// Entry with only a filename, as produced for uncatalogued files
    pub fn bare(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            description_zh: String::new(),
            description_en: String::new(),
            scene: String::new(),
            duration_seconds: None,
            duration_formatted: None,
            volume_level: LoudnessLevel::Unknown,
            volume_db: None,
            bitrate_kbps: None,
        }
    }
}

/// A named group of clips (rain, wind, birds, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub name_zh: String,

    #[serde(default)]
    pub name_en: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub files: Vec<CatalogEntry>,
}

/// Whole catalog file
///
/// Keys other than `categories` and `unknown_files` (usage guides,
/// metadata blocks) are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub categories: BTreeMap<String, Category>,

    /// Clips found on disk that have no description yet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_files: Vec<CatalogEntry>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Format seconds as `m:ss`
pub fn format_duration(secs: f64) -> String {
    let whole = secs.max(0.0) as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(59.9), "0:59");
        assert_eq!(format_duration(185.2), "3:05");
    }

    #[test]
    fn test_document_keeps_extra_keys() {
        let yaml = r#"
metadata:
  version: 2
categories:
  rain_sounds:
    name_zh: 雨声
    name_en: Rain
    files:
      - filename: light-rain.mp3
        description_en: Light rain
        volume_level: weak
"#;
        let doc: CatalogDocument = serde_yaml::from_str(yaml).unwrap();
        assert!(doc.extra.contains_key("metadata"));

        let entry = &doc.categories["rain_sounds"].files[0];
        assert_eq!(entry.volume_level, LoudnessLevel::VerySoft);
        assert_eq!(entry.duration_seconds, None);

        let written = serde_yaml::to_string(&doc).unwrap();
        assert!(written.contains("metadata"));
        assert!(written.contains("very_soft"));
    }
}
