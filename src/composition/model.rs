//! Composition document types
//!
//! `RawComposition` is what comes off the wire: every field optional, no
//! checks. `Composition` is the validated form the renderer accepts.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WhitenoiseError};

/// Unvalidated track as written in a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_in: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_out: Option<f64>,
    #[serde(default, rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_: Option<bool>,
}

/// Unvalidated composition document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawComposition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub tracks: Vec<RawTrack>,
}

impl RawComposition {
    /// Parse YAML (or JSON, which is a YAML subset) into a raw document
    ///
    /// # Errors
    /// `MalformedDocument` when the text is not a mapping of the expected shape.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| WhitenoiseError::MalformedDocument {
                reason: e.to_string(),
            })?;

        if !value.is_mapping() {
            return Err(WhitenoiseError::MalformedDocument {
                reason: "document is not a mapping".to_string(),
            });
        }

        serde_yaml::from_value(value).map_err(|e| WhitenoiseError::MalformedDocument {
            reason: e.to_string(),
        })
    }
}

/// One validated audio contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Source clip id
    pub audio: String,
    /// Placement in seconds, `start < end`
    pub start: f64,
    pub end: f64,
    /// Linear gain; `<= 0` is silence
    pub volume: f64,
    /// Fade windows in seconds
    pub fade_in: f64,
    pub fade_out: f64,
    #[serde(rename = "loop")]
    pub loop_: bool,
}

impl Track {
    /// Segment length `end - start` in seconds
    pub fn segment_secs(&self) -> f64 {
        self.end - self.start
    }
}

/// A validated composition ready to render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Master length in seconds, `> 0`
    pub duration: f64,
    pub tracks: Vec<Track>,
}

impl Composition {
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_parse_keeps_missing_fields_empty() {
        let raw = RawComposition::from_yaml_str(
            r#"
name: Rainy night
duration: 600
tracks:
  - audio: light-rain.mp3
    volume: 0.4
    loop: false
"#,
        )
        .unwrap();

        assert_eq!(raw.name.as_deref(), Some("Rainy night"));
        assert_eq!(raw.description, None);
        assert_eq!(raw.duration, Some(600.0));
        assert_eq!(raw.tracks[0].loop_, Some(false));
        assert_eq!(raw.tracks[0].start, None);
    }

    #[test]
    fn test_raw_parse_accepts_json() {
        let raw = RawComposition::from_yaml_str(r#"{"name": "x", "duration": 5, "tracks": []}"#)
            .unwrap();
        assert_eq!(raw.duration, Some(5.0));
    }

    #[test]
    fn test_raw_parse_rejects_non_mapping() {
        let err = RawComposition::from_yaml_str("- just\n- a list\n").unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_DOCUMENT");

        let err = RawComposition::from_yaml_str("name: [unclosed").unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_DOCUMENT");
    }

    #[test]
    fn test_track_serializes_loop_key() {
        let composition = Composition {
            name: "n".to_string(),
            description: String::new(),
            duration: 10.0,
            tracks: vec![Track {
                audio: "a.mp3".to_string(),
                start: 0.0,
                end: 10.0,
                volume: 1.0,
                fade_in: 0.0,
                fade_out: 0.0,
                loop_: true,
            }],
        };
        let yaml = composition.to_yaml_string().unwrap();
        assert!(yaml.contains("loop: true"));
        assert_eq!(composition.tracks[0].segment_secs(), 10.0);
    }
}
