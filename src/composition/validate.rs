//! Composition validation
//!
//! Turns a `RawComposition` into a `Composition`, filling optional fields
//! from a `TrackDefaults` set and collecting every problem found rather than
//! stopping at the first.

use thiserror::Error;

use super::model::{Composition, RawComposition, Track};
use crate::catalog::Catalog;
use crate::error::{Result, WhitenoiseError};

/// A single reason a document was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    #[error("missing name")]
    MissingName,

    #[error("missing duration")]
    MissingDuration,

    #[error("duration must be positive, got {duration}")]
    NonPositiveDuration { duration: f64 },

    #[error("duration {duration}s exceeds the {max}s limit")]
    DurationTooLong { duration: f64, max: f64 },

    #[error("tracks must not be empty")]
    EmptyTracks,

    #[error("track {track}: missing audio")]
    MissingAudio { track: usize },

    #[error("track {track}: start must not be negative, got {start}")]
    NegativeStart { track: usize, start: f64 },

    #[error("track {track}: end ({end}) must be after start ({start})")]
    EndNotAfterStart { track: usize, start: f64, end: f64 },

    #[error("track {track}: fades must not be negative")]
    NegativeFade { track: usize },

    #[error("track {track}: {field} must be a finite number")]
    NonFiniteValue { track: usize, field: &'static str },

    #[error("track {track}: unknown audio file '{audio}'")]
    UnknownSource { track: usize, audio: String },
}

/// Longest composition accepted, in seconds
///
/// Bounds the master buffer: two hours of 48 kHz stereo is about 2.8 GB.
pub const MAX_DURATION_SECS: f64 = 2.0 * 60.0 * 60.0;

/// Values used for track fields a document leaves out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackDefaults {
    pub volume: f64,
    pub fade_in: f64,
    pub fade_out: f64,
    pub loop_: bool,
}

impl TrackDefaults {
    /// Defaults for hand-written documents
    pub fn document() -> Self {
        Self {
            volume: 1.0,
            fade_in: 0.0,
            fade_out: 0.0,
            loop_: true,
        }
    }

    /// Defaults for LLM-generated documents
    pub fn generated() -> Self {
        Self {
            volume: 0.5,
            fade_in: 5.0,
            fade_out: 5.0,
            loop_: true,
        }
    }
}

impl Default for TrackDefaults {
    fn default() -> Self {
        Self::document()
    }
}

/// Validate a raw document
///
/// # Arguments
/// * `raw` - Parsed but unchecked document
/// * `defaults` - Values for omitted track fields
/// * `catalog` - When given, every track's audio must resolve in it
///
/// # Errors
/// `InvalidDocument` listing every issue found.
pub fn validate(
    raw: &RawComposition,
    defaults: &TrackDefaults,
    catalog: Option<&Catalog>,
) -> Result<Composition> {
    let mut issues = Vec::new();

    let name = match raw.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            issues.push(ValidationIssue::MissingName);
            String::new()
        }
    };

    let duration = match raw.duration {
        None => {
            issues.push(ValidationIssue::MissingDuration);
            0.0
        }
        Some(d) if !(d.is_finite() && d > 0.0) => {
            issues.push(ValidationIssue::NonPositiveDuration { duration: d });
            0.0
        }
        Some(d) if d > MAX_DURATION_SECS => {
            issues.push(ValidationIssue::DurationTooLong {
                duration: d,
                max: MAX_DURATION_SECS,
            });
            d
        }
        Some(d) => d,
    };

    if raw.tracks.is_empty() {
        issues.push(ValidationIssue::EmptyTracks);
    }

    let mut tracks = Vec::with_capacity(raw.tracks.len());
    for (index, track) in raw.tracks.iter().enumerate() {
        let audio = match track.audio.as_deref().map(str::trim) {
            Some(audio) if !audio.is_empty() => audio.to_string(),
            _ => {
                issues.push(ValidationIssue::MissingAudio { track: index });
                continue;
            }
        };

        if let Some(catalog) = catalog {
            if !catalog.contains(&audio) {
                issues.push(ValidationIssue::UnknownSource {
                    track: index,
                    audio: audio.clone(),
                });
            }
        }

        let start = track.start.unwrap_or(0.0);
        let end = track.end.unwrap_or(duration);
        let volume = track.volume.unwrap_or(defaults.volume);
        let fade_in = track.fade_in.unwrap_or(defaults.fade_in);
        let fade_out = track.fade_out.unwrap_or(defaults.fade_out);

        let fields = [
            ("start", start),
            ("end", end),
            ("volume", volume),
            ("fade_in", fade_in),
            ("fade_out", fade_out),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                issues.push(ValidationIssue::NonFiniteValue { track: index, field });
            }
        }

        if start < 0.0 && start.is_finite() {
            issues.push(ValidationIssue::NegativeStart {
                track: index,
                start,
            });
        }
        if start.is_finite() && end.is_finite() && !(end > start) {
            issues.push(ValidationIssue::EndNotAfterStart {
                track: index,
                start,
                end,
            });
        }
        if (fade_in.is_finite() && fade_in < 0.0) || (fade_out.is_finite() && fade_out < 0.0) {
            issues.push(ValidationIssue::NegativeFade { track: index });
        }

        tracks.push(Track {
            audio,
            start,
            end,
            volume,
            fade_in,
            fade_out,
            loop_: track.loop_.unwrap_or(defaults.loop_),
        });
    }

    if !issues.is_empty() {
        return Err(WhitenoiseError::InvalidDocument { issues });
    }

    Ok(Composition {
        name,
        description: raw.description.clone().unwrap_or_default(),
        duration,
        tracks,
    })
}

/// Parse and validate a document in one step
pub fn parse_composition(
    text: &str,
    defaults: &TrackDefaults,
    catalog: Option<&Catalog>,
) -> Result<Composition> {
    let raw = RawComposition::from_yaml_str(text)?;
    validate(&raw, defaults, catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;
    use pretty_assertions::assert_eq;

    fn issues_of(err: WhitenoiseError) -> Vec<ValidationIssue> {
        match err {
            WhitenoiseError::InvalidDocument { issues } => issues,
            other => panic!("expected InvalidDocument, got {:?}", other),
        }
    }

    #[test]
    fn test_document_defaults_are_filled() {
        let composition = parse_composition(
            "name: Calm\nduration: 30\ntracks:\n  - audio: light-rain.mp3\n",
            &TrackDefaults::document(),
            None,
        )
        .unwrap();

        assert_eq!(
            composition.tracks[0],
            Track {
                audio: "light-rain.mp3".to_string(),
                start: 0.0,
                end: 30.0,
                volume: 1.0,
                fade_in: 0.0,
                fade_out: 0.0,
                loop_: true,
            }
        );
        assert_eq!(composition.description, "");
    }

    #[test]
    fn test_generated_defaults_are_filled() {
        let composition = parse_composition(
            "name: Calm\nduration: 30\ntracks:\n  - audio: light-rain.mp3\n    start: 4\n",
            &TrackDefaults::generated(),
            None,
        )
        .unwrap();

        let track = &composition.tracks[0];
        assert_eq!(track.volume, 0.5);
        assert_eq!(track.fade_in, 5.0);
        assert_eq!(track.fade_out, 5.0);
        assert_eq!(track.start, 4.0);
        assert_eq!(track.end, 30.0);
    }

    #[test]
    fn test_every_issue_is_collected() {
        let raw = RawComposition::from_yaml_str(
            r#"
duration: -3
tracks:
  - volume: 0.5
  - audio: a.mp3
    start: 5
    end: 2
    fade_in: -1
"#,
        )
        .unwrap();

        let issues = issues_of(validate(&raw, &TrackDefaults::document(), None).unwrap_err());
        assert_eq!(
            issues,
            vec![
                ValidationIssue::MissingName,
                ValidationIssue::NonPositiveDuration { duration: -3.0 },
                ValidationIssue::MissingAudio { track: 0 },
                ValidationIssue::EndNotAfterStart {
                    track: 1,
                    start: 5.0,
                    end: 2.0
                },
                ValidationIssue::NegativeFade { track: 1 },
            ]
        );
    }

    #[test]
    fn test_empty_tracks_and_missing_duration() {
        let raw = RawComposition::from_yaml_str("name: x\ntracks: []\n").unwrap();
        let issues = issues_of(validate(&raw, &TrackDefaults::document(), None).unwrap_err());
        assert_eq!(
            issues,
            vec![ValidationIssue::MissingDuration, ValidationIssue::EmptyTracks]
        );
    }

    #[test]
    fn test_catalog_check_is_fail_fast_only() {
        let text = "name: x\nduration: 10\ntracks:\n  - audio: ocean.mp3\n";

        // Without a catalog unknown sources are left to the renderer
        assert!(parse_composition(text, &TrackDefaults::document(), None).is_ok());

        let catalog = sample_catalog();
        let issues = issues_of(
            parse_composition(text, &TrackDefaults::document(), Some(&catalog)).unwrap_err(),
        );
        assert_eq!(
            issues,
            vec![ValidationIssue::UnknownSource {
                track: 0,
                audio: "ocean.mp3".to_string()
            }]
        );
    }

    #[test]
    fn test_end_defaults_to_duration_before_comparison() {
        let raw = RawComposition::from_yaml_str(
            "name: x\nduration: 10\ntracks:\n  - audio: a.mp3\n    start: 12\n",
        )
        .unwrap();
        let issues = issues_of(validate(&raw, &TrackDefaults::document(), None).unwrap_err());
        assert_eq!(
            issues,
            vec![ValidationIssue::EndNotAfterStart {
                track: 0,
                start: 12.0,
                end: 10.0
            }]
        );
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let raw = RawComposition::from_yaml_str(
            r#"
name: x
duration: 10
tracks:
  - audio: a.mp3
    volume: .nan
  - audio: b.mp3
    start: 1
    end: .inf
    fade_out: -.inf
"#,
        )
        .unwrap();

        let issues = issues_of(validate(&raw, &TrackDefaults::document(), None).unwrap_err());
        assert_eq!(
            issues,
            vec![
                ValidationIssue::NonFiniteValue {
                    track: 0,
                    field: "volume"
                },
                ValidationIssue::NonFiniteValue {
                    track: 1,
                    field: "end"
                },
                ValidationIssue::NonFiniteValue {
                    track: 1,
                    field: "fade_out"
                },
            ]
        );
    }

    #[test]
    fn test_duration_limit() {
        let text = |d: f64| format!("name: x\nduration: {}\ntracks:\n  - audio: a.mp3\n", d);

        let at_limit = parse_composition(&text(MAX_DURATION_SECS), &TrackDefaults::document(), None);
        assert!(at_limit.is_ok());

        let long = MAX_DURATION_SECS + 1.0;
        let issues = issues_of(
            parse_composition(&text(long), &TrackDefaults::document(), None).unwrap_err(),
        );
        assert_eq!(
            issues,
            vec![ValidationIssue::DurationTooLong {
                duration: long,
                max: MAX_DURATION_SECS
            }]
        );
    }

    #[test]
    fn test_end_past_duration_is_accepted() {
        let composition = parse_composition(
            "name: x\nduration: 10\ntracks:\n  - audio: a.mp3\n    end: 1.0e15\n",
            &TrackDefaults::document(),
            None,
        )
        .unwrap();
        assert_eq!(composition.tracks[0].end, 1.0e15);
    }
}
