//! Loudness classification
//!
//! One canonical four-tier scheme keyed on a clip's mean level in dBFS:
//!
//! | level       | mean level          |
//! |-------------|---------------------|
//! | `loud`      | d > -15             |
//! | `medium`    | -25 < d <= -15      |
//! | `soft`      | -35 < d <= -25      |
//! | `very_soft` | d <= -35            |
//!
//! Catalogs written by older analysis passes used a three-tier
//! `strong`/`medium`/`weak` vocabulary; those labels are read as
//! `loud`/`medium`/`very_soft`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lower bound (exclusive) of the `loud` tier in dBFS
pub const LOUD_ABOVE_DB: f64 = -15.0;
/// Lower bound (exclusive) of the `medium` tier in dBFS
pub const MEDIUM_ABOVE_DB: f64 = -25.0;
/// Lower bound (exclusive) of the `soft` tier in dBFS
pub const SOFT_ABOVE_DB: f64 = -35.0;

/// Loudness tag attached to a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoudnessLevel {
    #[serde(alias = "strong")]
    Loud,
    Medium,
    Soft,
    #[serde(alias = "weak")]
    VerySoft,
    /// Not analysed yet
    #[default]
    Unknown,
}

impl LoudnessLevel {
    /// Classify a mean level in dBFS
    pub fn classify(db: f64) -> Self {
        if db > LOUD_ABOVE_DB {
            LoudnessLevel::Loud
        } else if db > MEDIUM_ABOVE_DB {
            LoudnessLevel::Medium
        } else if db > SOFT_ABOVE_DB {
            LoudnessLevel::Soft
        } else {
            LoudnessLevel::VerySoft
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoudnessLevel::Loud => "loud",
            LoudnessLevel::Medium => "medium",
            LoudnessLevel::Soft => "soft",
            LoudnessLevel::VerySoft => "very_soft",
            LoudnessLevel::Unknown => "unknown",
        }
    }

    /// Track volume range that balances a clip of this loudness in a mix
    pub fn suggested_volume(&self) -> (f64, f64) {
        match self {
            LoudnessLevel::Loud => (0.15, 0.35),
            LoudnessLevel::Medium | LoudnessLevel::Unknown => (0.3, 0.5),
            LoudnessLevel::Soft => (0.4, 0.6),
            LoudnessLevel::VerySoft => (0.5, 0.8),
        }
    }
}

impl fmt::Display for LoudnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(-3.0, LoudnessLevel::Loud)]
    #[test_case(-14.99, LoudnessLevel::Loud)]
    #[test_case(-15.0, LoudnessLevel::Medium)]
    #[test_case(-24.9, LoudnessLevel::Medium)]
    #[test_case(-25.0, LoudnessLevel::Soft)]
    #[test_case(-35.0, LoudnessLevel::VerySoft)]
    #[test_case(-80.0, LoudnessLevel::VerySoft)]
    fn test_classify_boundaries(db: f64, expected: LoudnessLevel) {
        assert_eq!(LoudnessLevel::classify(db), expected);
    }

    #[test]
    fn test_silence_is_very_soft() {
        assert_eq!(
            LoudnessLevel::classify(f64::NEG_INFINITY),
            LoudnessLevel::VerySoft
        );
    }

    #[test]
    fn test_legacy_labels_are_read() {
        let levels: Vec<LoudnessLevel> =
            serde_yaml::from_str("[strong, medium, weak, soft, very_soft, unknown]").unwrap();
        assert_eq!(
            levels,
            vec![
                LoudnessLevel::Loud,
                LoudnessLevel::Medium,
                LoudnessLevel::VerySoft,
                LoudnessLevel::Soft,
                LoudnessLevel::VerySoft,
                LoudnessLevel::Unknown,
            ]
        );
    }

    #[test]
    fn test_serializes_canonical_names() {
        let yaml = serde_yaml::to_string(&LoudnessLevel::VerySoft).unwrap();
        assert_eq!(yaml.trim(), "very_soft");
        assert_eq!(LoudnessLevel::Loud.to_string(), "loud");
    }
}
