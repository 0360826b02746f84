//! Runtime configuration
//!
//! Directory layout, render format and LLM settings. Values come from
//! environment variables with defaults; the CLI overrides individual fields.

use std::env;
use std::path::{Path, PathBuf};

use crate::composition::CompositionStore;
use crate::engine::{ChannelLayout, CANONICAL_SAMPLE_RATE};
use crate::error::Result;
use crate::render::{DirectorySource, ExportFormat, Exporter, RenderSettings};

pub const DEFAULT_API_URL: &str = "https://api.deepseek.com/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const API_KEY_VAR: &str = "DEEPSEEK_API_KEY";

/// Chat-completion endpoint settings
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub api_url: String,
    /// `None` when `DEEPSEEK_API_KEY` is unset
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout_secs: 60,
        }
    }
}

/// Everything the CLI needs to wire the library together
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Source clips
    pub audio_dir: PathBuf,
    /// Composition documents
    pub compositions_dir: PathBuf,
    /// Published renders
    pub composed_dir: PathBuf,
    /// `audio_descriptions.yaml`
    pub catalog_path: PathBuf,

    pub sample_rate: u32,
    pub layout: ChannelLayout,
    pub export_format: ExportFormat,
    /// `None` looks ffmpeg up on `PATH`
    pub ffmpeg: Option<PathBuf>,

    pub llm: LlmSettings,
}

impl Config {
    /// Default layout rooted at `base`
    pub fn with_base_dir(base: impl AsRef<Path>) -> Self {
        let mut config = Self {
            audio_dir: PathBuf::new(),
            compositions_dir: PathBuf::new(),
            composed_dir: PathBuf::new(),
            catalog_path: PathBuf::new(),
            sample_rate: CANONICAL_SAMPLE_RATE,
            layout: ChannelLayout::Stereo,
            export_format: ExportFormat::default(),
            ffmpeg: None,
            llm: LlmSettings::default(),
        };
        config.set_base_dir(base);
        config
    }

    /// Point every directory at the default layout under `base`
    pub fn set_base_dir(&mut self, base: impl AsRef<Path>) {
        let base = base.as_ref();
        self.audio_dir = base.join("pixabay");
        self.compositions_dir = base.join("compositions");
        self.composed_dir = base.join("composed");
        self.catalog_path = base.join("audio_descriptions.yaml");
    }

    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = lookup("WHITENOISE_BASE_DIR").unwrap_or_else(|| ".".into());
        let mut config = Self::with_base_dir(&base);

        if let Some(dir) = lookup("WHITENOISE_AUDIO_DIR") {
            config.audio_dir = PathBuf::from(dir);
        }
        if let Some(rate) = lookup("WHITENOISE_SAMPLE_RATE").and_then(|s| s.parse().ok()) {
            config.sample_rate = rate;
        }
        config.ffmpeg = lookup("WHITENOISE_FFMPEG").map(PathBuf::from);

        let defaults = LlmSettings::default();
        config.llm = LlmSettings {
            api_url: lookup("DEEPSEEK_API_URL").unwrap_or(defaults.api_url),
            api_key: lookup(API_KEY_VAR).filter(|k| !k.trim().is_empty()),
            model: lookup("DEEPSEEK_MODEL").unwrap_or(defaults.model),
            timeout_secs: lookup("DEEPSEEK_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            ..defaults
        };

        config
    }

    /// Create every directory the pipeline writes to
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.compositions_dir)?;
        std::fs::create_dir_all(&self.composed_dir)?;
        Ok(())
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            sample_rate: self.sample_rate,
            layout: self.layout,
        }
    }

    pub fn store(&self) -> CompositionStore {
        CompositionStore::new(&self.compositions_dir)
    }

    pub fn source(&self) -> DirectorySource {
        DirectorySource::new(&self.audio_dir)
    }

    pub fn exporter(&self) -> Exporter {
        Exporter::new(self.ffmpeg.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_base_dir(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.audio_dir, PathBuf::from("./pixabay"));
        assert_eq!(config.catalog_path, PathBuf::from("./audio_descriptions.yaml"));
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.export_format, ExportFormat::Mp3 { bitrate_kbps: 192 });
        assert_eq!(config.llm, LlmSettings::default());
        assert_eq!(config.llm.api_key, None);
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("WHITENOISE_BASE_DIR", "/srv/noise"),
            ("WHITENOISE_AUDIO_DIR", "/mnt/clips"),
            ("WHITENOISE_SAMPLE_RATE", "44100"),
            ("WHITENOISE_FFMPEG", "/opt/ffmpeg"),
            ("DEEPSEEK_API_KEY", "sk-test"),
            ("DEEPSEEK_MODEL", "deepseek-reasoner"),
            ("DEEPSEEK_TIMEOUT_SECS", "5"),
        ]));

        assert_eq!(config.audio_dir, PathBuf::from("/mnt/clips"));
        assert_eq!(config.composed_dir, PathBuf::from("/srv/noise/composed"));
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.ffmpeg, Some(PathBuf::from("/opt/ffmpeg")));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.model, "deepseek-reasoner");
        assert_eq!(config.llm.timeout_secs, 5);
        assert_eq!(config.llm.max_tokens, 2000);
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let config = Config::from_lookup(lookup_from(&[("DEEPSEEK_API_KEY", "  ")]));
        assert_eq!(config.llm.api_key, None);
    }

    #[test]
    fn test_set_base_dir_moves_every_directory() {
        let mut config = Config::default();
        config.set_base_dir("/data");
        assert_eq!(config.compositions_dir, PathBuf::from("/data/compositions"));
        assert_eq!(config.audio_dir, PathBuf::from("/data/pixabay"));
    }

    #[test]
    fn test_bad_sample_rate_falls_back() {
        let config = Config::from_lookup(lookup_from(&[("WHITENOISE_SAMPLE_RATE", "fast")]));
        assert_eq!(config.sample_rate, 48000);
    }
}
