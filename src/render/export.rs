//! Export and publishing
//!
//! WAV is written directly with hound. FLAC, MP3 and OGG go through an
//! external `ffmpeg` process fed with an intermediate WAV.
//!
//! Every export is first written to a scratch file inside the output
//! directory and renamed over `<dir>/<id>.<ext>` only once encoding has
//! succeeded, so readers never see a partial artifact.

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::engine::{write_wav, AudioBuffer};
use crate::error::{Result, WhitenoiseError};

/// Bitrate used for lossy formats when none is given
pub const DEFAULT_BITRATE_KBPS: u32 = 192;

/// Target encoding of a published render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ExportFormat {
    /// 16/24-bit integer or 32-bit float PCM
    Wav { bit_depth: u16 },
    Flac,
    Mp3 { bitrate_kbps: u32 },
    Ogg { bitrate_kbps: u32 },
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat::Mp3 {
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
        }
    }
}

impl ExportFormat {
    /// Build a format from a name and an optional bitrate such as `192k`
    pub fn parse(format: &str, bitrate: Option<&str>) -> Result<Self> {
        let bitrate_kbps = bitrate
            .map(parse_bitrate)
            .transpose()?
            .unwrap_or(DEFAULT_BITRATE_KBPS);

        match format.to_ascii_lowercase().as_str() {
            "wav" => Ok(ExportFormat::Wav { bit_depth: 16 }),
            "flac" => Ok(ExportFormat::Flac),
            "mp3" => Ok(ExportFormat::Mp3 { bitrate_kbps }),
            "ogg" => Ok(ExportFormat::Ogg { bitrate_kbps }),
            other => Err(WhitenoiseError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Wav { .. } => "wav",
            ExportFormat::Flac => "flac",
            ExportFormat::Mp3 { .. } => "mp3",
            ExportFormat::Ogg { .. } => "ogg",
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(self, ExportFormat::Mp3 { .. } | ExportFormat::Ogg { .. })
    }

    /// ffmpeg arguments selecting the encoder, or `None` for native WAV
    fn ffmpeg_codec_args(&self) -> Option<Vec<String>> {
        match self {
            ExportFormat::Wav { .. } => None,
            ExportFormat::Flac => Some(vec!["-codec:a".into(), "flac".into()]),
            ExportFormat::Mp3 { bitrate_kbps } => Some(vec![
                "-codec:a".into(),
                "libmp3lame".into(),
                "-b:a".into(),
                format!("{}k", bitrate_kbps),
            ]),
            ExportFormat::Ogg { bitrate_kbps } => Some(vec![
                "-codec:a".into(),
                "libvorbis".into(),
                "-b:a".into(),
                format!("{}k", bitrate_kbps),
            ]),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = WhitenoiseError;

    fn from_str(s: &str) -> Result<Self> {
        ExportFormat::parse(s, None)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Mp3 { bitrate_kbps } | ExportFormat::Ogg { bitrate_kbps } => {
                write!(f, "{} ({}k)", self.extension(), bitrate_kbps)
            }
            ExportFormat::Wav { bit_depth } => write!(f, "wav ({}-bit)", bit_depth),
            ExportFormat::Flac => f.write_str("flac"),
        }
    }
}

fn parse_bitrate(text: &str) -> Result<u32> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_suffix('k')
        .or_else(|| trimmed.strip_suffix('K'))
        .unwrap_or(trimmed);
    match digits.parse::<u32>() {
        Ok(kbps) if kbps > 0 => Ok(kbps),
        _ => Err(WhitenoiseError::UnsupportedFormat {
            format: format!("bitrate '{}'", text),
        }),
    }
}

/// A file that was successfully published
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedArtifact {
    pub path: PathBuf,
    pub size: u64,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

/// Encodes master buffers and publishes them atomically
#[derive(Debug, Clone)]
pub struct Exporter {
    ffmpeg: PathBuf,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Exporter {
    /// # Arguments
    /// * `ffmpeg` - ffmpeg binary; `None` looks it up on `PATH`
    pub fn new(ffmpeg: Option<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.unwrap_or_else(|| PathBuf::from("ffmpeg")),
        }
    }

    /// Path an artifact for `id` is published to
    pub fn artifact_path(dir: &Path, id: &str, format: ExportFormat) -> PathBuf {
        dir.join(format!("{}.{}", id, format.extension()))
    }

    /// Encode `buffer` and publish it as `<dir>/<id>.<ext>`
    ///
    /// An existing artifact is replaced. On failure nothing is left at the
    /// published path beyond whatever was there before.
    #[instrument(skip(self, buffer), fields(frames = buffer.len()))]
    pub fn publish(
        &self,
        buffer: &AudioBuffer,
        dir: &Path,
        id: &str,
        format: ExportFormat,
    ) -> Result<PublishedArtifact> {
        fs::create_dir_all(dir)?;
        let target = Self::artifact_path(dir, id, format);

        let scratch = tempfile::Builder::new()
            .prefix(&format!(".{}-", id))
            .suffix(&format!(".{}.part", format.extension()))
            .tempfile_in(dir)?;

        match format {
            ExportFormat::Wav { bit_depth } => write_wav(buffer, scratch.path(), bit_depth)?,
            _ => self.encode_with_ffmpeg(buffer, scratch.path(), format)?,
        }

        let size = fs::metadata(scratch.path())?.len();
        if size == 0 {
            return Err(WhitenoiseError::ExportFailed {
                reason: format!("encoder produced an empty {} file", format.extension()),
            });
        }

        scratch
            .persist(&target)
            .map_err(|e| WhitenoiseError::ExportFailed {
                reason: format!("failed to publish {}: {}", target.display(), e.error),
            })?;

        let sha256 = sha256_file(&target)?;
        info!(path = %target.display(), size, %format, "Published render");

        Ok(PublishedArtifact {
            path: target,
            size,
            sha256,
        })
    }

    fn encode_with_ffmpeg(
        &self,
        buffer: &AudioBuffer,
        output: &Path,
        format: ExportFormat,
    ) -> Result<()> {
        let Some(codec_args) = format.ffmpeg_codec_args() else {
            return Err(WhitenoiseError::UnsupportedFormat {
                format: format.to_string(),
            });
        };

        let temp_dir = tempfile::tempdir()?;
        let temp_wav = temp_dir.path().join("master.wav");
        write_wav(buffer, &temp_wav, 24)?;

        let muxer = match format {
            ExportFormat::Ogg { .. } => "ogg",
            other => other.extension(),
        };

        debug!(ffmpeg = %self.ffmpeg.display(), ?codec_args, "Invoking encoder");
        let result = Command::new(&self.ffmpeg)
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(&temp_wav)
            .args(&codec_args)
            .args(["-f", muxer])
            .arg(output)
            .output()
            .map_err(|e| WhitenoiseError::EncoderUnavailable {
                encoder: format!("{}: {}", self.ffmpeg.display(), e),
            })?;

        if !result.status.success() {
            return Err(WhitenoiseError::ExportFailed {
                reason: format!(
                    "ffmpeg exited with {}: {}",
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            });
        }

        Ok(())
    }
}

/// SHA-256 of a file as lowercase hex
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut chunk = [0u8; 8192];

    loop {
        let read = file.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        hasher.update(&chunk[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{import_audio, ChannelLayout};
    use test_case::test_case;

    fn master() -> AudioBuffer {
        AudioBuffer::from_channels(vec![vec![0.5; 800], vec![-0.5; 800]], 8000).unwrap()
    }

    #[test_case("wav", None => ExportFormat::Wav { bit_depth: 16 } ; "wav")]
    #[test_case("MP3", None => ExportFormat::Mp3 { bitrate_kbps: 192 } ; "mp3 default bitrate")]
    #[test_case("mp3", Some("128k") => ExportFormat::Mp3 { bitrate_kbps: 128 } ; "mp3 with bitrate")]
    #[test_case("ogg", Some("96") => ExportFormat::Ogg { bitrate_kbps: 96 } ; "ogg bare number")]
    #[test_case("flac", Some("320k") => ExportFormat::Flac ; "flac ignores bitrate")]
    fn test_parse_format(format: &str, bitrate: Option<&str>) -> ExportFormat {
        ExportFormat::parse(format, bitrate).unwrap()
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(ExportFormat::parse("aiff", None).is_err());
        assert!(ExportFormat::parse("mp3", Some("fast")).is_err());
        assert!(ExportFormat::parse("mp3", Some("0k")).is_err());
    }

    #[test]
    fn test_publish_wav_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::default();
        let format = ExportFormat::Wav { bit_depth: 32 };

        let first = exporter.publish(&master(), dir.path(), "calm", format).unwrap();
        assert_eq!(first.path, dir.path().join("calm.wav"));
        assert_eq!(first.size, fs::metadata(&first.path).unwrap().len());
        assert_eq!(first.sha256.len(), 64);
        assert_eq!(import_audio(&first.path).unwrap(), master());

        let quieter = master().to_layout(ChannelLayout::Mono);
        let second = exporter.publish(&quieter, dir.path(), "calm", format).unwrap();
        assert_ne!(first.sha256, second.sha256);

        // Only the published file remains
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["calm.wav".to_string()]);
    }

    #[test]
    fn test_missing_encoder_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(Some(PathBuf::from("/nonexistent/ffmpeg")));

        let err = exporter
            .publish(&master(), dir.path(), "calm", ExportFormat::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "ENCODER_UNAVAILABLE");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_identical_renders_hash_identically() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::default();
        let format = ExportFormat::Wav { bit_depth: 16 };

        let a = exporter.publish(&master(), dir.path(), "a", format).unwrap();
        let b = exporter.publish(&master(), dir.path(), "b", format).unwrap();
        assert_eq!(a.sha256, b.sha256);
    }
}
