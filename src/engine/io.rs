//! Audio file I/O for WhiteNoise
//!
//! Decodes source clips and writes WAV output. WAV files go through `hound`;
//! every other container (MP3, OGG, FLAC, ...) is handed to Symphonia.
//!
//! Decoded clips keep their native rate and channel count; [`conform`]
//! converts them to the render format. Sample rate conversion uses linear
//! interpolation.

use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{Result, WhitenoiseError};

/// Decode an audio file into a float buffer at its native format
///
/// # Errors
/// * `SourceNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file cannot be decoded
/// * `UnsupportedFormat` - If no decoder recognises the container
/// * `EmptyAudio` - If the file decodes to zero samples
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(WhitenoiseError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    let buffer = if is_wav {
        import_wav(path)?
    } else {
        import_compressed(path)?
    };

    if buffer.is_empty() {
        return Err(WhitenoiseError::EmptyAudio);
    }

    debug!(
        path = %path.display(),
        sample_rate = buffer.sample_rate,
        channels = buffer.channels(),
        frames = buffer.len(),
        "Decoded audio file"
    );

    Ok(buffer)
}

/// Convert a decoded clip to the render sample rate and channel layout
pub fn conform(buffer: AudioBuffer, sample_rate: u32, layout: ChannelLayout) -> AudioBuffer {
    let resampled = if buffer.sample_rate != sample_rate && buffer.sample_rate != 0 {
        let ratio = sample_rate as f64 / buffer.sample_rate as f64;
        AudioBuffer {
            samples: buffer
                .samples
                .iter()
                .map(|channel| resample_linear(channel, ratio))
                .collect(),
            sample_rate,
        }
    } else {
        buffer
    };

    if resampled.channel_layout() == Some(layout) {
        resampled
    } else {
        resampled.to_layout(layout)
    }
}

/// Write a buffer as a WAV file
///
/// # Arguments
/// * `buffer` - The audio buffer to export
/// * `path` - Path where the file will be written
/// * `bit_depth` - 16 or 24 (integer PCM) or 32 (float)
pub fn write_wav(buffer: &AudioBuffer, path: &Path, bit_depth: u16) -> Result<()> {
    let file = File::create(path)?;
    write_wav_to(buffer, std::io::BufWriter::new(file), bit_depth)
}

/// Encode a buffer as an in-memory WAV file
pub fn encode_wav_bytes(buffer: &AudioBuffer, bit_depth: u16) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav_to(buffer, &mut cursor, bit_depth)?;
    Ok(cursor.into_inner())
}

fn write_wav_to<W: Write + Seek>(buffer: &AudioBuffer, sink: W, bit_depth: u16) -> Result<()> {
    let sample_format = match bit_depth {
        16 | 24 => SampleFormat::Int,
        32 => SampleFormat::Float,
        _ => {
            return Err(WhitenoiseError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", bit_depth),
            })
        }
    };

    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: bit_depth,
        sample_format,
    };

    let mut writer = WavWriter::new(sink, spec).map_err(export_error)?;

    for sample in buffer.to_interleaved() {
        match bit_depth {
            16 => {
                let scaled = (sample * 32767.0).round().clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(export_error)?;
            }
            24 => {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).round().clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(export_error)?;
            }
            _ => writer.write_sample(sample).map_err(export_error)?,
        }
    }

    writer.finalize().map_err(export_error)?;
    Ok(())
}

fn export_error(e: hound::Error) -> WhitenoiseError {
    WhitenoiseError::ExportFailed {
        reason: format!("WAV encoder: {}", e),
    }
}

/// Generate a mono sine tone, handy for fixtures and smoke tests
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let mut buffer = AudioBuffer::silent(num_samples, ChannelLayout::Mono, sample_rate);

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

    for (i, sample) in buffer.samples[0].iter_mut().enumerate() {
        *sample = (angular_freq * i as f32).sin();
    }

    buffer
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn import_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path).map_err(|e| WhitenoiseError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;

    AudioBuffer::from_interleaved(&samples, spec.channels as usize, spec.sample_rate)
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let invalid = |e: hound::Error| WhitenoiseError::InvalidAudio {
        reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
        source: Some(Box::new(e)),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(invalid),
        SampleFormat::Int => {
            let scale = match bits_per_sample {
                8 => 128.0,
                16 => 32768.0,
                24 => 8388608.0,
                32 => 2147483648.0,
                _ => {
                    return Err(WhitenoiseError::UnsupportedFormat {
                        format: format!("{}-bit integer audio", bits_per_sample),
                    })
                }
            };
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(invalid)
        }
    }
}

fn import_compressed(path: &Path) -> Result<AudioBuffer> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let format_opts = FormatOptions {
        enable_gapless: true,
        ..Default::default()
    };

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &MetadataOptions::default())
        .map_err(|e| WhitenoiseError::UnsupportedFormat {
            format: format!("{}: {}", path.display(), e),
        })?;

    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| WhitenoiseError::InvalidAudio {
            reason: "no audio track".to_string(),
            source: None,
        })?;

    let track_id = track.id;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| WhitenoiseError::UnsupportedFormat {
            format: format!("codec init failed: {}", e),
        })?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(0);

    loop {
        let packet = match reader.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(WhitenoiseError::InvalidAudio {
                    reason: format!("read failed: {}", e),
                    source: Some(Box::new(e)),
                })
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(error = %msg, path = %path.display(), "Skipping corrupted audio packet");
                continue;
            }
            Err(e) => {
                return Err(WhitenoiseError::InvalidAudio {
                    reason: format!("decode failed: {}", e),
                    source: Some(Box::new(e)),
                })
            }
        };

        let spec = *decoded.spec();
        if decoded.frames() == 0 {
            continue;
        }
        sample_rate = spec.rate;
        channels = spec.channels.count();

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    if channels == 0 || sample_rate == 0 {
        return Err(WhitenoiseError::EmptyAudio);
    }

    AudioBuffer::from_interleaved(&interleaved, channels, sample_rate)
}

/// Linear interpolation resampling
fn resample_linear(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    let target_len = ((source_len as f64) * ratio).round() as usize;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else if src_idx < source_len {
            samples[src_idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ============================================================================
// Tests
// ============================================================================
