//! Audio Buffer Management
//!
//! Provides the core audio buffer type used by the renderer. All mixing
//! happens on non-interleaved 32-bit float samples at a single canonical
//! sample rate and channel layout.

use crate::error::{Result, WhitenoiseError};

// ============================================================================
// Constants
// ============================================================================

/// Canonical sample rate for rendering (48kHz)
pub const CANONICAL_SAMPLE_RATE: u32 = 48000;

/// Gain used for volumes at or below zero (effectively silent)
pub const SILENT_GAIN_DB: f32 = -100.0;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Linear amplitude (0.0 to 1.0+ range)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// # Arguments
/// * `linear` - Linear amplitude value
///
/// # Returns
/// Value in decibels. Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Convert a track volume multiplier to a gain in dB
///
/// Volumes at or below zero map to [`SILENT_GAIN_DB`] rather than -inf.
#[inline]
pub fn volume_to_db(volume: f32) -> f32 {
    if volume <= 0.0 {
        SILENT_GAIN_DB
    } else {
        20.0 * volume.log10()
    }
}

/// Calculate the RMS (Root Mean Square) level of an audio buffer in dB
///
/// # Arguments
/// * `buffer` - Reference to the AudioBuffer to analyze
///
/// # Returns
/// RMS level in dB. Returns -f32::INFINITY for empty or silent buffers.
pub fn calculate_rms(buffer: &AudioBuffer) -> f32 {
    let total_samples = buffer.channels() * buffer.len();
    if total_samples == 0 {
        return f32::NEG_INFINITY;
    }

    let sum_squares: f64 = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();

    let rms = (sum_squares / total_samples as f64).sqrt() as f32;
    linear_to_db(rms)
}

/// Calculate the peak level of an audio buffer in dB
///
/// # Returns
/// Peak level in dB. Returns -f32::INFINITY for empty buffers.
pub fn calculate_peak(buffer: &AudioBuffer) -> f32 {
    let peak = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| s.abs())
        .fold(0.0_f32, f32::max);

    linear_to_db(peak)
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Core audio buffer type for mixing
///
/// Stores audio as non-interleaved 32-bit floating point samples.
/// Each channel is a separate Vec<f32>; all channels have the same length.
///
/// # Example
/// ```
/// use whitenoise::engine::{AudioBuffer, ChannelLayout};
///
/// // Ten seconds of stereo silence at 1 kHz
/// let master = AudioBuffer::silent(10_000, ChannelLayout::Stereo, 1000);
/// assert_eq!(master.channels(), 2);
/// assert_eq!(master.duration_secs(), 10.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer
    ///
    /// # Arguments
    /// * `num_samples` - Number of samples per channel
    /// * `layout` - Channel configuration (Mono or Stereo)
    /// * `sample_rate` - Sample rate in Hz
    pub fn silent(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; layout.num_channels()],
            sample_rate,
        }
    }

    /// Build a buffer from per-channel sample vectors
    ///
    /// # Errors
    /// `InvalidAudio` when no channels are given or channel lengths differ.
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        let Some(first) = samples.first() else {
            return Err(WhitenoiseError::InvalidAudio {
                reason: "buffer has no channels".to_string(),
                source: None,
            });
        };
        let len = first.len();
        if samples.iter().any(|ch| ch.len() != len) {
            return Err(WhitenoiseError::InvalidAudio {
                reason: "channels have different lengths".to_string(),
                source: None,
            });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `num_channels` - Number of interleaved channels (at least 1)
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// Result containing the AudioBuffer, or error if data length doesn't match
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(WhitenoiseError::UnsupportedFormat {
                format: "0-channel audio".to_string(),
            });
        }

        if interleaved.len() % num_channels != 0 {
            return Err(WhitenoiseError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
                source: None,
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels();
        let num_samples = self.len();

        if num_channels == 0 || num_samples == 0 {
            return Vec::new();
        }

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);

        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Get the channel layout
    pub fn channel_layout(&self) -> Option<ChannelLayout> {
        ChannelLayout::from_count(self.channels())
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Repeat the buffer end-to-end until it holds at least `min_frames`
    ///
    /// Uses the minimum whole-copy count `ceil(min_frames / len)`. An empty
    /// buffer, or one already long enough, is returned unchanged.
    pub fn tiled(&self, min_frames: usize) -> AudioBuffer {
        let len = self.len();
        if len == 0 || len >= min_frames {
            return self.clone();
        }

        let copies = min_frames.div_ceil(len);
        let samples = self.samples.iter().map(|ch| ch.repeat(copies)).collect();

        AudioBuffer {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    /// Shorten every channel to at most `frames` samples
    pub fn truncate(&mut self, frames: usize) {
        for channel in &mut self.samples {
            channel.truncate(frames);
        }
    }

    /// Mix `other` into this buffer starting at frame `offset`
    ///
    /// Samples are summed without saturation; anything that would land
    /// past the end of this buffer is dropped. A mono source feeds every
    /// channel of a stereo target.
    ///
    /// # Returns
    /// Number of frames that were mixed
    pub fn overlay_at(&mut self, other: &AudioBuffer, offset: usize) -> usize {
        let len = self.len();
        if offset >= len || other.is_empty() || other.channels() == 0 {
            return 0;
        }

        let frames = other.len().min(len - offset);
        let source_channels = other.channels();

        for (ch, target) in self.samples.iter_mut().enumerate() {
            let source = &other.samples[ch.min(source_channels - 1)];
            for (dst, src) in target[offset..offset + frames]
                .iter_mut()
                .zip(&source[..frames])
            {
                *dst += *src;
            }
        }

        frames
    }

    /// Return a copy converted to the given channel layout
    ///
    /// Mono sources are duplicated into every channel. Wider sources are
    /// folded down by averaging.
    pub fn to_layout(&self, layout: ChannelLayout) -> AudioBuffer {
        let target = layout.num_channels();
        let source = self.channels();

        if source == target || source == 0 {
            return self.clone();
        }

        let samples = if source == 1 {
            vec![self.samples[0].clone(); target]
        } else if target == 1 {
            vec![average_channels(&self.samples)]
        } else {
            // More than two channels into stereo: even channels left, odd right
            let left: Vec<Vec<f32>> = self.samples.iter().step_by(2).cloned().collect();
            let right: Vec<Vec<f32>> = self.samples.iter().skip(1).step_by(2).cloned().collect();
            vec![average_channels(&left), average_channels(&right)]
        };

        AudioBuffer {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    /// Clamp all samples to the valid range [-1.0, 1.0]
    pub fn clamp(&mut self) {
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample = sample.clamp(-1.0, 1.0);
            }
        }
    }

    /// Apply gain to all samples
    ///
    /// # Arguments
    /// * `gain_db` - Gain in decibels
    pub fn apply_gain(&mut self, gain_db: f32) {
        let gain_linear = db_to_linear(gain_db);
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample *= gain_linear;
            }
        }
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::silent(0, ChannelLayout::Stereo, CANONICAL_SAMPLE_RATE)
    }
}

/// Convert seconds to a frame count at `sample_rate`, rounding to nearest
#[inline]
pub fn secs_to_frames(secs: f64, sample_rate: u32) -> usize {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * sample_rate as f64).round() as usize
}

fn average_channels(channels: &[Vec<f32>]) -> Vec<f32> {
    let count = channels.len().max(1) as f32;
    let frames = channels.first().map(|c| c.len()).unwrap_or(0);
    (0..frames)
        .map(|i| channels.iter().map(|c| c[i]).sum::<f32>() / count)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_buffer(samples: Vec<Vec<f32>>) -> AudioBuffer {
        AudioBuffer {
            samples,
            sample_rate: CANONICAL_SAMPLE_RATE,
        }
    }

    // ------------------------------------------------------------------------
    // Unit conversion tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
        assert!(db_to_linear(-120.0) < 1e-5);
    }

    #[test]
    fn test_linear_to_db() {
        assert!((linear_to_db(1.0) - 0.0).abs() < 1e-6);
        assert!((linear_to_db(0.5) - (-6.0206)).abs() < 1e-3);
        assert!(linear_to_db(0.0).is_infinite() && linear_to_db(0.0).is_sign_negative());
    }

    #[test]
    fn test_volume_to_db() {
        assert_eq!(volume_to_db(1.0), 0.0);
        assert!((volume_to_db(0.5) - (-6.0206)).abs() < 1e-3);
        assert_eq!(volume_to_db(0.0), SILENT_GAIN_DB);
        assert_eq!(volume_to_db(-0.3), SILENT_GAIN_DB);
    }

    // ------------------------------------------------------------------------
    // Level measurement tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_calculate_rms_silence() {
        let buffer = create_test_buffer(vec![vec![0.0; 1000]]);
        let rms = calculate_rms(&buffer);
        assert!(rms.is_infinite() && rms.is_sign_negative());
    }

    #[test]
    fn test_calculate_rms_sine() {
        // Sine wave with amplitude 1.0 has RMS of 1/sqrt(2) ~= -3.01 dB
        let num_samples = CANONICAL_SAMPLE_RATE as usize;
        let samples: Vec<f32> = (0..num_samples)
            .map(|i| {
                let t = i as f32 / CANONICAL_SAMPLE_RATE as f32;
                (2.0 * std::f32::consts::PI * 1000.0 * t).sin()
            })
            .collect();
        let buffer = create_test_buffer(vec![samples]);
        assert!((calculate_rms(&buffer) - (-3.01)).abs() < 0.1);
    }

    #[test]
    fn test_calculate_peak_negative() {
        let mut samples = vec![0.0; 1000];
        samples[500] = -0.5;
        let buffer = create_test_buffer(vec![samples]);
        assert!((calculate_peak(&buffer) - (-6.02)).abs() < 0.1);
    }

    // ------------------------------------------------------------------------
    // Layout and construction tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_channel_layout() {
        assert_eq!(ChannelLayout::Mono.num_channels(), 1);
        assert_eq!(ChannelLayout::Stereo.num_channels(), 2);
        assert_eq!(ChannelLayout::from_count(2), Some(ChannelLayout::Stereo));
        assert_eq!(ChannelLayout::from_count(6), None);
    }

    #[test]
    fn test_buffer_from_interleaved_stereo() {
        let interleaved = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let buffer = AudioBuffer::from_interleaved(&interleaved, 2, CANONICAL_SAMPLE_RATE).unwrap();

        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.channel(0)[1], 0.3);
        assert_eq!(buffer.channel(1)[1], 0.4);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_buffer_from_interleaved_invalid() {
        let result = AudioBuffer::from_interleaved(&[0.1, 0.2, 0.3], 2, CANONICAL_SAMPLE_RATE);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_channels_rejects_ragged() {
        let result = AudioBuffer::from_channels(vec![vec![0.0; 3], vec![0.0; 2]], 1000);
        assert!(result.is_err());
        assert!(AudioBuffer::from_channels(vec![], 1000).is_err());
    }

    #[test]
    fn test_secs_to_frames() {
        assert_eq!(secs_to_frames(2.0, 1000), 2000);
        assert_eq!(secs_to_frames(0.0015, 1000), 2);
        assert_eq!(secs_to_frames(-1.0, 1000), 0);
        assert_eq!(secs_to_frames(f64::NAN, 1000), 0);
    }

    // ------------------------------------------------------------------------
    // Timeline operation tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_tiled_uses_minimum_whole_copies() {
        let buffer = create_test_buffer(vec![vec![1.0, 2.0, 3.0, 4.0]]);
        let tiled = buffer.tiled(10);

        // ceil(10 / 4) = 3 copies
        assert_eq!(tiled.len(), 12);
        assert_eq!(&tiled.channel(0)[4..8], &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_tiled_exact_multiple() {
        let buffer = create_test_buffer(vec![vec![1.0, 2.0]]);
        assert_eq!(buffer.tiled(6).len(), 6);
    }

    #[test]
    fn test_tiled_long_enough_is_unchanged() {
        let buffer = create_test_buffer(vec![vec![0.5; 10]]);
        assert_eq!(buffer.tiled(4), buffer);
    }

    #[test]
    fn test_overlay_adds_at_offset() {
        let mut master = AudioBuffer::silent(6, ChannelLayout::Mono, 1000);
        let clip = AudioBuffer::from_channels(vec![vec![0.25, 0.5]], 1000).unwrap();

        let mixed = master.overlay_at(&clip, 2);
        assert_eq!(mixed, 2);
        assert_eq!(master.channel(0), &[0.0, 0.0, 0.25, 0.5, 0.0, 0.0]);

        master.overlay_at(&clip, 3);
        assert_eq!(master.channel(0), &[0.0, 0.0, 0.25, 0.75, 0.5, 0.0]);
    }

    #[test]
    fn test_overlay_truncates_at_end() {
        let mut master = AudioBuffer::silent(4, ChannelLayout::Stereo, 1000);
        let clip = AudioBuffer::from_channels(vec![vec![1.0; 5]], 1000).unwrap();

        assert_eq!(master.overlay_at(&clip, 2), 2);
        assert_eq!(master.channel(1), &[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(master.overlay_at(&clip, 4), 0);
    }

    #[test]
    fn test_overlay_does_not_saturate() {
        let mut master = AudioBuffer::silent(2, ChannelLayout::Mono, 1000);
        let clip = AudioBuffer::from_channels(vec![vec![0.8, 0.8]], 1000).unwrap();
        master.overlay_at(&clip, 0);
        master.overlay_at(&clip, 0);
        assert!((master.channel(0)[0] - 1.6).abs() < 1e-6);

        master.clamp();
        assert_eq!(master.channel(0), &[1.0, 1.0]);
    }

    #[test]
    fn test_to_layout() {
        let mono = AudioBuffer::from_channels(vec![vec![0.5, -0.5]], 1000).unwrap();
        let stereo = mono.to_layout(ChannelLayout::Stereo);
        assert_eq!(stereo.channels(), 2);
        assert_eq!(stereo.channel(1), &[0.5, -0.5]);

        let folded = AudioBuffer::from_channels(vec![vec![1.0, 0.0], vec![0.0, 1.0]], 1000)
            .unwrap()
            .to_layout(ChannelLayout::Mono);
        assert_eq!(folded.channel(0), &[0.5, 0.5]);

        let surround = AudioBuffer::from_channels(vec![vec![1.0]; 4], 1000)
            .unwrap()
            .to_layout(ChannelLayout::Stereo);
        assert_eq!(surround.channels(), 2);
        assert_eq!(surround.channel(0), &[1.0]);
    }

    #[test]
    fn test_buffer_apply_gain() {
        let mut buffer = create_test_buffer(vec![vec![0.5; 100]]);
        buffer.apply_gain(-6.0206);
        assert!((buffer.channel(0)[0] - 0.25).abs() < 0.01);
    }
}
