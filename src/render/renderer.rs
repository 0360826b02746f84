//! Composition renderer
//!
//! Mixes every track of a composition onto a silent master buffer:
//!
//! 1. load the clip and conform it to the render format
//! 2. loop-extend it if it is shorter than the track segment
//! 3. cut it to the segment length, or to the part that lands on the master
//! 4. apply fade-in / fade-out ramps
//! 5. apply the track volume as a dB gain
//! 6. sum it into the master at the track's start offset
//!
//! Tracks are summed without saturation in document order and the master is
//! clamped to [-1, 1] once after the last track. Per-track failures are
//! logged and returned as warnings; the track contributes silence.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::source::SourceLoader;
use crate::composition::{Composition, Track};
use crate::engine::{
    apply_fade_in_over, apply_fade_out_over, conform, secs_to_frames, volume_to_db, AudioBuffer,
    ChannelLayout, CANONICAL_SAMPLE_RATE,
};

/// Output format of the master buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub sample_rate: u32,
    pub layout: ChannelLayout,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sample_rate: CANONICAL_SAMPLE_RATE,
            layout: ChannelLayout::Stereo,
        }
    }
}

/// Why a track did not contribute as written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Clip missing or undecodable; the track was skipped
    SourceUnavailable,
    /// A fade window was longer than the segment and was shortened
    FadeClamped,
    /// The track starts at or after the end of the master
    OutOfRange,
}

/// Non-fatal problem with one track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackWarning {
    /// Position of the track in the document
    pub index: usize,
    pub audio: String,
    pub kind: WarningKind,
    pub message: String,
}

impl fmt::Display for TrackWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track {} ({}): {}", self.index, self.audio, self.message)
    }
}

/// Mixed master plus the warnings gathered while rendering it
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub buffer: AudioBuffer,
    pub warnings: Vec<TrackWarning>,
}

/// Turn a conformed clip into the segment that gets mixed for `track`
///
/// Only the first `visible` frames of the segment are built; the rest would
/// fall past the end of the master. Fades are computed against the full
/// segment length, so cutting the segment short does not change its gains.
///
/// Returns the segment and `(kind, message)` pairs for anything that had
/// to be adjusted.
pub fn prepare_segment(
    clip: AudioBuffer,
    track: &Track,
    sample_rate: u32,
    visible: usize,
) -> (AudioBuffer, Vec<(WarningKind, String)>) {
    let mut notes = Vec::new();
    let target = secs_to_frames(track.segment_secs(), sample_rate);

    // A non-looping clip that runs out ends the segment early
    let full_len = if clip.is_empty() {
        0
    } else if track.loop_ {
        target
    } else {
        clip.len().min(target)
    };
    let keep = full_len.min(visible);

    let mut segment = if track.loop_ && clip.len() < keep {
        clip.tiled(keep)
    } else {
        clip
    };
    segment.truncate(keep);

    let full_secs = full_len as f64 / sample_rate as f64;

    if track.fade_in > 0.0 {
        let frames = secs_to_frames(track.fade_in, sample_rate);
        if frames > full_len {
            notes.push((
                WarningKind::FadeClamped,
                format!("fade_in {}s exceeds segment of {:.3}s", track.fade_in, full_secs),
            ));
        }
        apply_fade_in_over(&mut segment, frames, full_len);
    }

    if track.fade_out > 0.0 {
        let frames = secs_to_frames(track.fade_out, sample_rate);
        if frames > full_len {
            notes.push((
                WarningKind::FadeClamped,
                format!("fade_out {}s exceeds segment of {:.3}s", track.fade_out, full_secs),
            ));
        }
        apply_fade_out_over(&mut segment, frames, full_len);
    }

    if track.volume != 1.0 {
        segment.apply_gain(volume_to_db(track.volume as f32));
    }

    (segment, notes)
}

/// Renders compositions against a clip source
#[derive(Clone)]
pub struct Renderer {
    source: Arc<dyn SourceLoader>,
    settings: RenderSettings,
}

impl Renderer {
    pub fn new(source: Arc<dyn SourceLoader>, settings: RenderSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> RenderSettings {
        self.settings
    }

    /// Mix a validated composition into a master buffer
    ///
    /// Never fails: tracks that cannot be loaded are skipped and reported
    /// in [`RenderOutput::warnings`]. The result always spans exactly the
    /// composition's duration.
    #[instrument(skip(self, composition), fields(composition = %composition.name))]
    pub fn render(&self, composition: &Composition) -> RenderOutput {
        let RenderSettings {
            sample_rate,
            layout,
        } = self.settings;

        let frames = secs_to_frames(composition.duration, sample_rate);
        let mut master = AudioBuffer::silent(frames, layout, sample_rate);
        let mut warnings = Vec::new();

        for (index, track) in composition.tracks.iter().enumerate() {
            let mut warn_track = |kind: WarningKind, message: String| {
                warn!(track = index, audio = %track.audio, ?kind, "{}", message);
                warnings.push(TrackWarning {
                    index,
                    audio: track.audio.clone(),
                    kind,
                    message,
                });
            };

            let offset = secs_to_frames(track.start, sample_rate);
            if offset >= master.len() {
                warn_track(
                    WarningKind::OutOfRange,
                    format!(
                        "starts at {}s, after the end of a {}s composition",
                        track.start, composition.duration
                    ),
                );
                continue;
            }

            let clip = match self.source.load(&track.audio) {
                Ok(clip) => conform(clip, sample_rate, layout),
                Err(e) => {
                    warn_track(WarningKind::SourceUnavailable, e.to_string());
                    continue;
                }
            };

            let (segment, notes) =
                prepare_segment(clip, track, sample_rate, master.len() - offset);
            for (kind, message) in notes {
                warn_track(kind, message);
            }

            let mixed = master.overlay_at(&segment, offset);
            debug!(
                track = index,
                audio = %track.audio,
                offset,
                frames = mixed,
                "Mixed track"
            );
        }

        master.clamp();

        info!(
            tracks = composition.tracks.len(),
            warnings = warnings.len(),
            frames = master.len(),
            "Render complete"
        );

        RenderOutput {
            buffer: master,
            warnings,
        }
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
