//! Fade envelopes
//!
//! Linear amplitude ramps applied at the edges of a track segment. Fade-in
//! and fade-out are applied independently, so overlapping windows multiply
//! into a triangular shape instead of being shortened.

use crate::engine::buffer::AudioBuffer;

/// Gain of a fade-in at frame `i` of an `n`-frame window
///
/// 0 at the first frame, approaching 1 at the end of the window.
#[inline]
pub fn fade_in_gain(i: usize, n: usize) -> f32 {
    if n == 0 || i >= n {
        1.0
    } else {
        i as f32 / n as f32
    }
}

/// Gain of a fade-out at frame `j` of an `len`-frame segment with an `n`-frame window
///
/// 1 before the window, reaching 0 on the last frame.
#[inline]
pub fn fade_out_gain(j: usize, len: usize, n: usize) -> f32 {
    if n == 0 || j >= len || j + n < len {
        return 1.0;
    }
    (len - 1 - j) as f32 / n as f32
}

/// Ramp the first `frames` samples from silence to full amplitude
///
/// Windows longer than the buffer are clamped to its length.
pub fn apply_fade_in(buffer: &mut AudioBuffer, frames: usize) {
    let span = buffer.len();
    apply_fade_in_over(buffer, frames, span);
}

/// Ramp the last `frames` samples from full amplitude to silence
///
/// Windows longer than the buffer are clamped to its length.
pub fn apply_fade_out(buffer: &mut AudioBuffer, frames: usize) {
    let span = buffer.len();
    apply_fade_out_over(buffer, frames, span);
}

/// Fade-in for a segment of `span` frames of which `buffer` holds the head
///
/// The window is clamped to `span`, not to the buffer, so a cut-off
/// segment keeps the gains it would have had at full length.
pub fn apply_fade_in_over(buffer: &mut AudioBuffer, frames: usize, span: usize) {
    let n = frames.min(span);
    let visible = n.min(buffer.len());
    if visible == 0 {
        return;
    }
    for channel in &mut buffer.samples {
        for (i, sample) in channel[..visible].iter_mut().enumerate() {
            *sample *= fade_in_gain(i, n);
        }
    }
}

/// Fade-out for a segment of `span` frames of which `buffer` holds the head
///
/// Frames of the window past the end of the buffer are not touched.
pub fn apply_fade_out_over(buffer: &mut AudioBuffer, frames: usize, span: usize) {
    let n = frames.min(span);
    let visible = buffer.len().min(span);
    let start = span - n;
    if n == 0 || start >= visible {
        return;
    }
    for channel in &mut buffer.samples {
        for (k, sample) in channel[start..visible].iter_mut().enumerate() {
            *sample *= fade_out_gain(start + k, span, n);
        }
    }
}
