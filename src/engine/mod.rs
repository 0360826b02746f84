//! Audio Engine Module
//!
//! Core audio plumbing used by the renderer:
//! - Audio buffer management and level helpers
//! - Fade envelopes
//! - File decoding and WAV encoding

pub mod buffer;
pub mod envelope;
pub mod io;

pub use buffer::{
    calculate_peak, calculate_rms, db_to_linear, linear_to_db, secs_to_frames, volume_to_db,
    AudioBuffer, ChannelLayout, CANONICAL_SAMPLE_RATE, SILENT_GAIN_DB,
};
pub use envelope::{apply_fade_in, apply_fade_in_over, apply_fade_out, apply_fade_out_over};
pub use io::{conform, encode_wav_bytes, generate_test_tone, import_audio, write_wav};
