//! Composition documents
//!
//! Parsing is a two-stage pipeline: untrusted text becomes a
//! [`RawComposition`], which [`validate`] turns into a [`Composition`] or a
//! list of [`ValidationIssue`]s.

mod model;
mod store;
mod validate;

pub use model::{Composition, RawComposition, RawTrack, Track};
pub use store::{AudioInfo, CompositionDetail, CompositionStore, CompositionSummary, TrackDetail};
pub use validate::{
    parse_composition, validate, TrackDefaults, ValidationIssue, MAX_DURATION_SECS,
};
