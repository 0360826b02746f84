//! LLM-driven composition authoring
//!
//! A scene description goes to a [`ComposerModel`] together with a prompt
//! built from the catalog. The reply passes through two fallible stages
//! before anything can be rendered:
//!
//! 1. text -> YAML document ([`extract_yaml_block`], then parsing)
//! 2. document -> validated [`Composition`], with generated-track defaults
//!    and every source checked against the catalog
//!
//! Failures in either stage keep the raw reply for diagnosis.

mod deepseek;
mod extract;
mod model;
mod prompt;

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

pub use deepseek::DeepSeekComposer;
pub use extract::extract_yaml_block;
pub use model::{ComposerModel, MockComposer};
pub use prompt::{system_prompt, user_prompt};

use crate::catalog::Catalog;
use crate::composition::{validate, Composition, CompositionStore, RawComposition, TrackDefaults};
use crate::error::{Result, WhitenoiseError};

/// A composition produced from a scene description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedComposition {
    /// `ai_<8 hex>`
    pub id: String,
    pub composition: Composition,
    /// Document text as the model wrote it
    pub yaml: String,
}

impl GeneratedComposition {
    /// Store the composition under its id
    pub fn save(&self, store: &CompositionStore) -> Result<PathBuf> {
        store.save(&self.id, &self.composition)
    }
}

/// Fresh id for a generated composition
pub fn generated_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("ai_{}", &hex[..8])
}

/// Turn a raw model reply into a validated composition
pub fn parse_response(response: &str, catalog: &Catalog) -> Result<(Composition, String)> {
    let Some(yaml) = extract_yaml_block(response) else {
        return Err(WhitenoiseError::NoDocumentInResponse {
            raw_response: response.to_string(),
        });
    };

    let rejected = |e: WhitenoiseError| WhitenoiseError::GenerationRejected {
        raw_response: response.to_string(),
        source: Box::new(e),
    };

    let raw = RawComposition::from_yaml_str(&yaml).map_err(rejected)?;
    let composition = validate(&raw, &TrackDefaults::generated(), Some(catalog)).map_err(rejected)?;

    Ok((composition, yaml))
}

/// Ask `model` for a composition matching `scene`
///
/// # Errors
/// * `ApiKeyMissing`, `LlmRequestFailed`, `LlmTimeout` - the request failed
/// * `NoDocumentInResponse` - the reply contained no YAML document
/// * `GenerationRejected` - the document did not parse or validate
pub fn generate_composition(
    model: &dyn ComposerModel,
    catalog: &Catalog,
    scene: &str,
) -> Result<GeneratedComposition> {
    let system = system_prompt(catalog);
    let user = user_prompt(scene);

    info!(model = model.name(), scene, "Requesting composition");
    let response = model.complete(&system, &user)?;

    let (composition, yaml) = parse_response(&response, catalog).map_err(|e| {
        warn!(error = %e, "Model reply rejected");
        e
    })?;

    let id = generated_id();
    info!(
        id = %id,
        name = %composition.name,
        tracks = composition.tracks.len(),
        "Composition generated"
    );

    Ok(GeneratedComposition {
        id,
        composition,
        yaml,
    })
}
