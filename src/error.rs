//! Error handling for WhiteNoise
//!
//! Errors fall into the categories the renderer cares about: document
//! errors stop a render before it starts, track errors are absorbed into
//! warnings, export errors fail a render after mixing succeeded.

use std::path::PathBuf;

use thiserror::Error;

use crate::composition::ValidationIssue;

/// Result type alias for WhiteNoise operations
pub type Result<T> = std::result::Result<T, WhitenoiseError>;

/// Coarse grouping of errors, used by callers to decide how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Fatal, raised before rendering starts
    Document,
    /// Per-track, absorbed into render warnings
    Track,
    /// Fatal, raised after mixing while encoding/publishing
    Export,
    /// Catalog loading or analysis
    Catalog,
    /// LLM-driven authoring
    Generation,
    /// Plain filesystem/serialization failures
    Io,
}

/// Main error type for WhiteNoise operations
#[derive(Error, Debug)]
pub enum WhitenoiseError {
    // Document Errors
    #[error("Invalid composition document: {}", format_issues(.issues))]
    InvalidDocument { issues: Vec<ValidationIssue> },

    #[error("Composition not found: {id}")]
    CompositionNotFound { id: String },

    #[error("Malformed document: {reason}")]
    MalformedDocument { reason: String },

    // Track Errors
    #[error("Audio source not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Export Errors
    #[error("Export failed: {reason}")]
    ExportFailed { reason: String },

    #[error("Encoder not available: {encoder}")]
    EncoderUnavailable { encoder: String },

    // Catalog Errors
    #[error("Catalog not found: {path}")]
    CatalogNotFound { path: PathBuf },

    // Generation Errors
    #[error("API key not configured: set {env_var}")]
    ApiKeyMissing { env_var: String },

    #[error("LLM request failed: {reason}")]
    LlmRequestFailed { reason: String },

    #[error("LLM request timed out after {timeout_secs}s")]
    LlmTimeout { timeout_secs: u64 },

    #[error("No composition found in response")]
    NoDocumentInResponse { raw_response: String },

    #[error("Generated composition rejected: {source}")]
    GenerationRejected {
        raw_response: String,
        #[source]
        source: Box<WhitenoiseError>,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl WhitenoiseError {
    /// Shorthand for a document error built from a single issue
    pub fn invalid(issue: ValidationIssue) -> Self {
        WhitenoiseError::InvalidDocument {
            issues: vec![issue],
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            WhitenoiseError::InvalidDocument { .. } => "INVALID_DOCUMENT",
            WhitenoiseError::CompositionNotFound { .. } => "COMPOSITION_NOT_FOUND",
            WhitenoiseError::MalformedDocument { .. } => "MALFORMED_DOCUMENT",
            WhitenoiseError::SourceNotFound { .. } => "SOURCE_NOT_FOUND",
            WhitenoiseError::InvalidAudio { .. } => "INVALID_AUDIO",
            WhitenoiseError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            WhitenoiseError::EmptyAudio => "EMPTY_AUDIO",
            WhitenoiseError::ExportFailed { .. } => "EXPORT_FAILED",
            WhitenoiseError::EncoderUnavailable { .. } => "ENCODER_UNAVAILABLE",
            WhitenoiseError::CatalogNotFound { .. } => "CATALOG_NOT_FOUND",
            WhitenoiseError::ApiKeyMissing { .. } => "API_KEY_MISSING",
            WhitenoiseError::LlmRequestFailed { .. } => "LLM_REQUEST_FAILED",
            WhitenoiseError::LlmTimeout { .. } => "LLM_TIMEOUT",
            WhitenoiseError::NoDocumentInResponse { .. } => "NO_DOCUMENT_IN_RESPONSE",
            WhitenoiseError::GenerationRejected { .. } => "GENERATION_REJECTED",
            WhitenoiseError::Io(_) => "IO_ERROR",
            WhitenoiseError::Yaml(_) => "YAML_ERROR",
            WhitenoiseError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Which part of the pipeline this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            WhitenoiseError::InvalidDocument { .. }
            | WhitenoiseError::CompositionNotFound { .. }
            | WhitenoiseError::MalformedDocument { .. } => ErrorCategory::Document,
            WhitenoiseError::SourceNotFound { .. }
            | WhitenoiseError::InvalidAudio { .. }
            | WhitenoiseError::UnsupportedFormat { .. }
            | WhitenoiseError::EmptyAudio => ErrorCategory::Track,
            WhitenoiseError::ExportFailed { .. } | WhitenoiseError::EncoderUnavailable { .. } => {
                ErrorCategory::Export
            }
            WhitenoiseError::CatalogNotFound { .. } => ErrorCategory::Catalog,
            WhitenoiseError::ApiKeyMissing { .. }
            | WhitenoiseError::LlmRequestFailed { .. }
            | WhitenoiseError::LlmTimeout { .. }
            | WhitenoiseError::NoDocumentInResponse { .. }
            | WhitenoiseError::GenerationRejected { .. } => ErrorCategory::Generation,
            WhitenoiseError::Io(_) | WhitenoiseError::Yaml(_) | WhitenoiseError::Serialization(_) => {
                ErrorCategory::Io
            }
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WhitenoiseError::SourceNotFound { .. }
                | WhitenoiseError::InvalidAudio { .. }
                | WhitenoiseError::UnsupportedFormat { .. }
                | WhitenoiseError::EmptyAudio
                | WhitenoiseError::LlmTimeout { .. }
                | WhitenoiseError::NoDocumentInResponse { .. }
                | WhitenoiseError::GenerationRejected { .. }
        )
    }

    /// The raw LLM response, when the error came out of generation
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            WhitenoiseError::NoDocumentInResponse { raw_response }
            | WhitenoiseError::GenerationRejected { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            WhitenoiseError::InvalidDocument { .. } => vec![
                "Check the composition has a name, a positive duration and at least one track",
                "Every track needs an audio file and end > start",
            ],
            WhitenoiseError::CompositionNotFound { .. } => vec![
                "Run 'whitenoise-cli list' to see available compositions",
                "Composition ids are file names without the .yaml suffix",
            ],
            WhitenoiseError::SourceNotFound { .. } => vec![
                "Check the audio directory setting",
                "Run 'whitenoise-cli rescan' to refresh the catalog",
            ],
            WhitenoiseError::UnsupportedFormat { .. } => vec![
                "Convert the clip to WAV, MP3, OGG or FLAC",
            ],
            WhitenoiseError::EncoderUnavailable { .. } => vec![
                "Install ffmpeg or point WHITENOISE_FFMPEG at the binary",
                "Export as wav, which needs no external encoder",
            ],
            WhitenoiseError::ApiKeyMissing { .. } => vec![
                "Export DEEPSEEK_API_KEY before running generate",
            ],
            WhitenoiseError::LlmTimeout { .. } => vec![
                "Try again later",
                "Raise DEEPSEEK_TIMEOUT_SECS",
            ],
            WhitenoiseError::NoDocumentInResponse { .. }
            | WhitenoiseError::GenerationRejected { .. } => vec![
                "Generation is not deterministic; retrying often succeeds",
                "Simplify the scene description",
            ],
            _ => vec![],
        }
    }
}
