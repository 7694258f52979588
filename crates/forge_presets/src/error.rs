//! Error types for presets.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for preset operations.
pub type PresetResult<T> = Result<T, PresetError>;

/// Errors that can occur while loading or resolving presets.
#[derive(Error, Debug)]
pub enum PresetError {
    #[error("Preset not found: {0}")]
    NotFound(String),

    #[error("Malformed preset {preset}: {message}")]
    MalformedPreset { preset: String, message: String },

    #[error("Invalid flag override '{0}', expected KEY=VALUE")]
    InvalidOverride(String),

    #[error("Unknown cloud provider: {0}")]
    UnknownProvider(String),

    #[error("Failed to read presets from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid preset YAML in {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid preset file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl PresetError {
    pub(crate) fn malformed(preset: &str, message: impl Into<String>) -> Self {
        PresetError::MalformedPreset {
            preset: preset.to_string(),
            message: message.into(),
        }
    }
}
