//! Error types for artifact generation.

use std::path::PathBuf;
use thiserror::Error;

use forge_presets::PresetError;
use forge_templates::TemplateError;

pub type ArtifactResult<T> = Result<T, ArtifactError>;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Unknown artifact kind: {0} (expected one of {1})")]
    UnknownKind(String, String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Preset(#[from] PresetError),

    #[error("Failed to write artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
