//! Error types for templates.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while loading or rendering templates.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Raised at load time, before any render is attempted.
    #[error("Syntax error in template {template} at line {line}: {message}")]
    Syntax {
        template: String,
        line: usize,
        message: String,
    },

    #[error("Undefined variable '{name}' in template {template} at line {line}")]
    UndefinedVariable {
        template: String,
        line: usize,
        name: String,
    },

    #[error("Rendering failed in template {template} at line {line}: {message}")]
    Render {
        template: String,
        line: usize,
        message: String,
    },

    #[error("Invalid template context: {0}")]
    Context(String),

    #[error("Failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TemplateError {
    pub(crate) fn syntax(template: &str, line: usize, message: impl Into<String>) -> Self {
        TemplateError::Syntax {
            template: template.to_string(),
            line,
            message: message.into(),
        }
    }

    /// Whether the error was raised while parsing rather than rendering.
    pub fn is_syntax(&self) -> bool {
        matches!(self, TemplateError::Syntax { .. })
    }
}
