//! Error types for the scene viewer

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;

/// Errors surfaced while setting up or running the viewer
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse shader {path}: {message}")]
    ShaderParse { path: String, message: String },

    #[error("Shader validation failed: {message}")]
    ShaderValidation { message: String },

    #[error("Unknown uniform: {0}")]
    UnknownUniform(String),

    #[error("Uniform {name} expects {expected}, got {found}")]
    UniformTypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Failed to load model {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    #[error("Failed to load image {path}: {message}")]
    ImageLoad { path: PathBuf, message: String },

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Event loop error: {0}")]
    EventLoop(String),
}

pub type ViewerResult<T> = Result<T, ViewerError>;

impl ViewerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_item() {
        let err = ViewerError::UniformTypeMismatch {
            name: "Roughness".into(),
            expected: "float",
            found: "vec3",
        };
        assert_eq!(err.to_string(), "Uniform Roughness expects float, got vec3");

        let err = ViewerError::InvalidState {
            operation: "render",
            state: "uninitialized",
        };
        assert_eq!(err.to_string(), "Cannot render while uninitialized");
    }

    #[test]
    fn backend_errors_convert() {
        let err: ViewerError = BackendError::SurfaceLost.into();
        assert!(matches!(err, ViewerError::Backend(BackendError::SurfaceLost)));
    }
}
