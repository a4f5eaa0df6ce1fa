use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating the product in a catalog image.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("model '{id}' not found (searched: {})", format_paths(.searched))]
    ModelNotFound { id: String, searched: Vec<PathBuf> },

    #[error("failed to load model {}: {reason}", .path.display())]
    ModelLoad { path: PathBuf, reason: String },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("unexpected model output shape {0:?}")]
    UnexpectedOutput(Vec<usize>),

    #[error("no product detected in the catalog")]
    NoProduct,

    #[error("failed to read image: {0}")]
    Image(#[from] image::ImageError),
}

/// The three failure kinds a composition can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Detection,
    MissingFile,
    Unexpected,
}

/// Errors raised while composing a post.
#[derive(Debug, Error)]
pub enum PostError {
    #[error("{}: {source}", .path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Detection(#[from] DetectError),

    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode output: {0}")]
    Encode(#[source] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("confidence must be between 0 and 1, got {0}")]
    InvalidConfidence(f32),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PostError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PostError::MissingFile { .. } => FailureKind::MissingFile,
            PostError::Detection(_) => FailureKind::Detection,
            _ => FailureKind::Unexpected,
        }
    }

    /// Lift a pipeline step error, keeping detector failures classified as such.
    pub(crate) fn from_step(err: anyhow::Error) -> Self {
        match err.downcast::<DetectError>() {
            Ok(detect) => PostError::Detection(detect),
            Err(other) => PostError::Other(other),
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
