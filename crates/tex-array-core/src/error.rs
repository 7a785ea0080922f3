use std::path::PathBuf;

use thiserror::Error;

use crate::validate::{ValidationIssue, ValidationReport};

#[derive(Debug, Error)]
pub enum TexArrayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid parameters: {0}")]
    Validation(#[from] ValidationIssue),
    #[error("Pack requested before validation succeeded ({0})")]
    IncompletePack(ValidationReport),
    #[error("Cannot resample layer {layer}: {reason}")]
    Resample { layer: usize, reason: String },
    #[error("Cannot persist asset to {}: {reason}", path.display())]
    Persist { path: PathBuf, reason: String },
    #[error("Encoding error: {0}")]
    Encode(String),
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TexArrayError {
    pub(crate) fn persist(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Persist {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TexArrayError>;
