use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("training failed: {0}")]
    Training(String),

    #[error("model artifact component missing: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("model artifact component {} is corrupt: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("prediction failed: {0}")]
    Prediction(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown club: {0}")]
    UnknownClub(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TransferError::ArtifactCorrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
