//! Storage error type shared by every store.

use crate::context::Interrupted;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Scan interrupted: {0}")]
    Interrupted(#[from] Interrupted),

    #[error("Match handler failed: {0}")]
    Sink(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid image type: {0:?}")]
    InvalidImageType(String),

    #[error("Rating counter overflow for {0}")]
    Overflow(String),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}
