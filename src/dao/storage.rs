//! Backend-agnostic storage errors.

use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or failed mid-operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What the backend was doing when it failed.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A create hit an id that already exists.
    #[error("match `{id}` already exists")]
    AlreadyExists {
        /// The conflicting id.
        id: String,
    },
    /// A save targeted an id that no longer exists, typically because the
    /// match was deleted while a command was still in flight.
    #[error("match `{id}` no longer exists in storage")]
    NotFound {
        /// The missing id.
        id: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
