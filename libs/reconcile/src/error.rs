//! Error types for release reconciliation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while reconciling a release or uploading its assets.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// The requested resource does not exist on the remote platform.
    ///
    /// Fetching a release by tag returns this when no release exists yet;
    /// the reconciler treats it as the signal to create one.
    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    /// The remote platform rejected a write because the resource already exists.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Any other failure reported by the remote platform or its transport.
    #[error("remote error (status {status}): {message}")]
    Remote { status: u16, message: String },

    /// Uploading a release asset failed.
    #[error("failed to upload release asset {name}: {reason}")]
    AssetUpload { name: String, reason: String },

    /// The create-conflict retry budget was exhausted.
    #[error("too many retries after {attempts} attempts")]
    TooManyRetries { attempts: u32 },

    /// A local file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReleaseError {
    /// Create a not-found error for a resource description.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a remote error from a status code and message.
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Returns true if this error means the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this error is a create conflict that may be retried.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// HTTP status associated with the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Remote { status, .. } if *status != 0 => Some(*status),
            _ => None,
        }
    }
}

/// Result type for release operations.
pub type Result<T, E = ReleaseError> = std::result::Result<T, E>;
