//! # Errors
//!
//! Every orchestrated operation returns `Result<_, OrchestratorError>`; a
//! failure can never be mistaken for an empty success. Each variant keeps the
//! store error that caused it as its `source`.
//!
//! Non-fatal conditions (a blob that could not be cleaned up after the
//! document change already committed) are reported as
//! [`OrphanedBlobWarning`] values next to the successful result.
//!
//! [`ErrorKind`] classifies errors with HTTP-style status codes so a transport
//! layer can map them without matching on every variant.

use snap_blob::{BlobError, BlobId};
use snap_docs::StoreError;
use thiserror::Error;

/// A convenience result type for orchestrated operations.
pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("blob upload failed: {source}")]
    BlobUpload {
        #[source]
        source: BlobError,
    },

    #[error("preview derivation failed for blob {blob_id}: {source}")]
    PreviewDerivation {
        blob_id: BlobId,
        #[source]
        source: BlobError,
    },

    #[error("document write to {collection} failed: {source}")]
    DocumentPersist {
        collection: String,
        #[source]
        source: StoreError,
    },

    #[error("document delete in {collection} failed: {source}")]
    DocumentDelete {
        collection: String,
        #[source]
        source: StoreError,
    },

    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("query on {collection} failed: {source}")]
    Query {
        collection: String,
        #[source]
        source: StoreError,
    },

    #[error("document {collection}/{id} is malformed: {message}")]
    Decode {
        collection: String,
        id: String,
        message: String,
    },
}

impl OrchestratorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn decode(
        collection: impl Into<String>,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Decode {
            collection: collection.into(),
            id: id.into(),
            message: message.into(),
        }
    }

    /// Map a read failure, keeping "not found" distinct from backend trouble
    pub(crate) fn from_read(collection: &str, source: StoreError) -> Self {
        match source {
            StoreError::NotFound { collection, id } => Self::NotFound { collection, id },
            other => Self::Query {
                collection: collection.to_string(),
                source: other,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::Validation { .. } => ErrorKind::BadRequest,
            OrchestratorError::NotFound { .. } => ErrorKind::NotFound,
            OrchestratorError::BlobUpload { source } => match source {
                BlobError::Invalid { .. } | BlobError::UploadRejected { .. } => {
                    ErrorKind::Unprocessable
                }
                _ => ErrorKind::BadGateway,
            },
            OrchestratorError::Query {
                source: StoreError::InvalidCursor { .. },
                ..
            } => ErrorKind::BadRequest,
            OrchestratorError::PreviewDerivation { .. }
            | OrchestratorError::DocumentPersist { .. }
            | OrchestratorError::DocumentDelete { .. }
            | OrchestratorError::Query { .. } => ErrorKind::BadGateway,
            OrchestratorError::Decode { .. } => ErrorKind::GeneralError,
        }
    }
}

/// Error classes with HTTP-style status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,    // 400
    NotFound,      // 404
    Unprocessable, // 422
    GeneralError,  // 500
    BadGateway,    // 502
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Unprocessable => 422,
            ErrorKind::GeneralError => 500,
            ErrorKind::BadGateway => 502,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Unprocessable => "Unprocessable",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::BadGateway => "BadGateway",
        }
    }
}

/// A blob that may be left in storage with nothing referencing it.
///
/// Advisory only: the operation that produced it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanedBlobWarning {
    pub blob_id: BlobId,
    pub reason: String,
}

impl std::fmt::Display for OrphanedBlobWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "blob {} may be orphaned: {}", self.blob_id, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(OrchestratorError::validation("x").kind().status_code(), 400);
        assert_eq!(OrchestratorError::not_found("posts", "p1").kind().status_code(), 404);

        let rejected = OrchestratorError::BlobUpload {
            source: BlobError::upload_rejected("too big"),
        };
        assert_eq!(rejected.kind(), ErrorKind::Unprocessable);

        let persist = OrchestratorError::DocumentPersist {
            collection: "posts".into(),
            source: StoreError::invalid("boom"),
        };
        assert_eq!(persist.kind(), ErrorKind::BadGateway);
        assert_eq!(persist.kind().name(), "BadGateway");
    }

    #[test]
    fn read_errors_keep_not_found_distinct() {
        let err = OrchestratorError::from_read("posts", StoreError::not_found("posts", "p9"));
        assert!(matches!(err, OrchestratorError::NotFound { ref id, .. } if id == "p9"));

        let err = OrchestratorError::from_read("posts", StoreError::invalid("bad"));
        assert!(matches!(err, OrchestratorError::Query { .. }));
    }

    #[test]
    fn source_chain_is_preserved() {
        use std::error::Error as _;
        let err = OrchestratorError::DocumentDelete {
            collection: "posts".into(),
            source: StoreError::invalid("locked"),
        };
        assert!(err.source().unwrap().to_string().contains("locked"));
    }
}
