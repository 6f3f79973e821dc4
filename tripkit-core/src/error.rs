//! Error types for tripkit-core
//!
//! Absence of data (no cache record, no documented interaction, zero
//! duration) is never an error. These types cover the conditions a caller
//! may want to log or surface as a banner; every one of them is recoverable.

use thiserror::Error;

/// Malformed duration text.
///
/// [`crate::duration::parse`] degrades these to the zero sentinel; only
/// [`crate::duration::try_parse`] hands them to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Expected a number, found something else
    #[error("invalid number {token:?} in duration {text:?}")]
    InvalidNumber { text: String, token: String },

    /// More than one range separator
    #[error("malformed duration {text:?}: expected at most one '-'")]
    Malformed { text: String },
}

/// Cache storage failure. Callers fall back to in-memory or bundled data.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing database could not be opened, read, or written
    #[error("cache storage unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),

    /// IO error while preparing the storage location
    #[error("cache storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload could not be serialized for storage
    #[error("failed to serialize {dataset} payload: {source}")]
    Serialization {
        dataset: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A stored record exists but no longer decodes
    #[error("corrupt {dataset} cache record: {message}")]
    Corrupt {
        dataset: &'static str,
        message: String,
    },
}

/// Remote refresh failure. The previously served snapshot stays valid.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Connection refused, DNS failure, TLS failure
    #[error("{dataset} fetch failed: {message}")]
    Network {
        dataset: &'static str,
        message: String,
    },

    /// The bounded fetch timeout elapsed
    #[error("{dataset} fetch timed out after {secs}s")]
    Timeout { dataset: &'static str, secs: u64 },

    /// Remote answered with a non-2xx status
    #[error("{dataset} fetch returned HTTP {status}: {body}")]
    Status {
        dataset: &'static str,
        status: u16,
        body: String,
    },

    /// Remote body did not match the expected document shape
    #[error("malformed {dataset} payload: {message}")]
    MalformedPayload {
        dataset: &'static str,
        message: String,
    },
}

impl SyncError {
    /// Whether retrying the same request might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Network { .. } | SyncError::Timeout { .. } => true,
            SyncError::Status { status, .. } => *status >= 500 || *status == 429,
            SyncError::MalformedPayload { .. } => false,
        }
    }
}

/// A dataset document that does not have the expected shape.
///
/// Raised while decoding remote, cached, or bundled documents; it becomes a
/// [`SyncError`] or a [`StoreError`] depending on where the document came from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{dataset} document: {message}")]
pub struct DocumentError {
    pub dataset: &'static str,
    pub message: String,
}

impl DocumentError {
    pub fn new(dataset: &'static str, message: impl Into<String>) -> Self {
        Self {
            dataset,
            message: message.into(),
        }
    }
}

impl From<DocumentError> for SyncError {
    fn from(e: DocumentError) -> Self {
        SyncError::MalformedPayload {
            dataset: e.dataset,
            message: e.message,
        }
    }
}

impl From<DocumentError> for StoreError {
    fn from(e: DocumentError) -> Self {
        StoreError::Corrupt {
            dataset: e.dataset,
            message: e.message,
        }
    }
}

/// Main error type for the tripkit-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Duration parse error
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Cache storage error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Remote sync error
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for tripkit-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SyncError::Timeout {
            dataset: "interactions",
            secs: 15
        }
        .is_transient());
        assert!(SyncError::Status {
            dataset: "substances",
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!SyncError::Status {
            dataset: "substances",
            status: 404,
            body: String::new()
        }
        .is_transient());
        assert!(!SyncError::MalformedPayload {
            dataset: "definitions",
            message: "expected array".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_document_error_conversions() {
        let doc = DocumentError::new("interactions", "expected object");
        let sync: SyncError = doc.clone().into();
        assert!(matches!(sync, SyncError::MalformedPayload { dataset: "interactions", .. }));
        let store: StoreError = doc.into();
        assert_eq!(
            store.to_string(),
            "corrupt interactions cache record: expected object"
        );
    }

    #[test]
    fn test_error_display_is_transparent() {
        let err: Error = SyncError::Timeout {
            dataset: "interactions",
            secs: 3,
        }
        .into();
        assert_eq!(err.to_string(), "interactions fetch timed out after 3s");
    }
}
