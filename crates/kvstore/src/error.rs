//! Outcome model shared by every storage operation
//!
//! Each operation returns a [`StorageResult`]. The detailed [`StorageError`]
//! keeps whatever diagnostic text the backend produced, while
//! [`ResultCode`] is the closed, coarse classification callers branch on.

use std::fmt::{self, Display};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Closed set of outcome codes shared by every engine operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// The operation completed
    Succeeded,
    /// The requested key does not exist
    KeyNotFound,
    /// Any other backend failure (I/O, corruption, resource exhaustion, ...)
    Unknown,
}

impl ResultCode {
    /// Classify the outcome of an operation
    pub fn of<T>(result: &StorageResult<T>) -> Self {
        match result {
            Ok(_) => Self::Succeeded,
            Err(e) => e.code(),
        }
    }

    /// Whether this code reports success
    pub fn is_ok(self) -> bool {
        self == Self::Succeeded
    }
}

impl Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::KeyNotFound => write!(f, "key not found"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl<T> From<&StorageResult<T>> for ResultCode {
    fn from(result: &StorageResult<T>) -> Self {
        Self::of(result)
    }
}

/// Errors that can occur in storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Storage backend error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Invalid argument supplied to the backend
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Key not found
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Operation not supported
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl StorageError {
    /// Build a `KeyNotFound` error, rendering the key for diagnostics
    pub fn key_not_found(key: &[u8]) -> Self {
        Self::KeyNotFound(display_key(key))
    }

    /// Collapse this error into its [`ResultCode`]
    ///
    /// Only a missing key keeps its own code; everything else is `Unknown`.
    pub fn code(&self) -> ResultCode {
        match self {
            Self::KeyNotFound(_) => ResultCode::KeyNotFound,
            Self::Backend(_)
            | Self::InvalidArgument(_)
            | Self::Io(_)
            | Self::NotSupported(_) => ResultCode::Unknown,
        }
    }

    /// Whether this error is the expected absence of a key
    pub fn is_not_found(&self) -> bool {
        self.code() == ResultCode::KeyNotFound
    }
}

/// Render a key for log and error messages: UTF-8 if possible, hex otherwise
pub fn display_key(key: &[u8]) -> String {
    match std::str::from_utf8(key) {
        Ok(s) => s.to_string(),
        Err(_) => format!("0x{}", hex::encode(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_total() {
        let cases = vec![
            (StorageError::key_not_found(b"k"), ResultCode::KeyNotFound),
            (StorageError::Backend("corruption".into()), ResultCode::Unknown),
            (StorageError::InvalidArgument("bad".into()), ResultCode::Unknown),
            (
                StorageError::Io(std::io::Error::other("disk gone")),
                ResultCode::Unknown,
            ),
            (StorageError::NotSupported("ingest".into()), ResultCode::Unknown),
        ];

        for (error, expected) in cases {
            assert_eq!(error.code(), expected, "{error}");
        }
    }

    #[test]
    fn test_result_code_of_result() {
        let ok: StorageResult<u8> = Ok(1);
        let missing: StorageResult<u8> = Err(StorageError::key_not_found(b"a"));
        let failed: StorageResult<u8> = Err(StorageError::Backend("boom".into()));

        assert_eq!(ResultCode::of(&ok), ResultCode::Succeeded);
        assert!(ResultCode::from(&ok).is_ok());
        assert_eq!(ResultCode::of(&missing), ResultCode::KeyNotFound);
        assert_eq!(ResultCode::of(&failed), ResultCode::Unknown);
        assert!(!ResultCode::of(&failed).is_ok());
    }

    #[test]
    fn test_display_key() {
        assert_eq!(display_key(b"vertex"), "vertex");
        assert_eq!(display_key(&[0xff, 0x00]), "0xff00");
        assert_eq!(
            StorageError::key_not_found(&[0xde, 0xad]).to_string(),
            "Key not found: 0xdead"
        );
    }
}
