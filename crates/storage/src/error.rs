//! Container error types

use datachest_core::DType;
use thiserror::Error;

/// Errors raised by the container layer
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with the container magic
    #[error("{path} is not a DataChest container")]
    BadMagic {
        /// File that failed the check
        path: String,
    },

    /// Format version newer than this build understands
    #[error("unsupported container format version {version}")]
    UnsupportedVersion {
        /// Version found in the header
        version: u16,
    },

    /// Record payload could not be encoded or decoded
    #[error("record codec error: {0}")]
    Codec(String),

    /// A complete record is inconsistent with the replayed tree
    #[error("corrupt container: {0}")]
    Corrupt(String),

    /// Path does not name a node of the expected kind
    #[error("no such node: {0}")]
    NoSuchNode(String),

    /// Node or file already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Extension data does not match the array's dtype
    #[error("dtype mismatch on {path}: array holds {expected}, got {actual}")]
    DTypeMismatch {
        /// Array path
        path: String,
        /// Dtype the array was created with
        expected: DType,
        /// Dtype of the rejected data
        actual: String,
    },

    /// Encoded record exceeds the largest frame payload
    #[error("record for {path} encodes to {len} bytes, limit is {max}")]
    RecordTooLarge {
        /// Node the record applies to
        path: String,
        /// Encoded payload size
        len: usize,
        /// Largest payload a frame may carry
        max: u32,
    },

    /// Mutation attempted through a read-only container
    #[error("container {0} is open read-only")]
    ReadOnly(String),
}

/// Result type for container operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl From<bincode::Error> for StorageError {
    fn from(e: bincode::Error) -> Self {
        StorageError::Codec(e.to_string())
    }
}

impl From<StorageError> for datachest_core::Error {
    fn from(e: StorageError) -> Self {
        use datachest_core::Error as CoreError;
        match e {
            StorageError::Io(io_err) => CoreError::Io(io_err),
            StorageError::NoSuchNode(path) => CoreError::NotFound(path),
            StorageError::AlreadyExists(what) => CoreError::AlreadyExists(what),
            StorageError::ReadOnly(path) => CoreError::read_only(&path),
            StorageError::DTypeMismatch {
                path,
                expected,
                actual,
            } => CoreError::TypeMismatch {
                column: path,
                expected: expected.to_string(),
                received: actual,
            },
            StorageError::Codec(msg) => CoreError::Serialization(msg),
            other => CoreError::Storage(other.to_string()),
        }
    }
}
