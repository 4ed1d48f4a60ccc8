//! Error types for DataChest
//!
//! One canonical error enum covers every failure a caller of the dataset
//! engine can observe. Polling loops are expected to inspect the class of an
//! error (see [`Error::is_state_error`] and friends) and decide whether to log
//! and keep polling or to stop.

use std::fmt;
use thiserror::Error;

/// What kind of name failed the charset check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// Dataset base name
    Dataset,
    /// Independent or dependent variable name
    Variable,
    /// Parameter name
    Parameter,
    /// Directory name
    Directory,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NameKind::Dataset => "dataset",
            NameKind::Variable => "variable",
            NameKind::Parameter => "parameter",
            NameKind::Directory => "directory",
        };
        f.write_str(s)
    }
}

/// All DataChest errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing storage root
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Name contains characters outside its allow-list
    #[error("invalid {kind} name {name:?} (suggested: {suggestion:?})")]
    InvalidName {
        /// Which namespace the name belongs to
        kind: NameKind,
        /// The rejected name
        name: String,
        /// The name with every disallowed character removed
        suggestion: String,
    },

    /// Empty or invalid variable declarations, bad shape, unsupported dtype
    #[error("schema error: {0}")]
    Schema(String),

    /// Malformed or out-of-range date stamp token or timestamp
    #[error("invalid date stamp: {0}")]
    InvalidDateStamp(String),

    /// No collision-free filename could be found
    #[error("could not find a unique filename for {base:?} after {attempts} attempts")]
    UniquenessExhausted {
        /// Sanitized base name
        base: String,
        /// Number of candidates tried
        attempts: usize,
    },

    /// Dataset, parameter, directory or node not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Refused to overwrite an existing entry
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Operation not allowed in the current handle state
    #[error("invalid state: {0}")]
    State(String),

    /// Navigation would leave the configured root
    #[error("path {attempted:?} escapes the storage root; reset to root")]
    Confinement {
        /// The requested path
        attempted: String,
    },

    /// A cell's dtype does not match its column
    #[error("type mismatch in column {column:?}: expected {expected}, received {received}")]
    TypeMismatch {
        /// Variable name
        column: String,
        /// Declared dtype
        expected: String,
        /// Dtype of the offending value
        received: String,
    },

    /// A cell's shape does not match its column
    #[error("shape mismatch in column {column:?}: expected {expected:?}, received {received:?}")]
    ShapeMismatch {
        /// Variable name
        column: String,
        /// Declared shape
        expected: Vec<usize>,
        /// Shape of the offending value
        received: Vec<usize>,
    },

    /// Row violates the active category's contract
    #[error("row format error: {0}")]
    RowFormat(String),

    /// Slice bounds could not be resolved against the row count
    #[error("index range error: start={start:?} stop={stop:?} rows={rows}")]
    IndexRange {
        /// Requested start
        start: Option<i64>,
        /// Requested stop
        stop: Option<i64>,
        /// Rows stored in the dataset
        rows: u64,
    },

    /// Container-level failure (corruption, format, unexpected layout)
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for DataChest operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this error belongs to the state class.
    ///
    /// Covers "no dataset open", writes on read-only handles and attempts to
    /// navigate out of the storage root.
    pub fn is_state_error(&self) -> bool {
        matches!(self, Error::State(_) | Error::Confinement { .. })
    }

    /// Check if a batch of rows was rejected.
    pub fn is_row_format_error(&self) -> bool {
        matches!(
            self,
            Error::RowFormat(_) | Error::TypeMismatch { .. } | Error::ShapeMismatch { .. }
        )
    }

    /// Check if a declaration or name was rejected.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Error::Schema(_) | Error::InvalidName { .. } | Error::InvalidDateStamp(_)
        )
    }

    /// Helper for the common "nothing is open" state error
    pub fn no_dataset_open() -> Self {
        Error::State("no dataset open".to_string())
    }

    /// Helper for writes attempted through a read-only handle
    pub fn read_only(what: &str) -> Self {
        Error::State(format!(
            "{} is open read-only; reopen it with modify=true to write",
            what
        ))
    }
}
