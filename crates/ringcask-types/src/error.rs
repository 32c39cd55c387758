//! Shared error taxonomy for the storage backend and recovery engine.

use std::io;

/// Error kinds shared by `ringcask-store` and `ringcask-recovery`.
///
/// Mirrors the source contract's error kinds one-to-one: backend handlers
/// translate these to a negative wire status code; the recovery coordinator
/// logs `Transient` and continues, but aborts on `Fatal`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Key missing from the `Index` (READ/DEL path).
    #[error("key not found: {0}")]
    NotFound(String),

    /// Bounds violation, malformed `IoAttr`, unknown command.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// OS-level read/write failure. `offset` is the offending file offset,
    /// when known.
    #[error("io error at offset {offset:?}: {message}")]
    IoError {
        message: String,
        offset: Option<u64>,
        #[source]
        source: Option<io::Error>,
    },

    /// Allocation failure during history assembly.
    #[error("out of memory")]
    OutOfMemory,

    /// Command not implemented (currently DEL's on-disk tombstoning, LIST).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// RPC timeout or unreachable remote node (recovery only); the work
    /// unit is marked `FAILED` but the run continues.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Tmp-dir unwritable, lock contention, unparseable CLI: abort before
    /// any state mutation.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl StoreError {
    pub fn io(message: impl Into<String>, offset: Option<u64>) -> Self {
        Self::IoError {
            message: message.into(),
            offset,
            source: None,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidArgument(what.into())
    }
}

impl From<io::Error> for StoreError {
    fn from(source: io::Error) -> Self {
        Self::IoError {
            message: source.to_string(),
            offset: None,
            source: Some(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
