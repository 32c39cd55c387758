//! Recovery-engine error type.
//!
//! Grounded on `kimberlite-cluster::Error`: a `thiserror` enum with
//! `#[from]` conversions for the ambient I/O and TOML failure modes, plus
//! variants naming the recovery-specific error kinds from the source spec's
//! §7 (`Transient`, `Fatal`).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("lockfile already held: {0}")]
    LockContention(PathBuf),

    #[error("failed to parse toml config: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("failed to serialize toml config: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("worker {id} exited with status {code:?}")]
    WorkerFailed { id: usize, code: Option<i32> },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, RecoveryError>;
