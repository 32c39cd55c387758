//! The blob storage backend: an append-only on-disk log with an in-memory
//! index, serving read/write/delete of opaque values keyed by a
//! fixed-width identifier, with a per-key history log of mutations.

pub mod handler;
pub mod index;
pub mod log;

pub use handler::{Command, CommandHandler, ConcatMetaProcessor, MetaProcessor, Response, StatProvider};
pub use index::Index;
pub use log::AppendLog;
pub use ringcask_types::StoreError;
