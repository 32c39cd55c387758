//! Shared identifier, wire-record, and error types for the ringcask blob
//! store and recovery engine.

pub mod control;
pub mod error;
pub mod history;
pub mod id;
pub mod io_attr;
pub mod key;

pub use control::{DiskControl, RamControl, DISK_CONTROL_LEN};
pub use error::StoreError;
pub use history::{HistoryEntry, HISTORY_ENTRY_LEN};
pub use id::{Identifier, ID_LEN};
pub use io_attr::{IoAttr, IoAttrFlags, IO_ATTR_LEN};
pub use key::{BlobKind, CompositeKey};
