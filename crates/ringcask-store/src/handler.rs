//! `CommandHandler`: dispatches WRITE/READ/DEL/STAT from a wire
//! `(cmd, io_attr, payload)` tuple.
//!
//! Grounded on `kimberlite-storage::Storage`'s read/append control flow and
//! `kimberlite-storage::codec::Codec` for the trait-boundary shape used
//! here for `MetaProcessor` — the source's untyped `process_meta` hook
//! becomes a concrete trait object rather than a raw function pointer.

use std::time::{SystemTime, UNIX_EPOCH};

use ringcask_types::{
    BlobKind, CompositeKey, DiskControl, HistoryEntry, IoAttr, StoreError,
};

use crate::index::Index;
use crate::log::AppendLog;

/// The four commands the backend dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Write,
    Read,
    Del,
    Stat,
}

/// Result of a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Write,
    Read(Vec<u8>),
    Del,
    Stat(String),
}

/// Combines a prior history blob with a new write into the payload for the
/// replacement history record. Step 4 of the write-history chain-replace
/// algorithm (§4.3).
pub trait MetaProcessor: Send + Sync {
    fn process(&self, old_blob: &[u8], new_payload: &[u8]) -> Vec<u8>;
}

/// Default processor: appends the new payload to the prior blob, growing
/// the history chain in place rather than discarding it.
pub struct ConcatMetaProcessor;

impl MetaProcessor for ConcatMetaProcessor {
    fn process(&self, old_blob: &[u8], new_payload: &[u8]) -> Vec<u8> {
        let mut combined = Vec::with_capacity(old_blob.len() + new_payload.len());
        combined.extend_from_slice(old_blob);
        combined.extend_from_slice(new_payload);
        combined
    }
}

/// Delegate for the STAT command. The source spec says this has "no
/// behavior of interest in the core" — it exists purely as a seam for a
/// backend-provided stat function.
pub trait StatProvider: Send + Sync {
    fn stat(&self) -> String;
}

pub struct CommandHandler<'a> {
    log: &'a AppendLog,
    index: &'a Index,
    meta_processor: Box<dyn MetaProcessor>,
    stat_provider: Box<dyn StatProvider>,
}

impl<'a> CommandHandler<'a> {
    pub fn new(
        log: &'a AppendLog,
        index: &'a Index,
        meta_processor: Box<dyn MetaProcessor>,
        stat_provider: Box<dyn StatProvider>,
    ) -> Self {
        Self {
            log,
            index,
            meta_processor,
            stat_provider,
        }
    }

    pub fn dispatch(
        &self,
        cmd: Command,
        io: IoAttr,
        payload: &[u8],
    ) -> Result<Response, StoreError> {
        match cmd {
            Command::Write => self.handle_write(io, payload),
            Command::Read => self.handle_read(io),
            Command::Del => self.handle_del(io),
            Command::Stat => Ok(Response::Stat(self.stat_provider.stat())),
        }
    }

    fn handle_write(&self, io: IoAttr, payload: &[u8]) -> Result<Response, StoreError> {
        if io.flags.is_history() {
            self.write_history(io, payload)?;
        } else {
            self.write_data(io, payload)?;
            if !io.flags.no_history_update() {
                self.append_history_entry(io, payload.len() as u64)?;
            }
        }
        Ok(Response::Write)
    }

    /// Data writes are always appends: `io.offset` is recorded in the
    /// history entry but never affects placement.
    fn write_data(&self, io: IoAttr, payload: &[u8]) -> Result<(), StoreError> {
        let ctl = DiskControl::new(io.id, payload.len() as u64);
        let (offset, on_disk_size) = self.log.append(BlobKind::Data, &ctl, payload)?;
        self.index.insert_or_replace(
            CompositeKey::data(io.id),
            ringcask_types::RamControl::new(offset, on_disk_size),
        );
        Ok(())
    }

    fn append_history_entry(&self, io: IoAttr, size: u64) -> Result<(), StoreError> {
        let entry = HistoryEntry {
            id: io.id,
            offset: io.offset,
            size,
            timestamp: now_unix(),
            flags: io.flags.0,
        };
        let bytes = entry.to_bytes();
        let ctl = DiskControl::new(io.id, bytes.len() as u64);
        let (offset, on_disk_size) = self.log.append(BlobKind::History, &ctl, &bytes)?;
        self.index.insert_or_replace(
            CompositeKey::history(io.id),
            ringcask_types::RamControl::new(offset, on_disk_size),
        );
        Ok(())
    }

    /// The six-step chain-replace algorithm for updating an existing
    /// history chain (§4.3).
    fn write_history(&self, io: IoAttr, new_payload: &[u8]) -> Result<(), StoreError> {
        let key = CompositeKey::history(io.id);
        let header_len = ringcask_types::control::DISK_CONTROL_LEN as u64;

        let combined = match self.index.lookup(key) {
            Some(prior) => {
                // 1. Read the prior history blob at its indexed offset.
                let mut old_blob = Vec::new();
                self.log.read_at(
                    BlobKind::History,
                    prior.offset + header_len,
                    prior.total_on_disk_size - header_len,
                    &mut old_blob,
                )?;

                // 2. Mark the prior on-disk header REMOVED in place.
                let mut removed_ctl = DiskControl::new(io.id, old_blob.len() as u64);
                removed_ctl.set_removed(true);
                self.log
                    .overwrite_header(BlobKind::History, prior.offset, &removed_ctl)?;

                // 3 & 4. Strip header (already excluded above) and let the
                // external hook combine old + new.
                self.meta_processor.process(&old_blob, new_payload)
            }
            None => new_payload.to_vec(),
        };

        // 5. Append the new blob as a fresh record.
        let ctl = DiskControl::new(io.id, combined.len() as u64);
        let (offset, on_disk_size) = self.log.append(BlobKind::History, &ctl, &combined)?;

        // 6. Update the Index to the new offset.
        self.index.insert_or_replace(
            key,
            ringcask_types::RamControl::new(offset, on_disk_size),
        );
        Ok(())
    }

    fn handle_read(&self, io: IoAttr) -> Result<Response, StoreError> {
        let kind = if io.flags.is_history() {
            BlobKind::History
        } else {
            BlobKind::Data
        };
        let key = CompositeKey::new(io.id, kind);
        let entry = self
            .index
            .lookup(key)
            .ok_or_else(|| StoreError::not_found(io.id.to_string()))?;

        let header_len = ringcask_types::control::DISK_CONTROL_LEN as u64;
        let record_size = entry.total_on_disk_size - header_len;

        if io.offset > record_size || (io.size != 0 && io.offset + io.size > record_size) {
            return Err(StoreError::invalid(format!(
                "read range {}+{} exceeds record size {record_size}",
                io.offset, io.size
            )));
        }

        let read_len = if io.size == 0 {
            record_size - io.offset
        } else {
            io.size
        };

        let mut buf = Vec::new();
        self.log.read_at(
            kind,
            entry.offset + header_len + io.offset,
            read_len,
            &mut buf,
        )?;
        Ok(Response::Read(buf))
    }

    /// Erases the key from the `Index`. On-disk tombstoning is left to
    /// future compaction tooling (see the Open Question resolution in
    /// DESIGN.md); no on-disk record is touched here.
    fn handle_del(&self, io: IoAttr) -> Result<Response, StoreError> {
        let kind = if io.flags.is_history() {
            BlobKind::History
        } else {
            BlobKind::Data
        };
        self.index.erase(CompositeKey::new(io.id, kind));
        Ok(Response::Del)
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringcask_types::{Identifier, IoAttrFlags};
    use tempfile::tempdir;

    struct NullStat;
    impl StatProvider for NullStat {
        fn stat(&self) -> String {
            String::new()
        }
    }

    fn handler_fixture(dir: &tempfile::TempDir) -> (AppendLog, Index) {
        let mut index = Index::new();
        let log = AppendLog::open(
            &dir.path().join("data.log"),
            &dir.path().join("history.log"),
            0,
            0,
            &mut index,
        )
        .unwrap();
        (log, index)
    }

    fn io_attr(id: Identifier, offset: u64, size: u64, flags: u32) -> IoAttr {
        IoAttr {
            id,
            origin: Identifier::ZERO,
            offset,
            size,
            flags: IoAttrFlags::new(flags),
        }
    }

    #[test]
    fn scenario_4_write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let (log, index) = handler_fixture(&dir);
        let handler = CommandHandler::new(
            &log,
            &index,
            Box::new(ConcatMetaProcessor),
            Box::new(NullStat),
        );

        let id = Identifier::from_slice_lossy(b"k");
        handler
            .dispatch(Command::Write, io_attr(id, 0, 0, 0), b"v1")
            .unwrap();

        let resp = handler
            .dispatch(Command::Read, io_attr(id, 0, 0, 0), &[])
            .unwrap();
        assert_eq!(resp, Response::Read(b"v1".to_vec()));
    }

    #[test]
    fn scenario_5_overwrite_then_read_returns_latest() {
        let dir = tempdir().unwrap();
        let (log, index) = handler_fixture(&dir);
        let handler = CommandHandler::new(
            &log,
            &index,
            Box::new(ConcatMetaProcessor),
            Box::new(NullStat),
        );

        let id = Identifier::from_slice_lossy(b"k");
        handler
            .dispatch(Command::Write, io_attr(id, 0, 0, 0), b"v1")
            .unwrap();
        handler
            .dispatch(Command::Write, io_attr(id, 0, 0, 0), b"v2")
            .unwrap();

        let resp = handler
            .dispatch(Command::Read, io_attr(id, 0, 0, 0), &[])
            .unwrap();
        assert_eq!(resp, Response::Read(b"v2".to_vec()));
    }

    #[test]
    fn scenario_3_history_chain_marks_prior_removed() {
        let dir = tempdir().unwrap();
        let (log, index) = handler_fixture(&dir);
        let handler = CommandHandler::new(
            &log,
            &index,
            Box::new(ConcatMetaProcessor),
            Box::new(NullStat),
        );

        let id = Identifier::from_slice_lossy(b"k");
        handler
            .dispatch(
                Command::Write,
                io_attr(id, 0, 0, IoAttrFlags::IS_HISTORY),
                b"P1",
            )
            .unwrap();
        handler
            .dispatch(
                Command::Write,
                io_attr(id, 0, 0, IoAttrFlags::IS_HISTORY),
                b"P2",
            )
            .unwrap();

        let resp = handler
            .dispatch(
                Command::Read,
                io_attr(id, 0, 0, IoAttrFlags::IS_HISTORY),
                &[],
            )
            .unwrap();
        assert_eq!(resp, Response::Read(b"P1P2".to_vec()));
    }

    #[test]
    fn read_missing_key_is_not_found() {
        let dir = tempdir().unwrap();
        let (log, index) = handler_fixture(&dir);
        let handler = CommandHandler::new(
            &log,
            &index,
            Box::new(ConcatMetaProcessor),
            Box::new(NullStat),
        );

        let id = Identifier::from_slice_lossy(b"missing");
        let err = handler
            .dispatch(Command::Read, io_attr(id, 0, 0, 0), &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn read_out_of_bounds_is_invalid() {
        let dir = tempdir().unwrap();
        let (log, index) = handler_fixture(&dir);
        let handler = CommandHandler::new(
            &log,
            &index,
            Box::new(ConcatMetaProcessor),
            Box::new(NullStat),
        );

        let id = Identifier::from_slice_lossy(b"k");
        handler
            .dispatch(Command::Write, io_attr(id, 0, 0, 0), b"v1")
            .unwrap();

        let err = handler
            .dispatch(Command::Read, io_attr(id, 0, 100, 0), &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn del_erases_from_index_only() {
        let dir = tempdir().unwrap();
        let (log, index) = handler_fixture(&dir);
        let handler = CommandHandler::new(
            &log,
            &index,
            Box::new(ConcatMetaProcessor),
            Box::new(NullStat),
        );

        let id = Identifier::from_slice_lossy(b"k");
        handler
            .dispatch(Command::Write, io_attr(id, 0, 0, 0), b"v1")
            .unwrap();
        handler
            .dispatch(Command::Del, io_attr(id, 0, 0, 0), &[])
            .unwrap();

        let err = handler
            .dispatch(Command::Read, io_attr(id, 0, 0, 0), &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
