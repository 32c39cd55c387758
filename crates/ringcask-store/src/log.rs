//! `AppendLog`: two append-only files (data + history), each with an
//! independent tail offset and optional block alignment.
//!
//! Grounded on `kimberlite-storage::Storage`'s segment-file append loop,
//! simplified to a single fixed file per log kind (no segment rotation —
//! out of scope here) and no hash-chain linking between records.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use ringcask_types::{BlobKind, CompositeKey, DiskControl, RamControl, StoreError};

use crate::index::Index;

/// A single append-only file plus its tail offset, protected by its own
/// mutex. All appends and tail advances happen while holding that mutex —
/// the source spec calls this "a single mutex covering both tail
/// advancement and writes."
struct LogFile {
    file: File,
    tail: u64,
    block_size: u64,
}

impl LogFile {
    fn open(path: &Path, block_size: u64) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self {
            file,
            tail: 0,
            block_size,
        })
    }

    fn padding_for(&self, record_len: u64) -> u64 {
        if self.block_size == 0 {
            return 0;
        }
        let rem = record_len % self.block_size;
        if rem == 0 {
            0
        } else {
            self.block_size - rem
        }
    }
}

/// Two append-only logs (data, history) sharing the on-disk record format.
pub struct AppendLog {
    data: Mutex<LogFile>,
    history: Mutex<LogFile>,
}

impl AppendLog {
    /// Opens (or creates) the data and history log files and rebuilds
    /// `index` by scanning both from offset 0, per the source's startup
    /// rebuild algorithm (§4.2).
    pub fn open(
        data_path: &Path,
        history_path: &Path,
        data_block_size: u64,
        history_block_size: u64,
        index: &mut Index,
    ) -> Result<Self, StoreError> {
        let mut data = LogFile::open(data_path, data_block_size)?;
        let mut history = LogFile::open(history_path, history_block_size)?;

        data.tail =
            rebuild_index_from_file(&mut data.file, BlobKind::Data, data_block_size, index)?;
        history.tail = rebuild_index_from_file(
            &mut history.file,
            BlobKind::History,
            history_block_size,
            index,
        )?;

        Ok(Self {
            data: Mutex::new(data),
            history: Mutex::new(history),
        })
    }

    /// Appends `diskctl` (serialized little-endian) followed by `payload`
    /// at the current tail, pads to the next block boundary if configured,
    /// and publishes the new tail. Returns `(offset, on_disk_size)`.
    ///
    /// Partial `write` returns are looped internally (`write_all`); on any
    /// error the tail is left untouched.
    pub fn append(
        &self,
        kind: BlobKind,
        diskctl: &DiskControl,
        payload: &[u8],
    ) -> Result<(u64, u64), StoreError> {
        let mut guard = self.lock(kind);
        let offset = guard.tail;

        let header_bytes = diskctl.to_bytes();
        let record_len = header_bytes.len() as u64 + payload.len() as u64;
        let padding = guard.padding_for(record_len);
        let on_disk_size = record_len + padding;

        guard.file.seek(SeekFrom::Start(offset))?;
        guard.file.write_all(&header_bytes)?;
        guard.file.write_all(payload)?;
        if padding > 0 {
            let zeros = vec![0u8; padding as usize];
            guard.file.write_all(&zeros)?;
        }

        guard.tail = offset + on_disk_size;
        tracing::debug!(?kind, offset, on_disk_size, "appended record");
        Ok((offset, on_disk_size))
    }

    /// Positional read; does not touch the tail.
    pub fn read_at(
        &self,
        kind: BlobKind,
        offset: u64,
        length: u64,
        into_buffer: &mut Vec<u8>,
    ) -> Result<usize, StoreError> {
        let mut guard = self.lock(kind);
        guard.file.seek(SeekFrom::Start(offset))?;
        into_buffer.resize(length as usize, 0);
        let mut read_total = 0usize;
        while read_total < into_buffer.len() {
            let n = guard.file.read(&mut into_buffer[read_total..])?;
            if n == 0 {
                break;
            }
            read_total += n;
        }
        into_buffer.truncate(read_total);
        Ok(read_total)
    }

    /// Overwrites a header in place (used to flip `REMOVED`). Must not
    /// resize the record: `diskctl.size` is expected to equal what's
    /// already on disk at `offset`.
    pub fn overwrite_header(
        &self,
        kind: BlobKind,
        offset: u64,
        diskctl: &DiskControl,
    ) -> Result<(), StoreError> {
        let mut guard = self.lock(kind);
        guard.file.seek(SeekFrom::Start(offset))?;
        guard.file.write_all(&diskctl.to_bytes())?;
        Ok(())
    }

    pub fn tail(&self, kind: BlobKind) -> u64 {
        self.lock(kind).tail
    }

    fn lock(&self, kind: BlobKind) -> std::sync::MutexGuard<'_, LogFile> {
        match kind {
            BlobKind::Data => self.data.lock().expect("data log mutex poisoned"),
            BlobKind::History => self.history.lock().expect("history log mutex poisoned"),
        }
    }
}

/// Sequential scan of a log file from offset 0, rebuilding `index` per
/// §4.2: later records for the same key supersede earlier ones, tombstoned
/// records are skipped, and a truncated tail stops the scan rather than
/// erroring.
fn rebuild_index_from_file(
    file: &mut File,
    kind: BlobKind,
    block_size: u64,
    index: &mut Index,
) -> Result<u64, StoreError> {
    use ringcask_types::control::DISK_CONTROL_LEN;

    file.seek(SeekFrom::Start(0))?;
    let file_len = file.metadata()?.len();

    let mut offset = 0u64;
    let mut header_buf = [0u8; DISK_CONTROL_LEN];

    loop {
        if offset + DISK_CONTROL_LEN as u64 > file_len {
            break;
        }
        file.seek(SeekFrom::Start(offset))?;
        if file.read_exact(&mut header_buf).is_err() {
            break;
        }
        let header = DiskControl::from_bytes(&header_buf)?;

        if offset + DISK_CONTROL_LEN as u64 + header.size > file_len {
            // Truncated tail: an in-progress append never completed.
            break;
        }

        let padding = if block_size == 0 {
            0
        } else {
            let record_len = DISK_CONTROL_LEN as u64 + header.size;
            let rem = record_len % block_size;
            if rem == 0 {
                0
            } else {
                block_size - rem
            }
        };
        let on_disk_size = DISK_CONTROL_LEN as u64 + header.size + padding;

        let key = CompositeKey::new(header.id, kind);
        if header.is_removed() {
            index.erase(key);
        } else {
            index.insert_or_replace(key, RamControl::new(offset, on_disk_size));
        }

        offset += on_disk_size;
    }

    tracing::debug!(?kind, tail = offset, "rebuilt index from log scan");
    Ok(offset)
}
