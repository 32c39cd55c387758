//! `LocalFsTransport`: the filesystem-backed `IteratorRpc`/`BulkTransport`
//! this binary supplies until a real network transport crate exists.
//!
//! `iterator_rpc.rs` leaves both traits as boundaries "implemented by
//! whatever carries the wire transport" — this binary is that caller.
//! Each node address becomes a subdirectory of the run's tmp directory
//! (sanitized the same way `scratch::iterator_path` sanitizes node names),
//! holding one `<hex-id>.rec` file per key: an 8-byte timestamp, a 4-byte
//! flags word, then the payload, little-endian throughout.

use std::fs;
use std::path::{Path, PathBuf};

use ringcask_recovery::{BulkTransport, IterRecord, IteratorRpc, RecoveryError};
use ringcask_types::{Identifier, ID_LEN};

const HEADER_LEN: usize = 8 + 4;

pub struct LocalFsTransport {
    root: PathBuf,
}

impl LocalFsTransport {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn node_dir(&self, node_address: &str) -> PathBuf {
        let safe = node_address.replace([':', '/'], "_");
        self.root.join(safe)
    }

    fn record_path(dir: &Path, id: Identifier) -> PathBuf {
        dir.join(format!("{id}.rec"))
    }
}

pub(crate) fn parse_hex_id(s: &str) -> Option<Identifier> {
    if s.len() != ID_LEN * 2 {
        return None;
    }
    let mut buf = [0u8; ID_LEN];
    for (i, slot) in buf.iter_mut().enumerate() {
        *slot = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(Identifier::from_bytes(buf))
}

impl IteratorRpc for LocalFsTransport {
    fn iterate(
        &self,
        node_address: &str,
        group_id: u32,
        range_start: Identifier,
        range_end: Identifier,
        since_timestamp: u64,
    ) -> Result<Vec<IterRecord>, RecoveryError> {
        let dir = self.node_dir(node_address);
        let mut out = Vec::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(RecoveryError::Io(e)),
        };

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(hex) = name.strip_suffix(".rec") else {
                continue;
            };
            let Some(id) = parse_hex_id(hex) else {
                continue;
            };
            if id < range_start || id >= range_end {
                continue;
            }

            let bytes = fs::read(entry.path())?;
            if bytes.len() < HEADER_LEN {
                continue;
            }
            let timestamp = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
            let flags = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
            if timestamp < since_timestamp {
                continue;
            }
            out.push(IterRecord {
                id,
                size: (bytes.len() - HEADER_LEN) as u64,
                timestamp,
                flags,
            });
        }

        out.sort_by_key(|r| r.id);
        tracing::debug!(node_address, group_id, found = out.len(), "iterated node range");
        Ok(out)
    }
}

impl BulkTransport for LocalFsTransport {
    fn bulk_read(&self, node_address: &str, ids: &[Identifier]) -> Result<Vec<Vec<u8>>, RecoveryError> {
        let dir = self.node_dir(node_address);
        ids.iter()
            .map(|id| fs::read(Self::record_path(&dir, *id)).map_err(RecoveryError::Io))
            .collect()
    }

    fn bulk_write(
        &self,
        node_address: &str,
        ids: &[Identifier],
        payloads: &[Vec<u8>],
    ) -> Result<(), RecoveryError> {
        let dir = self.node_dir(node_address);
        fs::create_dir_all(&dir)?;
        for (id, payload) in ids.iter().zip(payloads) {
            fs::write(Self::record_path(&dir, *id), payload)?;
        }
        Ok(())
    }

    fn bulk_delete(&self, node_address: &str, ids: &[Identifier]) -> Result<(), RecoveryError> {
        let dir = self.node_dir(node_address);
        for id in ids {
            let path = Self::record_path(&dir, *id);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}
