//! `HistoryEntry`: fixed-size record appended to the per-key history log.

use crate::error::StoreError;
use crate::id::{Identifier, ID_LEN};

/// Serialized length of a [`HistoryEntry`]:
/// `id[ID_LEN] + offset(8) + size(8) + timestamp(8) + flags(4)`.
pub const HISTORY_ENTRY_LEN: usize = ID_LEN + 8 + 8 + 8 + 4;

/// One mutation of a key, appended to the history log on every data write
/// when history tracking is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: Identifier,
    pub offset: u64,
    pub size: u64,
    pub timestamp: u64,
    pub flags: u32,
}

impl HistoryEntry {
    pub fn to_bytes(&self) -> [u8; HISTORY_ENTRY_LEN] {
        let mut buf = [0u8; HISTORY_ENTRY_LEN];
        let mut at = 0;
        buf[at..at + ID_LEN].copy_from_slice(self.id.as_bytes());
        at += ID_LEN;
        buf[at..at + 8].copy_from_slice(&self.offset.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.size.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.timestamp.to_le_bytes());
        at += 8;
        buf[at..at + 4].copy_from_slice(&self.flags.to_le_bytes());
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, StoreError> {
        if data.len() < HISTORY_ENTRY_LEN {
            return Err(StoreError::io("history entry truncated", None));
        }
        let mut at = 0;
        let mut id_bytes = [0u8; ID_LEN];
        id_bytes.copy_from_slice(&data[at..at + ID_LEN]);
        at += ID_LEN;
        let offset = u64::from_le_bytes(data[at..at + 8].try_into().unwrap());
        at += 8;
        let size = u64::from_le_bytes(data[at..at + 8].try_into().unwrap());
        at += 8;
        let timestamp = u64::from_le_bytes(data[at..at + 8].try_into().unwrap());
        at += 8;
        let flags = u32::from_le_bytes(data[at..at + 4].try_into().unwrap());

        Ok(Self {
            id: Identifier::from_bytes(id_bytes),
            offset,
            size,
            timestamp,
            flags,
        })
    }
}
