//! On-disk [`DiskControl`] header and its in-memory index counterpart,
//! [`RamControl`].
//!
//! # On-disk layout (little-endian)
//!
//! ```text
//! offset   size  field
//!   0      IdLen id
//!   IdLen   8    flags   (bit 0 = REMOVED)
//!   IdLen+8 8    size    (payload bytes, excluding header and padding)
//! ```

use crate::error::StoreError;
use crate::id::{Identifier, ID_LEN};

/// `DiskControl.flags` bit 0: record is tombstoned, skip on scan.
pub const FLAG_REMOVED: u64 = 1 << 0;

/// Serialized size of a [`DiskControl`] header.
pub const DISK_CONTROL_LEN: usize = ID_LEN + 8 + 8;

/// Fixed header prepended to every on-disk record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskControl {
    pub id: Identifier,
    pub flags: u64,
    pub size: u64,
}

impl DiskControl {
    pub fn new(id: Identifier, size: u64) -> Self {
        Self { id, flags: 0, size }
    }

    pub fn is_removed(&self) -> bool {
        self.flags & FLAG_REMOVED != 0
    }

    pub fn set_removed(&mut self, removed: bool) {
        if removed {
            self.flags |= FLAG_REMOVED;
        } else {
            self.flags &= !FLAG_REMOVED;
        }
    }

    /// Serializes the header to its fixed on-disk little-endian layout.
    pub fn to_bytes(&self) -> [u8; DISK_CONTROL_LEN] {
        let mut buf = [0u8; DISK_CONTROL_LEN];
        buf[..ID_LEN].copy_from_slice(self.id.as_bytes());
        buf[ID_LEN..ID_LEN + 8].copy_from_slice(&self.flags.to_le_bytes());
        buf[ID_LEN + 8..ID_LEN + 16].copy_from_slice(&self.size.to_le_bytes());
        buf
    }

    /// Parses a header from exactly [`DISK_CONTROL_LEN`] bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] (treated as truncation, not a
    /// recoverable validation failure) if fewer bytes are supplied than the
    /// fixed header length.
    pub fn from_bytes(data: &[u8]) -> Result<Self, StoreError> {
        if data.len() < DISK_CONTROL_LEN {
            return Err(StoreError::io("disk control header truncated", None));
        }
        let mut id_bytes = [0u8; ID_LEN];
        id_bytes.copy_from_slice(&data[..ID_LEN]);
        let flags = u64::from_le_bytes(
            data[ID_LEN..ID_LEN + 8]
                .try_into()
                .expect("slice is exactly 8 bytes"),
        );
        let size = u64::from_le_bytes(
            data[ID_LEN + 8..ID_LEN + 16]
                .try_into()
                .expect("slice is exactly 8 bytes"),
        );
        Ok(Self {
            id: Identifier::from_bytes(id_bytes),
            flags,
            size,
        })
    }
}

/// In-memory index value: where a record lives and how much disk space it
/// occupies, header and padding included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamControl {
    pub offset: u64,
    pub total_on_disk_size: u64,
}

impl RamControl {
    pub fn new(offset: u64, total_on_disk_size: u64) -> Self {
        Self {
            offset,
            total_on_disk_size,
        }
    }

    /// Offset immediately following this record on disk.
    pub fn end_offset(&self) -> u64 {
        self.offset + self.total_on_disk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let ctl = DiskControl::new(Identifier::from_slice_lossy(b"hello"), 5);
        let bytes = ctl.to_bytes();
        let parsed = DiskControl::from_bytes(&bytes).unwrap();
        assert_eq!(ctl, parsed);
    }

    #[test]
    fn removed_flag_round_trips() {
        let mut ctl = DiskControl::new(Identifier::ZERO, 0);
        assert!(!ctl.is_removed());
        ctl.set_removed(true);
        assert!(ctl.is_removed());
        let parsed = DiskControl::from_bytes(&ctl.to_bytes()).unwrap();
        assert!(parsed.is_removed());
    }

    #[test]
    fn truncated_bytes_error() {
        let err = DiskControl::from_bytes(&[0u8; DISK_CONTROL_LEN - 1]);
        assert!(err.is_err());
    }

    #[test]
    fn end_offset_adds_total_size() {
        let rc = RamControl::new(10, 20);
        assert_eq!(rc.end_offset(), 30);
    }

    proptest::proptest! {
        #[test]
        fn round_trips_for_arbitrary_fields(id_seed: [u8; 8], flags: u64, size: u64) {
            let ctl = DiskControl {
                id: Identifier::from_slice_lossy(&id_seed),
                flags,
                size,
            };
            let parsed = DiskControl::from_bytes(&ctl.to_bytes()).unwrap();
            proptest::prop_assert_eq!(ctl, parsed);
        }
    }
}
