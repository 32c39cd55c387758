//! `IoAttr`: the per-request descriptor carried in command payloads.

use crate::error::StoreError;
use crate::id::{Identifier, ID_LEN};

/// Fixed-record length of a serialized [`IoAttr`]:
/// `id[ID_LEN] + origin[ID_LEN] + offset(8) + size(8) + flags(4)`.
pub const IO_ATTR_LEN: usize = ID_LEN + ID_LEN + 8 + 8 + 4;

/// Bitflags carried in [`IoAttr::flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoAttrFlags(pub u32);

impl IoAttrFlags {
    pub const IS_HISTORY: u32 = 1 << 0;
    pub const APPEND: u32 = 1 << 1;
    pub const NO_HISTORY_UPDATE: u32 = 1 << 2;
    pub const META: u32 = 1 << 3;

    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub fn has(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn is_history(self) -> bool {
        self.has(Self::IS_HISTORY)
    }

    pub fn is_append(self) -> bool {
        self.has(Self::APPEND)
    }

    pub fn no_history_update(self) -> bool {
        self.has(Self::NO_HISTORY_UPDATE)
    }

    pub fn is_meta(self) -> bool {
        self.has(Self::META)
    }
}

/// Per-request descriptor carried in command payloads: `(id, origin,
/// offset, size, flags)`.
///
/// `origin` names the node that originated the request, used by the
/// backend to distinguish a client write from a recovery-driven replay;
/// the core command logic otherwise ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoAttr {
    pub id: Identifier,
    pub origin: Identifier,
    pub offset: u64,
    pub size: u64,
    pub flags: IoAttrFlags,
}

impl IoAttr {
    pub fn to_bytes(&self) -> [u8; IO_ATTR_LEN] {
        let mut buf = [0u8; IO_ATTR_LEN];
        let mut at = 0;
        buf[at..at + ID_LEN].copy_from_slice(self.id.as_bytes());
        at += ID_LEN;
        buf[at..at + ID_LEN].copy_from_slice(self.origin.as_bytes());
        at += ID_LEN;
        buf[at..at + 8].copy_from_slice(&self.offset.to_le_bytes());
        at += 8;
        buf[at..at + 8].copy_from_slice(&self.size.to_le_bytes());
        at += 8;
        buf[at..at + 4].copy_from_slice(&self.flags.0.to_le_bytes());
        buf
    }

    /// Parses an `IoAttr` from exactly [`IO_ATTR_LEN`] bytes, converting
    /// the on-the-wire little-endian fields to host order.
    pub fn from_bytes(data: &[u8]) -> Result<Self, StoreError> {
        if data.len() < IO_ATTR_LEN {
            return Err(StoreError::invalid("io_attr payload truncated"));
        }
        let mut at = 0;
        let mut id_bytes = [0u8; ID_LEN];
        id_bytes.copy_from_slice(&data[at..at + ID_LEN]);
        at += ID_LEN;
        let mut origin_bytes = [0u8; ID_LEN];
        origin_bytes.copy_from_slice(&data[at..at + ID_LEN]);
        at += ID_LEN;
        let offset = u64::from_le_bytes(data[at..at + 8].try_into().unwrap());
        at += 8;
        let size = u64::from_le_bytes(data[at..at + 8].try_into().unwrap());
        at += 8;
        let flags = u32::from_le_bytes(data[at..at + 4].try_into().unwrap());

        Ok(Self {
            id: Identifier::from_bytes(id_bytes),
            origin: Identifier::from_bytes(origin_bytes),
            offset,
            size,
            flags: IoAttrFlags::new(flags),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let attr = IoAttr {
            id: Identifier::from_slice_lossy(b"id"),
            origin: Identifier::from_slice_lossy(b"origin"),
            offset: 7,
            size: 5,
            flags: IoAttrFlags::new(IoAttrFlags::IS_HISTORY | IoAttrFlags::META),
        };
        let parsed = IoAttr::from_bytes(&attr.to_bytes()).unwrap();
        assert_eq!(attr, parsed);
        assert!(parsed.flags.is_history());
        assert!(parsed.flags.is_meta());
        assert!(!parsed.flags.is_append());
    }

    #[test]
    fn truncated_payload_errors() {
        assert!(IoAttr::from_bytes(&[0u8; IO_ATTR_LEN - 1]).is_err());
    }

    proptest::proptest! {
        #[test]
        fn round_trips_for_arbitrary_fields(
            id_seed: [u8; 8],
            origin_seed: [u8; 8],
            offset: u64,
            size: u64,
            flags: u32,
        ) {
            let attr = IoAttr {
                id: Identifier::from_slice_lossy(&id_seed),
                origin: Identifier::from_slice_lossy(&origin_seed),
                offset,
                size,
                flags: IoAttrFlags::new(flags),
            };
            let parsed = IoAttr::from_bytes(&attr.to_bytes()).unwrap();
            proptest::prop_assert_eq!(attr, parsed);
        }
    }
}
