//! The iterator RPC contract (recovery ↔ node) and the transport/bulk-op
//! boundaries the coordinators drive. These stay trait boundaries per the
//! source spec's Non-goals — no concrete transport is implemented here.

use ringcask_types::Identifier;

/// One entry in an iterator RPC stream: `(id, size, timestamp, flags)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterRecord {
    pub id: Identifier,
    pub size: u64,
    pub timestamp: u64,
    pub flags: u32,
}

/// A remote call returning a sorted-by-id stream of records for a key
/// range. Implemented by whatever carries the wire transport; ringcask
/// only specifies the contract.
pub trait IteratorRpc: Send + Sync {
    fn iterate(
        &self,
        node_address: &str,
        group_id: u32,
        range_start: Identifier,
        range_end: Identifier,
        since_timestamp: u64,
    ) -> Result<Vec<IterRecord>, crate::error::RecoveryError>;
}

/// A batched multi-key bulk operation, size-bounded by `batch_size`.
pub trait BulkTransport: Send + Sync {
    fn bulk_read(
        &self,
        node_address: &str,
        ids: &[Identifier],
    ) -> Result<Vec<Vec<u8>>, crate::error::RecoveryError>;

    fn bulk_write(
        &self,
        node_address: &str,
        ids: &[Identifier],
        payloads: &[Vec<u8>],
    ) -> Result<(), crate::error::RecoveryError>;

    fn bulk_delete(
        &self,
        node_address: &str,
        ids: &[Identifier],
    ) -> Result<(), crate::error::RecoveryError>;
}
