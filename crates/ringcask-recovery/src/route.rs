//! `RouteTable`: parsed ring membership, grouped by replica set.
//!
//! Grounded on `kimberlite-cluster::config::{ClusterConfig, NodeConfig}`'s
//! shape (an ordered list of node descriptors), generalized here to
//! key ranges over a ring rather than a fixed node count.

use ringcask_types::Identifier;

/// `(id_range_start, node_address, group_id)`. A `RouteTable` is an
/// ordered list; successive entries define ranges over the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub id_range_start: Identifier,
    pub node_address: String,
    pub group_id: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Ranges `(start, end)` owned by `group_id`, in table order. `end` is
    /// the next entry's start within the same group, or `Identifier`'s
    /// maximum value for the last one.
    pub fn ranges_for_group(&self, group_id: u32) -> Vec<(Identifier, Identifier)> {
        let group_entries: Vec<&RouteEntry> = self
            .entries
            .iter()
            .filter(|e| e.group_id == group_id)
            .collect();

        group_entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let end = group_entries
                    .get(i + 1)
                    .map(|next| next.id_range_start)
                    .unwrap_or(Identifier::from_bytes([0xffu8; ringcask_types::ID_LEN]));
                (entry.id_range_start, end)
            })
            .collect()
    }

    /// All distinct group ids present in the table, in first-seen order.
    pub fn group_ids(&self) -> Vec<u32> {
        let mut seen = Vec::new();
        for e in &self.entries {
            if !seen.contains(&e.group_id) {
                seen.push(e.group_id);
            }
        }
        seen
    }

    /// Resolves the group id for `address`. When an address appears in
    /// more than one group, the first matching table entry wins (see the
    /// Open Question resolution in DESIGN.md — this ordering assumption
    /// should be confirmed against production configs).
    pub fn group_id_for_address(&self, address: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.node_address == address)
            .map(|e| e.group_id)
    }

    /// Node addresses participating in `group_id`, in table order.
    pub fn nodes_in_group(&self, group_id: u32) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.group_id == group_id)
            .map(|e| e.node_address.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: u8, addr: &str, group: u32) -> RouteEntry {
        RouteEntry {
            id_range_start: Identifier::from_slice_lossy(&[start]),
            node_address: addr.to_string(),
            group_id: group,
        }
    }

    #[test]
    fn group_id_first_match_wins() {
        let table = RouteTable::new(vec![
            entry(0, "10.0.0.1:9000", 1),
            entry(50, "10.0.0.1:9000", 2),
        ]);
        assert_eq!(table.group_id_for_address("10.0.0.1:9000"), Some(1));
    }

    #[test]
    fn ranges_split_at_next_group_member() {
        let table = RouteTable::new(vec![
            entry(0, "a", 1),
            entry(10, "b", 1),
            entry(20, "c", 2),
        ]);
        let ranges = table.ranges_for_group(1);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].0, Identifier::from_slice_lossy(&[0]));
        assert_eq!(ranges[0].1, Identifier::from_slice_lossy(&[10]));
    }
}
