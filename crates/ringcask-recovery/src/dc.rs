//! `DcCoordinator`: recovery across rings, replica reconciliation (P7).
//!
//! Same grounding as [`crate::merge`] (`kimberlite-vsr::replica::repair`'s
//! diff-then-fetch shape), generalized from a two-party comparison to an
//! N-way winner selection across replicas.

use std::collections::HashMap;

use ringcask_types::Identifier;

use crate::error::Result;
use crate::iterator_rpc::{BulkTransport, IterRecord};
use crate::monitor::Monitor;

/// One key that needs to move from the winning replica to a stale one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInstruction {
    pub id: Identifier,
    pub from: String,
    pub to: String,
}

/// Winner selection per P7: `argmax(ts, size, -addr)` over the replicas
/// reporting a key, i.e. highest timestamp, ties broken by highest size,
/// ties broken by lowest node address.
fn pick_winner<'a>(
    candidates: &[(&'a str, Option<&'a IterRecord>)],
) -> Option<(&'a str, &'a IterRecord)> {
    candidates
        .iter()
        .filter_map(|(addr, rec)| rec.map(|r| (*addr, r)))
        .max_by(|(addr_a, a), (addr_b, b)| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.size.cmp(&b.size))
                .then(addr_b.cmp(addr_a)) // lower address wins ties
        })
}

/// Emits transfer instructions winner → each stale replica for every key
/// seen across `replicas`. `since` skips keys whose winning timestamp is
/// below the cutoff.
pub fn diff(
    replicas: &[(String, Vec<IterRecord>)],
    since: Option<u64>,
) -> Vec<TransferInstruction> {
    let mut by_id: HashMap<Identifier, Vec<(&str, Option<&IterRecord>)>> = HashMap::new();

    for (addr, records) in replicas {
        for record in records {
            by_id
                .entry(record.id)
                .or_default()
                .push((addr.as_str(), Some(record)));
        }
    }
    // Ensure every replica has an entry (possibly None) for every id seen.
    for (id, entries) in by_id.iter_mut() {
        for (addr, _) in replicas {
            if !entries.iter().any(|(a, _)| *a == addr.as_str()) {
                entries.push((addr.as_str(), None));
            }
        }
        let _ = id;
    }

    let mut instructions = Vec::new();
    let mut ids: Vec<&Identifier> = by_id.keys().collect();
    ids.sort();

    for id in ids {
        let candidates = &by_id[id];
        let Some((winner_addr, winner_rec)) = pick_winner(candidates) else {
            continue;
        };
        if let Some(cutoff) = since {
            if winner_rec.timestamp < cutoff {
                continue;
            }
        }
        for (addr, rec) in candidates {
            if *addr == winner_addr {
                continue;
            }
            let is_stale = match rec {
                None => true,
                Some(r) => {
                    (r.timestamp, r.size) != (winner_rec.timestamp, winner_rec.size)
                }
            };
            if is_stale {
                instructions.push(TransferInstruction {
                    id: *id,
                    from: winner_addr.to_string(),
                    to: (*addr).to_string(),
                });
            }
        }
    }
    instructions
}

pub struct DcCoordinator<'a> {
    transport: &'a dyn BulkTransport,
    monitor: Monitor,
    batch_size: usize,
    dry_run: bool,
}

impl<'a> DcCoordinator<'a> {
    pub fn new(
        transport: &'a dyn BulkTransport,
        monitor: Monitor,
        batch_size: usize,
        dry_run: bool,
    ) -> Self {
        Self {
            transport,
            monitor,
            batch_size,
            dry_run,
        }
    }

    pub fn run(
        &self,
        replicas: &[(String, Vec<IterRecord>)],
        since: Option<u64>,
    ) -> Result<usize> {
        let total_iterated: u64 = replicas.iter().map(|(_, r)| r.len() as u64).sum();
        self.monitor.add_iterated(total_iterated);

        let instructions = diff(replicas, since);
        self.monitor.add_diff(instructions.len() as u64);
        tracing::debug!(
            replica_count = replicas.len(),
            instruction_count = instructions.len(),
            "computed dc transfer instructions"
        );

        if self.dry_run {
            return Ok(instructions.len());
        }

        // Group by (from, to) so each pair gets batched bulk ops.
        let mut grouped: HashMap<(String, String), Vec<Identifier>> = HashMap::new();
        for instr in &instructions {
            grouped
                .entry((instr.from.clone(), instr.to.clone()))
                .or_default()
                .push(instr.id);
        }

        for ((from, to), ids) in grouped {
            for chunk in ids.chunks(self.batch_size) {
                let payloads = self.transport.bulk_read(&from, chunk)?;
                self.transport.bulk_write(&to, chunk, &payloads)?;
                let bytes: u64 = payloads.iter().map(|p| p.len() as u64).sum();
                self.monitor.add_transferred(chunk.len() as u64, bytes);
            }
        }

        Ok(instructions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: u8, ts: u64, size: u64) -> IterRecord {
        IterRecord {
            id: Identifier::from_slice_lossy(&[id]),
            size,
            timestamp: ts,
            flags: 0,
        }
    }

    #[test]
    fn scenario_6_dc_winner_selection() {
        let replicas = vec![
            ("r1".to_string(), vec![rec(1, 3, 5)]),
            ("r2".to_string(), vec![rec(1, 5, 5)]),
            ("r3".to_string(), vec![rec(1, 5, 10)]),
        ];
        let instructions = diff(&replicas, None);
        assert_eq!(instructions.len(), 2);
        assert!(instructions.iter().all(|i| i.from == "r3"));
        let targets: Vec<&str> = instructions.iter().map(|i| i.to.as_str()).collect();
        assert!(targets.contains(&"r1"));
        assert!(targets.contains(&"r2"));
    }

    #[test]
    fn p7_tie_break_by_lowest_address() {
        let replicas = vec![
            ("b".to_string(), vec![rec(1, 5, 10)]),
            ("a".to_string(), vec![rec(1, 5, 10)]),
        ];
        let instructions = diff(&replicas, None);
        assert_eq!(instructions, vec![TransferInstruction {
            id: Identifier::from_slice_lossy(&[1]),
            from: "a".to_string(),
            to: "b".to_string(),
        }]);
    }

    #[test]
    fn identical_replicas_produce_no_instructions() {
        let replicas = vec![
            ("a".to_string(), vec![rec(1, 5, 10)]),
            ("b".to_string(), vec![rec(1, 5, 10)]),
            ("c".to_string(), vec![rec(1, 5, 10)]),
        ];
        assert!(diff(&replicas, None).is_empty());
    }
}
