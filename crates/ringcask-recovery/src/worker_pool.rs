//! `WorkerPool`: fan-out of per-range recovery tasks to subprocesses.
//!
//! Grounded on `kimberlite-cluster::{supervisor::ClusterSupervisor,
//! node::NodeProcess}` for the "manage N children, collect exit status,
//! one crash doesn't abort the others" shape, reimplemented on
//! `std::process::Command`/`std::thread` rather than `tokio::process`
//! because the source spec's Concurrency & Resource Model explicitly rules
//! out async/goroutine scheduling for the recovery engine: "coarse OS
//! processes are the unit of parallelism... No goroutine/async
//! abstractions." Work units are assigned once at startup — no stealing.

use std::process::Command;
use std::thread;

use crate::error::{RecoveryError, Result};
use crate::monitor::Monitor;

/// One worker's assignment: an id (used for its scratch subdirectory) and
/// the already-built command to run it.
pub struct WorkUnit {
    pub id: usize,
    pub command: Command,
}

/// Outcome of one worker.
#[derive(Debug)]
pub struct WorkerOutcome {
    pub id: usize,
    pub exit_code: Option<i32>,
    pub succeeded: bool,
}

pub struct WorkerPool;

impl WorkerPool {
    /// Spawns every work unit immediately, then blocks until all have
    /// exited. A nonzero exit from any worker marks the overall run
    /// `FAILED` but does not prevent the others from running to
    /// completion — each worker's failure is independent.
    pub fn run(units: Vec<WorkUnit>, monitor: &Monitor) -> Result<Vec<WorkerOutcome>> {
        tracing::info!(worker_count = units.len(), "spawning worker pool");
        let mut children = Vec::with_capacity(units.len());
        for mut unit in units {
            let child = unit
                .command
                .spawn()
                .map_err(|e| RecoveryError::Fatal(format!("spawn worker {}: {e}", unit.id)))?;
            tracing::debug!(worker_id = unit.id, "worker spawned");
            children.push((unit.id, child));
        }

        // Wait for every child on its own thread so a slow worker doesn't
        // delay collecting a fast one's result, though we still join all
        // before returning (the parent blocks until every worker exits).
        let handles: Vec<_> = children
            .into_iter()
            .map(|(id, mut child)| {
                thread::spawn(move || {
                    let status = child.wait();
                    (id, status)
                })
            })
            .collect();

        let mut outcomes = Vec::new();
        for handle in handles {
            let (id, status) = handle
                .join()
                .map_err(|_| RecoveryError::Fatal(format!("worker {id} thread panicked")))?;
            let status = status.map_err(RecoveryError::Io)?;
            let succeeded = status.success();
            if !succeeded {
                tracing::warn!(worker_id = id, exit_code = ?status.code(), "worker failed");
                monitor.add_failed(1);
            }
            outcomes.push(WorkerOutcome {
                id,
                exit_code: status.code(),
                succeeded,
            });
        }

        Ok(outcomes)
    }

    /// `true` if every worker exited successfully.
    pub fn all_succeeded(outcomes: &[WorkerOutcome]) -> bool {
        outcomes.iter().all(|o| o.succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_succeeded_true_when_every_worker_ok() {
        let outcomes = vec![
            WorkerOutcome { id: 0, exit_code: Some(0), succeeded: true },
            WorkerOutcome { id: 1, exit_code: Some(0), succeeded: true },
        ];
        assert!(WorkerPool::all_succeeded(&outcomes));
    }

    #[test]
    fn all_succeeded_false_when_one_worker_fails() {
        let outcomes = vec![
            WorkerOutcome { id: 0, exit_code: Some(0), succeeded: true },
            WorkerOutcome { id: 1, exit_code: Some(1), succeeded: false },
        ];
        assert!(!WorkerPool::all_succeeded(&outcomes));
    }

    #[test]
    fn run_spawns_and_collects_exit_codes() {
        let monitor = Monitor::new(crate::monitor::RecoveryKind::Merge);
        let mut ok_cmd = Command::new("true");
        let mut fail_cmd = Command::new("false");
        let units = vec![
            WorkUnit { id: 0, command: { ok_cmd.arg("--"); ok_cmd } },
            WorkUnit { id: 1, command: { fail_cmd.arg("--"); fail_cmd } },
        ];
        let outcomes = WorkerPool::run(units, &monitor).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(!WorkerPool::all_succeeded(&outcomes));
    }
}
