//! The cross-replica recovery engine: diffs replicas across hash rings and
//! within a ring, then transfers missing/stale objects to restore replica
//! invariants.

pub mod context;
pub mod dc;
pub mod error;
pub mod iterator_rpc;
pub mod merge;
pub mod monitor;
pub mod route;
pub mod scratch;
pub mod timewindow;
pub mod worker_pool;

pub use context::{Context, RecoveryConfig, RecoveryType, StatsFormat};
pub use dc::DcCoordinator;
pub use error::{RecoveryError, Result};
pub use iterator_rpc::{BulkTransport, IterRecord, IteratorRpc};
pub use merge::MergeCoordinator;
pub use monitor::{Monitor, RecoveryKind};
pub use route::{RouteEntry, RouteTable};
pub use worker_pool::{WorkUnit, WorkerOutcome, WorkerPool};
