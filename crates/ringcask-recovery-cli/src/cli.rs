//! Flag table for the recovery driver (§6), implemented with `clap`
//! derive in the style of `kimberlite-cli::main` — tracing initialized
//! before parsing, a top-level `Parser` dispatching to one of two modes.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Cross-replica recovery driver: diffs replicas across hash rings and
/// within a ring, then transfers missing/stale objects.
#[derive(Debug, Parser)]
#[command(name = "ringcask-recover", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: RecoveryCommand,
}

#[derive(Debug, Subcommand)]
pub enum RecoveryCommand {
    /// Recovery within a single ring (rebalancing after topology change).
    Merge(RecoveryArgs),
    /// Recovery across rings (replica reconciliation).
    Dc(RecoveryArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatsFormatArg {
    Text,
    None,
}

#[derive(Debug, Parser)]
pub struct RecoveryArgs {
    /// Bootstrap node, `host:port:family`.
    #[arg(short = 'r', long = "route")]
    pub bootstrap: String,

    /// Restrict to these groups, comma-separated.
    #[arg(short = 'g', long = "groups", value_delimiter = ',')]
    pub groups: Option<Vec<u32>>,

    /// Batch size for bulk ops.
    #[arg(short = 'b', long = "batch-size", default_value_t = 1024)]
    pub batch_size: usize,

    /// Worker-process count.
    #[arg(short = 'n', long = "nprocess", default_value_t = 1)]
    pub nprocess: usize,

    /// Min timestamp: epoch seconds, or `12h`/`1d`/`4w`.
    #[arg(short = 't', long = "timestamp")]
    pub timestamp: Option<String>,

    /// Tmp dir; `%TYPE%` is substituted with `merge` or `dc`.
    #[arg(short = 'D', long = "tmp-dir", default_value = "/tmp/ringcask-recover-%TYPE%")]
    pub tmp_dir: String,

    /// Advisory lockfile path, relative to the tmp dir.
    #[arg(short = 'k', long = "lockfile", default_value = "ringcask-recover.lock")]
    pub lockfile: PathBuf,

    /// Library log path.
    #[arg(short = 'l', long = "log-file")]
    pub log_path: Option<PathBuf>,

    /// Library log verbosity.
    #[arg(short = 'L', long = "log-level")]
    pub log_level: Option<String>,

    /// Dry-run: diff only, no transfers.
    #[arg(short = 'N', long = "dry-run")]
    pub dry_run: bool,

    /// Safe mode: no source deletion after merge.
    #[arg(short = 'S', long = "safe")]
    pub safe_mode: bool,

    /// Stats output format.
    #[arg(short = 's', long = "stats", default_value = "text")]
    pub stats_format: StatsFormatArg,

    /// Monitor HTTP port.
    #[arg(short = 'm', long = "monitor-port")]
    pub monitor_port: Option<u16>,

    /// Per-operation wait timeout, seconds.
    #[arg(short = 'w', long = "wait-timeout", default_value_t = 30)]
    pub wait_timeout_secs: u64,

    /// Debug logging.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Pause for user input at exit.
    #[arg(short = 'e', long = "pause-at-exit")]
    pub pause_at_exit: bool,

    /// Internal: `<group>:<range_start_hex>:<range_end_hex>` assigned to
    /// this worker process. Set by the parent invocation when fanning out
    /// to `nprocess` workers; never passed by an interactive caller.
    #[arg(long = "worker-task", hide = true)]
    pub worker_tasks: Vec<String>,

    /// Internal: where this worker writes its counter snapshot for the
    /// parent to fold in. Required alongside `--worker-task`.
    #[arg(long = "worker-out", hide = true)]
    pub worker_out: Option<PathBuf>,

    /// Internal: resolved `since` cutoff, computed once by the parent so
    /// every worker shares the same epoch rather than re-resolving a
    /// relative `-t` spec independently.
    #[arg(long = "worker-since-epoch", hide = true)]
    pub worker_since_epoch: Option<u64>,
}

impl RecoveryArgs {
    pub fn tmp_dir_for(&self, type_tag: &str) -> PathBuf {
        PathBuf::from(self.tmp_dir.replace("%TYPE%", type_tag))
    }
}
