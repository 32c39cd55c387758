//! `Context`: parsed configuration and shared handles for one recovery
//! invocation.
//!
//! Grounded on `kimberlite-cluster::config::ClusterConfig` for the
//! serde-struct-plus-`toml`-persistence shape; the exclusive advisory lock
//! (§5: "the recovery parent holds an exclusive advisory lock on
//! `<tmp>/<lockfile>`; concurrent invocations fail fast") has no direct
//! teacher analogue and is implemented directly against `std::fs`.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RecoveryError, Result};
use crate::monitor::{Monitor, RecoveryKind};
use crate::route::RouteTable;
use crate::scratch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryType {
    Merge,
    Dc,
}

impl RecoveryType {
    pub fn monitor_kind(self) -> RecoveryKind {
        match self {
            RecoveryType::Merge => RecoveryKind::Merge,
            RecoveryType::Dc => RecoveryKind::Dc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsFormat {
    Text,
    None,
}

/// Parsed configuration for one `merge` or `dc` invocation — the
/// deserialized form of the CLI flag table (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    pub recovery_type: RecoveryType,
    pub bootstrap: String,
    pub groups: Option<Vec<u32>>,
    pub batch_size: usize,
    pub nprocess: usize,
    pub since_timestamp: Option<u64>,
    pub tmp_dir: PathBuf,
    pub lockfile: PathBuf,
    pub dry_run: bool,
    pub safe_mode: bool,
    pub stats_format: StatsFormat,
    pub monitor_port: Option<u16>,
    pub wait_timeout_secs: u64,
}

impl RecoveryConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Holds the exclusive advisory lock for the duration of a run. Removes
/// the lockfile on drop so the next invocation isn't blocked by a clean
/// exit.
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    fn acquire(path: &Path) -> Result<Self> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|_| RecoveryError::LockContention(path.to_path_buf()))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        tracing::debug!(path = %self.path.display(), "releasing advisory lock");
        let _ = fs::remove_file(&self.path);
    }
}

/// Created per CLI invocation, torn down on exit: config, route table,
/// monitor, and the held advisory lock.
pub struct Context {
    pub config: RecoveryConfig,
    pub route_table: RouteTable,
    pub monitor: Monitor,
    _lock: LockGuard,
}

impl Context {
    /// Sweeps stale scratch files, acquires the advisory lock, and wires
    /// up a fresh `Monitor` for `config.recovery_type`.
    pub fn new(config: RecoveryConfig, route_table: RouteTable) -> Result<Self> {
        fs::create_dir_all(&config.tmp_dir)?;
        scratch::sweep(&config.tmp_dir)?;

        let lock_path = config.tmp_dir.join(&config.lockfile);
        let lock = LockGuard::acquire(&lock_path)?;
        tracing::debug!(path = %lock_path.display(), "acquired advisory lock");

        let monitor = Monitor::new(config.recovery_type.monitor_kind());

        if let Some(port) = config.monitor_port {
            match monitor.serve_http(port) {
                Ok(_handle) => tracing::info!(port, "monitor http endpoint listening"),
                Err(e) => tracing::warn!(port, error = %e, "failed to start monitor http endpoint"),
            }
        }

        Ok(Self {
            config,
            route_table,
            monitor,
            _lock: lock,
        })
    }

    pub fn write_final_stats(&self) -> Result<()> {
        if matches!(self.config.stats_format, StatsFormat::None) {
            return Ok(());
        }
        self.monitor
            .write_stats_file(&self.config.tmp_dir.join("stats.txt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fixture_config(tmp_dir: PathBuf) -> RecoveryConfig {
        RecoveryConfig {
            recovery_type: RecoveryType::Merge,
            bootstrap: "127.0.0.1:9000:inet".to_string(),
            groups: None,
            batch_size: 1024,
            nprocess: 1,
            since_timestamp: None,
            tmp_dir,
            lockfile: PathBuf::from("ringcask.lock"),
            dry_run: false,
            safe_mode: false,
            stats_format: StatsFormat::Text,
            monitor_port: None,
            wait_timeout_secs: 30,
        }
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempdir().unwrap();
        let config = fixture_config(dir.path().to_path_buf());
        let path = dir.path().join("config.toml");
        config.save(&path).unwrap();
        let loaded = RecoveryConfig::load(&path).unwrap();
        assert_eq!(loaded.bootstrap, config.bootstrap);
        assert_eq!(loaded.batch_size, config.batch_size);
    }

    #[test]
    fn second_context_fails_fast_on_held_lock() {
        let dir = tempdir().unwrap();
        let config = fixture_config(dir.path().to_path_buf());
        let ctx = Context::new(config.clone(), RouteTable::default()).unwrap();

        let err = Context::new(config, RouteTable::default()).unwrap_err();
        assert!(matches!(err, RecoveryError::LockContention(_)));
        drop(ctx);
    }

    #[test]
    fn lock_released_after_drop_allows_next_run() {
        let dir = tempdir().unwrap();
        let config = fixture_config(dir.path().to_path_buf());
        {
            let _ctx = Context::new(config.clone(), RouteTable::default()).unwrap();
        }
        assert!(Context::new(config, RouteTable::default()).is_ok());
    }
}
