//! Scratch-file namespace management.
//!
//! Scratch files follow a fixed prefix set (`iterator_`, `diff_`,
//! `merge_`). At startup the coordinator removes any pre-existing file
//! with these prefixes in the tmp directory, per §5's shared-resource
//! policy. Grounded on
//! `kimberlite-cluster::config::ClusterConfig::create_directories` for the
//! directory-layout-under-a-root idiom.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RecoveryError, Result};

pub const SCRATCH_PREFIXES: [&str; 3] = ["iterator_", "diff_", "merge_"];

/// Sweeps `tmp_dir` of any file whose name starts with a known scratch
/// prefix. Safe to call at startup before a run and is the only cleanup a
/// crashed run gets — scratch files left by Ctrl-C are picked up by the
/// next invocation's sweep.
pub fn sweep(tmp_dir: &Path) -> Result<usize> {
    let mut removed = 0;
    let entries = match fs::read_dir(tmp_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(RecoveryError::Io(e)),
    };

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if SCRATCH_PREFIXES.iter().any(|p| name.starts_with(p)) {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::info!(removed, path = %tmp_dir.display(), "swept stale scratch files");
    }
    Ok(removed)
}

/// Builds the scratch-file path for one iterator stream: `iterator_<node>_<range>`.
pub fn iterator_path(tmp_dir: &Path, node: &str, range_tag: &str) -> PathBuf {
    let safe_node = node.replace([':', '/'], "_");
    tmp_dir.join(format!("iterator_{safe_node}_{range_tag}"))
}

pub fn diff_path(tmp_dir: &Path, tag: &str) -> PathBuf {
    tmp_dir.join(format!("diff_{tag}"))
}

pub fn merge_path(tmp_dir: &Path, tag: &str) -> PathBuf {
    tmp_dir.join(format!("merge_{tag}"))
}

/// Per-worker scratch subdirectory, so `nprocess` workers never collide on
/// scratch file names for the same range tag.
pub fn worker_dir(tmp_dir: &Path, worker_id: usize) -> PathBuf {
    tmp_dir.join(format!("worker_{worker_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sweep_removes_only_scratch_prefixed_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("iterator_a_1"), b"x").unwrap();
        fs::write(dir.path().join("diff_a"), b"x").unwrap();
        fs::write(dir.path().join("keep.txt"), b"x").unwrap();

        let removed = sweep(dir.path()).unwrap();
        assert_eq!(removed, 2);
        assert!(dir.path().join("keep.txt").exists());
        assert!(!dir.path().join("iterator_a_1").exists());
    }

    #[test]
    fn sweep_missing_dir_is_a_noop() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(sweep(&missing).unwrap(), 0);
    }
}
