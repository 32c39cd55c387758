//! `Monitor`: shared counters/statistics across worker processes.
//!
//! In-process counters live in `AtomicU64`s behind an `Arc`, cheaply
//! cloned into worker threads. Cross-process aggregation happens by each
//! worker writing its final counter snapshot to a small text file under
//! the run's tmp directory, which the parent folds in as each worker
//! exits (see `worker_pool`) — the workspace denies `unsafe_code`, which
//! rules out the teacher's mmap-backed shared-counter approach here.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::Result;

/// Which recovery flow a counter snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryKind {
    Merge,
    Dc,
}

impl RecoveryKind {
    fn label(self) -> &'static str {
        match self {
            RecoveryKind::Merge => "merge",
            RecoveryKind::Dc => "dc",
        }
    }
}

#[derive(Default)]
struct Counters {
    iterated_keys: AtomicU64,
    diff_keys: AtomicU64,
    transferred_keys: AtomicU64,
    transferred_bytes: AtomicU64,
    failed_keys: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> [u64; 5] {
        [
            self.iterated_keys.load(Ordering::Relaxed),
            self.diff_keys.load(Ordering::Relaxed),
            self.transferred_keys.load(Ordering::Relaxed),
            self.transferred_bytes.load(Ordering::Relaxed),
            self.failed_keys.load(Ordering::Relaxed),
        ]
    }
}

/// Named counters for one recovery run, split by recovery type.
#[derive(Clone)]
pub struct Monitor {
    kind: RecoveryKind,
    counters: Arc<Counters>,
}

impl Monitor {
    pub fn new(kind: RecoveryKind) -> Self {
        Self {
            kind,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn add_iterated(&self, n: u64) {
        self.counters.iterated_keys.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_diff(&self, n: u64) {
        self.counters.diff_keys.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_transferred(&self, keys: u64, bytes: u64) {
        self.counters
            .transferred_keys
            .fetch_add(keys, Ordering::Relaxed);
        self.counters
            .transferred_bytes
            .fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_failed(&self, n: u64) {
        self.counters.failed_keys.fetch_add(n, Ordering::Relaxed);
    }

    pub fn diff_keys(&self) -> u64 {
        self.counters.diff_keys.load(Ordering::Relaxed)
    }

    /// Merges another snapshot's counts into this monitor (used by the
    /// parent to fold in a worker's final counters).
    pub fn merge_snapshot(&self, snapshot: [u64; 5]) {
        self.counters
            .iterated_keys
            .fetch_add(snapshot[0], Ordering::Relaxed);
        self.counters
            .diff_keys
            .fetch_add(snapshot[1], Ordering::Relaxed);
        self.counters
            .transferred_keys
            .fetch_add(snapshot[2], Ordering::Relaxed);
        self.counters
            .transferred_bytes
            .fetch_add(snapshot[3], Ordering::Relaxed);
        self.counters
            .failed_keys
            .fetch_add(snapshot[4], Ordering::Relaxed);
    }

    /// Plain-text snapshot, the `stats.txt` format. Also served verbatim
    /// by the optional passive HTTP endpoint.
    pub fn render_text(&self) -> String {
        let [iterated, diff, transferred, bytes, failed] = self.counters.snapshot();
        format!(
            "type={}\niterated_keys={iterated}\ndiff_keys={diff}\ntransferred_keys={transferred}\ntransferred_bytes={bytes}\nfailed_keys={failed}\n",
            self.kind.label(),
        )
    }

    pub fn write_stats_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render_text())?;
        Ok(())
    }

    /// Writes this monitor's raw snapshot to `path` in a format
    /// `merge_snapshot_from_file` can read back, for cross-process
    /// reporting from a worker to the parent.
    pub fn write_snapshot_file(&self, path: &Path) -> Result<()> {
        let snapshot = self.counters.snapshot();
        let line = snapshot
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        fs::write(path, line)?;
        Ok(())
    }

    pub fn merge_snapshot_file(&self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)?;
        let mut snapshot = [0u64; 5];
        for (slot, field) in snapshot.iter_mut().zip(content.trim().split(',')) {
            *slot = field.parse().unwrap_or(0);
        }
        self.merge_snapshot(snapshot);
        Ok(())
    }

    /// Spawns a background thread serving this monitor's text snapshot over
    /// plain HTTP on `127.0.0.1:<port>` — one `GET` in, one `200 text/plain`
    /// response out, no routing. §5 rules out async/cooperative scheduling
    /// for the recovery engine, so this is a blocking `TcpListener` accept
    /// loop rather than the teacher's `axum` stack (`kimberlite-server::http`);
    /// each connection is handled on its own short-lived thread.
    ///
    /// The listener thread is detached: it runs until the process exits,
    /// which is fine for a run-scoped stats endpoint with no shutdown signal
    /// to wait for.
    pub fn serve_http(&self, port: u16) -> std::io::Result<JoinHandle<()>> {
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        let monitor = self.clone();
        Ok(thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        let monitor = monitor.clone();
                        thread::spawn(move || {
                            if let Err(e) = handle_connection(stream, &monitor) {
                                tracing::debug!(error = %e, "monitor http connection error");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "monitor http accept failed"),
                }
            }
        }))
    }
}

fn handle_connection(mut stream: TcpStream, monitor: &Monitor) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    let body = monitor.render_text();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()
}
