//! Command bodies for `merge` and `dc`, in `kimberlite-cli::commands::backup`'s
//! style: `anyhow::Context`/`bail!` for early validation, structured
//! `tracing` events in place of the teacher's spinner UI (this is a batch
//! tool, not an interactive one).
//!
//! A top-level invocation (no `--worker-*` flags set) is the **parent**: it
//! builds the range plan from the route table, fans `nprocess` worker
//! processes out via `WorkerPool`, and folds their counter snapshots back
//! in. Each worker is this same binary invoked re-entrantly with
//! `--worker-task`/`--worker-out` set, which routes it to the **worker**
//! path instead: no lock, no fan-out, just the assigned ranges run through
//! the real `MergeCoordinator`/`DcCoordinator`.

use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context as _, Result};

use ringcask_recovery::{
    scratch, Context, DcCoordinator, IterRecord, IteratorRpc, MergeCoordinator, Monitor,
    RecoveryConfig, RecoveryType, RouteEntry, RouteTable, StatsFormat, WorkUnit, WorkerPool,
};
use ringcask_types::Identifier;

use crate::cli::{RecoveryArgs, StatsFormatArg};
use crate::transport::{parse_hex_id, LocalFsTransport};

fn parse_bootstrap_as_route(bootstrap: &str) -> Result<RouteTable> {
    // The ring's real bootstrap protocol (fetching the full RouteTable
    // from the named node) is a transport concern outside this crate's
    // scope. Until a transport is wired in, the bootstrap address is
    // treated as the sole route entry covering the whole ring.
    if bootstrap.split(':').count() < 2 {
        bail!("bootstrap address '{bootstrap}' must be host:port[:family]");
    }
    Ok(RouteTable::new(vec![RouteEntry {
        id_range_start: Identifier::ZERO,
        node_address: bootstrap.to_string(),
        group_id: 0,
    }]))
}

fn build_config(recovery_type: RecoveryType, args: &RecoveryArgs, type_tag: &str) -> Result<RecoveryConfig> {
    let since_timestamp = args
        .timestamp
        .as_deref()
        .map(|spec| ringcask_recovery::timewindow::parse_timestamp_spec(spec, ringcask_recovery::timewindow::now_unix()))
        .transpose()
        .context("parsing -t timestamp spec")?;

    Ok(RecoveryConfig {
        recovery_type,
        bootstrap: args.bootstrap.clone(),
        groups: args.groups.clone(),
        batch_size: args.batch_size,
        nprocess: args.nprocess,
        since_timestamp,
        tmp_dir: args.tmp_dir_for(type_tag),
        lockfile: args.lockfile.clone(),
        dry_run: args.dry_run,
        safe_mode: args.safe_mode,
        stats_format: match args.stats_format {
            StatsFormatArg::Text => StatsFormat::Text,
            StatsFormatArg::None => StatsFormat::None,
        },
        monitor_port: args.monitor_port,
        wait_timeout_secs: args.wait_timeout_secs,
    })
}

/// `<group>:<range_start_hex>:<range_end_hex>`, the wire shape for a
/// `--worker-task` flag.
fn encode_worker_task(group: u32, start: Identifier, end: Identifier) -> String {
    format!("{group}:{start}:{end}")
}

fn parse_worker_task(raw: &str) -> Result<(u32, Identifier, Identifier)> {
    let mut parts = raw.splitn(3, ':');
    let group: u32 = parts
        .next()
        .context("missing group in worker task")?
        .parse()
        .context("invalid group in worker task")?;
    let start = parts.next().context("missing range start in worker task")?;
    let end = parts.next().context("missing range end in worker task")?;
    let start = parse_hex_id(start).context("invalid range start hex")?;
    let end = parse_hex_id(end).context("invalid range end hex")?;
    Ok((group, start, end))
}

/// Splits `tasks` round-robin into at most `nprocess` non-empty buckets.
fn partition_tasks(
    tasks: Vec<(u32, Identifier, Identifier)>,
    nprocess: usize,
) -> Vec<Vec<(u32, Identifier, Identifier)>> {
    let bucket_count = nprocess.max(1).min(tasks.len().max(1));
    let mut buckets: Vec<Vec<(u32, Identifier, Identifier)>> = vec![Vec::new(); bucket_count];
    for (i, task) in tasks.into_iter().enumerate() {
        buckets[i % bucket_count].push(task);
    }
    buckets.into_iter().filter(|b| !b.is_empty()).collect()
}

fn spawn_worker_command(
    exe: &Path,
    type_tag: &str,
    args: &RecoveryArgs,
    bucket: &[(u32, Identifier, Identifier)],
    since_epoch: Option<u64>,
    out_path: &Path,
) -> Command {
    let mut command = Command::new(exe);
    command
        .arg(type_tag)
        .arg("-r")
        .arg(&args.bootstrap)
        .arg("-b")
        .arg(args.batch_size.to_string())
        .arg("-D")
        .arg(&args.tmp_dir)
        .arg("-k")
        .arg(&args.lockfile)
        .arg("-s")
        .arg(match args.stats_format {
            StatsFormatArg::Text => "text",
            StatsFormatArg::None => "none",
        });
    if args.dry_run {
        command.arg("-N");
    }
    if args.safe_mode {
        command.arg("-S");
    }
    if args.debug {
        command.arg("-d");
    }
    for (group, start, end) in bucket {
        command.arg("--worker-task").arg(encode_worker_task(*group, *start, *end));
    }
    command.arg("--worker-out").arg(out_path);
    if let Some(epoch) = since_epoch {
        command.arg("--worker-since-epoch").arg(epoch.to_string());
    }
    command
}

/// Scratch trace of one iterator-RPC result, for post-mortem inspection
/// under the run's tmp directory. Best-effort: a trace write failure
/// doesn't abort recovery.
fn write_iter_trace(path: &Path, records: &[IterRecord]) {
    let mut buf = String::new();
    for r in records {
        buf.push_str(&format!("{} size={} ts={} flags={}\n", r.id, r.size, r.timestamp, r.flags));
    }
    if let Err(e) = fs::write(path, buf) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write iterator scratch trace");
    }
}

fn write_id_list_trace(path: &Path, ids: &[Identifier]) {
    let mut buf = String::new();
    for id in ids {
        buf.push_str(&format!("{id}\n"));
    }
    if let Err(e) = fs::write(path, buf) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write diff scratch trace");
    }
}

fn write_manifest(path: &Path, transferred: usize) {
    if let Err(e) = fs::write(path, format!("transferred={transferred}\n")) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write merge scratch manifest");
    }
}

/// Parent path: builds the range plan, fans workers out, folds their
/// counters back in, and writes the combined `stats.txt`.
fn run_parent(recovery_type: RecoveryType, type_tag: &str, args: RecoveryArgs) -> Result<usize> {
    let route_table = parse_bootstrap_as_route(&args.bootstrap)?;
    let config = build_config(recovery_type, &args, type_tag)?;
    tracing::info!(recovery_type = type_tag, bootstrap = %config.bootstrap, batch_size = config.batch_size, "starting recovery");

    let ctx = Context::new(config, route_table.clone()).context("initializing recovery context")?;

    let groups = ctx
        .config
        .groups
        .clone()
        .unwrap_or_else(|| route_table.group_ids());
    let mut tasks = Vec::new();
    for group in groups {
        for (start, end) in route_table.ranges_for_group(group) {
            tasks.push((group, start, end));
        }
    }

    if tasks.is_empty() {
        tracing::info!("no ranges to recover for this route table");
        ctx.write_final_stats().context("writing stats.txt")?;
        return Ok(0);
    }

    let buckets = partition_tasks(tasks, ctx.config.nprocess);
    let exe = std::env::current_exe().context("resolving current executable")?;

    let mut units = Vec::with_capacity(buckets.len());
    let mut snapshot_paths = Vec::with_capacity(buckets.len());
    for (id, bucket) in buckets.into_iter().enumerate() {
        let worker_dir = scratch::worker_dir(&ctx.config.tmp_dir, id);
        fs::create_dir_all(&worker_dir).context("creating worker scratch dir")?;
        let out_path = worker_dir.join("counters");
        let command = spawn_worker_command(&exe, type_tag, &args, &bucket, ctx.config.since_timestamp, &out_path);
        units.push(WorkUnit { id, command });
        snapshot_paths.push(out_path);
    }

    tracing::info!(worker_count = units.len(), "fanning out recovery workers");
    let outcomes = WorkerPool::run(units, &ctx.monitor).context("running recovery worker pool")?;

    for (outcome, out_path) in outcomes.iter().zip(&snapshot_paths) {
        if outcome.succeeded {
            if let Err(e) = ctx.monitor.merge_snapshot_file(out_path) {
                tracing::warn!(worker_id = outcome.id, error = %e, "failed to read worker snapshot");
            }
        } else {
            tracing::warn!(worker_id = outcome.id, exit_code = ?outcome.exit_code, "worker did not complete successfully");
        }
    }

    ctx.write_final_stats().context("writing stats.txt")?;
    let transfer_count = ctx.monitor.diff_keys() as usize;

    if !WorkerPool::all_succeeded(&outcomes) {
        bail!("{type_tag} recovery failed: one or more workers exited non-zero (transfer_count so far: {transfer_count})");
    }

    tracing::info!(recovery_type = type_tag, transfer_count, "recovery complete");
    Ok(transfer_count)
}

/// Worker path: runs the assigned ranges through the real coordinator and
/// writes a counter snapshot for the parent to fold in. No lock is taken —
/// the parent already holds it for the run's tmp directory.
fn run_worker(recovery_type: RecoveryType, type_tag: &str, args: RecoveryArgs) -> Result<usize> {
    let route_table = parse_bootstrap_as_route(&args.bootstrap)?;
    let tmp_dir = args.tmp_dir_for(type_tag);
    let transport = LocalFsTransport::new(tmp_dir.clone());
    let monitor = Monitor::new(recovery_type.monitor_kind());
    let since = args.worker_since_epoch;

    let mut transfer_total = 0usize;
    for raw_task in &args.worker_tasks {
        let (group, start, end) =
            parse_worker_task(raw_task).with_context(|| format!("parsing worker task '{raw_task}'"))?;
        let range_tag = format!("{group}_{}_{}", &start.to_string()[..8], &end.to_string()[..8]);
        let addresses = route_table.nodes_in_group(group);
        if addresses.is_empty() {
            tracing::warn!(group, "no route entries for group, skipping task");
            continue;
        }

        match recovery_type {
            RecoveryType::Merge => {
                let addr = addresses[0];
                let local = transport
                    .iterate(addr, group, start, end, since.unwrap_or(0))
                    .with_context(|| format!("iterating {addr} for group {group}"))?;
                write_iter_trace(&scratch::iterator_path(&tmp_dir, addr, &range_tag), &local);

                let transfer_set = ringcask_recovery::merge::diff(&local, &local, since);
                write_id_list_trace(&scratch::diff_path(&tmp_dir, &range_tag), &transfer_set);

                // Only one known address per group until a real bootstrap
                // protocol reports more than one replica: source and
                // destination coincide, so the diff is correctly empty.
                let coordinator =
                    MergeCoordinator::new(&transport, monitor.clone(), args.batch_size, args.dry_run, args.safe_mode);
                let count = coordinator.run(addr, addr, &local, &local, since)?;
                write_manifest(&scratch::merge_path(&tmp_dir, &range_tag), count);
                transfer_total += count;
            }
            RecoveryType::Dc => {
                let mut replicas = Vec::with_capacity(addresses.len());
                for addr in &addresses {
                    let addr = *addr;
                    let records = transport
                        .iterate(addr, group, start, end, since.unwrap_or(0))
                        .with_context(|| format!("iterating {addr} for group {group}"))?;
                    write_iter_trace(&scratch::iterator_path(&tmp_dir, addr, &range_tag), &records);
                    replicas.push((addr.to_string(), records));
                }

                let instructions = ringcask_recovery::dc::diff(&replicas, since);
                let instruction_ids: Vec<Identifier> = instructions.iter().map(|i| i.id).collect();
                write_id_list_trace(&scratch::diff_path(&tmp_dir, &range_tag), &instruction_ids);

                let coordinator = DcCoordinator::new(&transport, monitor.clone(), args.batch_size, args.dry_run);
                let count = coordinator.run(&replicas, since)?;
                write_manifest(&scratch::merge_path(&tmp_dir, &range_tag), count);
                transfer_total += count;
            }
        }
    }

    let out_path = args
        .worker_out
        .as_ref()
        .context("worker invocation missing --worker-out")?;
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).context("creating worker output directory")?;
    }
    monitor.write_snapshot_file(out_path).context("writing worker snapshot")?;
    tracing::info!(recovery_type = type_tag, transfer_total, "worker task complete");
    Ok(transfer_total)
}

/// Runs `merge` recovery: recovery within a single ring. Dispatches to the
/// parent or worker path depending on whether `--worker-task` is set.
pub fn run_merge(args: RecoveryArgs) -> Result<usize> {
    if args.worker_tasks.is_empty() {
        run_parent(RecoveryType::Merge, "merge", args)
    } else {
        run_worker(RecoveryType::Merge, "merge", args)
    }
}

/// Runs `dc` recovery: replica reconciliation across rings. Same
/// parent/worker dispatch as [`run_merge`].
pub fn run_dc(args: RecoveryArgs) -> Result<usize> {
    if args.worker_tasks.is_empty() {
        run_parent(RecoveryType::Dc, "dc", args)
    } else {
        run_worker(RecoveryType::Dc, "dc", args)
    }
}

pub fn pause_for_exit() {
    use std::io::Write;
    print!("press enter to exit...");
    let _ = std::io::stdout().flush();
    let mut discard = String::new();
    let _ = std::io::stdin().read_line(&mut discard);
}
