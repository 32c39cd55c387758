//! Parser for the `-t` time-window spec: epoch seconds, or a relative
//! duration like `12h`/`1d`/`4w`.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{RecoveryError, Result};

/// Parses a `-t` argument into an absolute epoch-seconds cutoff.
///
/// Accepts a bare integer (interpreted as epoch seconds) or `<N><unit>`
/// where unit is `h` (hours), `d` (days), or `w` (weeks) — interpreted as
/// "now minus N units".
pub fn parse_timestamp_spec(spec: &str, now: u64) -> Result<u64> {
    if let Ok(epoch) = spec.parse::<u64>() {
        return Ok(epoch);
    }

    let (num_part, unit) = spec.split_at(spec.len().saturating_sub(1));
    let n: u64 = num_part
        .parse()
        .map_err(|_| RecoveryError::Config(format!("unparseable timestamp spec: {spec}")))?;

    let seconds_per_unit = match unit {
        "h" => 3600,
        "d" => 86_400,
        "w" => 604_800,
        other => {
            return Err(RecoveryError::Config(format!(
                "unknown time-window unit '{other}' in spec '{spec}'"
            )))
        }
    };

    let cutoff = now.saturating_sub(n * seconds_per_unit);
    tracing::debug!(spec, now, cutoff, "resolved time-window spec");
    Ok(cutoff)
}

/// Current wall-clock time in epoch seconds, for callers that don't need
/// a fixed `now` for testing.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}
