// Timestamps stored in MiniVSFS metadata are whole seconds since the Unix epoch

use chrono::{DateTime, Utc};

/// Current time as stored in superblock and inode timestamp fields.
pub fn now_epoch() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Human-readable rendering of a stored timestamp.
pub fn format_epoch(seconds: u64) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("{} (out of range)", seconds))
}
