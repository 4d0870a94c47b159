//! Core types for the local history engine.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Microseconds since Unix epoch.
///
/// Together with the source path this is the persisted identity of a
/// snapshot. Within one file's history timestamps are strictly increasing.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards");
        Timestamp(duration.as_micros() as i64)
    }

    /// The next representable instant (one microsecond later).
    pub fn next(self) -> Self {
        Timestamp(self.0 + 1)
    }

    /// Age of this timestamp relative to now. Zero if it lies in the future.
    pub fn age(self) -> Duration {
        let now = Timestamp::now();
        if now.0 > self.0 {
            Duration::from_micros((now.0 - self.0) as u64)
        } else {
            Duration::ZERO
        }
    }

    /// Human-readable UTC form used in graph labels.
    pub fn display(self) -> String {
        match DateTime::from_timestamp_micros(self.0) {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format!("@{}", self.0),
        }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// An immutable full-content capture of one file at one point in time.
///
/// Content is the complete ordered line sequence at save time, not a diff:
/// both preview and revert operate on full content. Trailing newlines are
/// stripped before storage so comparisons are unambiguous.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the snapshot was taken. Identity and sort key within one file.
    pub timestamp: Timestamp,

    /// Absolute path of the file this snapshot belongs to.
    pub source_path: PathBuf,

    /// Full line content captured at save time.
    pub content: Vec<String>,
}

/// How many and how old snapshots are kept per file before eviction.
///
/// Applied at save time; when exceeded, the oldest snapshots are deleted
/// first. `None` means unlimited.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Maximum number of snapshots per file.
    pub max_count: Option<usize>,

    /// Maximum age of a snapshot.
    pub max_age: Option<Duration>,
}

impl RetentionPolicy {
    /// Keep everything forever.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Keep at most the `n` most recent snapshots.
    pub fn keep_last(n: usize) -> Self {
        Self {
            max_count: Some(n),
            max_age: None,
        }
    }

    /// Drop snapshots older than `age`.
    pub fn max_age(age: Duration) -> Self {
        Self {
            max_count: None,
            max_age: Some(age),
        }
    }
}

/// Store configuration, consumed from the editor layer's own config file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Root location under which all per-file histories live.
    pub root: PathBuf,

    /// Retention policy applied at save time.
    pub retention: RetentionPolicy,

    /// Decoded-snapshot cache size (number of snapshots).
    pub cache_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./.local-history"),
            retention: RetentionPolicy::unlimited(),
            cache_size: 100,
        }
    }
}
