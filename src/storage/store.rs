//! Per-file snapshot storage.

use crate::error::{HistoryError, Result};
use crate::storage::record;
use crate::types::{HistoryConfig, RetentionPolicy, Snapshot, Timestamp};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::{self, File};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extension for snapshot record files.
const RECORD_EXT: &str = "snap";

/// Longest sanitized file-stem prefix kept in a history directory name.
const STEM_PREFIX_MAX: usize = 48;

/// Persists and retrieves content snapshots, one history directory per
/// tracked source file.
///
/// On-disk layout:
/// ```text
/// root/
///   <stem>-<hash16>/          # one directory per source path
///     <micros>.snap           # one immutable record per snapshot
/// ```
///
/// The directory name is a pure function of the source path, so histories
/// for different files never collide and no path component of the source
/// file can traverse outside its own directory. The record file name is a
/// pure function of the timestamp; two saves that resolve to the same
/// timestamp collide deterministically (the later write replaces the
/// earlier via atomic rename).
///
/// The store itself is stateless between calls apart from a decode cache;
/// all per-viewing-session state lives in [`crate::HistorySession`].
pub struct SnapshotStore {
    /// Root under which all histories live.
    root: PathBuf,

    /// Retention policy applied after every save.
    retention: RetentionPolicy,

    /// LRU cache of decoded records keyed by (dir name, file-name micros),
    /// holding the body timestamp and content.
    cache: Mutex<LruCache<(String, i64), (i64, Vec<String>)>>,
}

impl SnapshotStore {
    /// Create a store rooted at `config.root`, creating the root if missing.
    pub fn new(config: HistoryConfig) -> Result<Self> {
        fs::create_dir_all(&config.root).map_err(|e| HistoryError::StorageWrite {
            path: config.root.clone(),
            source: e,
        })?;

        let cache_size = NonZeroUsize::new(config.cache_size.max(1)).unwrap();

        Ok(Self {
            root: config.root,
            retention: config.retention,
            cache: Mutex::new(LruCache::new(cache_size)),
        })
    }

    /// Capture `content` as a new snapshot for `source_path`.
    ///
    /// Creates the history directory on first save. The record is written to
    /// a temporary file, synced, then renamed into place, so on every exit
    /// path the history holds either the fully written new record or no new
    /// record at all. Retention is applied afterwards.
    pub fn save(&self, source_path: &Path, content: &[String]) -> Result<Snapshot> {
        let dir_name = self.dir_name(source_path)?;
        let dir = self.root.join(&dir_name);

        fs::create_dir_all(&dir).map_err(|e| HistoryError::StorageWrite {
            path: source_path.to_path_buf(),
            source: e,
        })?;

        // Keep per-file timestamps strictly increasing even if the clock
        // stalls or steps backwards.
        let mut timestamp = Timestamp::now();
        if let Some(newest) = list_timestamps(&dir).into_iter().max() {
            if timestamp.0 <= newest {
                timestamp = Timestamp(newest).next();
            }
        }

        let snapshot = Snapshot {
            timestamp,
            source_path: source_path.to_path_buf(),
            content: content.iter().map(|l| normalize_line(l)).collect(),
        };

        let final_path = dir.join(format!("{}.{}", timestamp.0, RECORD_EXT));
        let tmp_path = dir.join(format!(".{}.{}.tmp", timestamp.0, RECORD_EXT));

        if let Err(e) = write_record_file(&tmp_path, &final_path, &snapshot) {
            let _ = fs::remove_file(&tmp_path);
            return Err(HistoryError::StorageWrite {
                path: source_path.to_path_buf(),
                source: e,
            });
        }

        debug!(path = %source_path.display(), timestamp = timestamp.0, "Saved snapshot");

        self.cache.lock().put(
            (dir_name.clone(), timestamp.0),
            (timestamp.0, snapshot.content.clone()),
        );

        self.prune(&dir, &dir_name, source_path);

        Ok(snapshot)
    }

    /// Load all snapshots for `source_path`, sorted ascending by timestamp.
    ///
    /// A file with no history yields an empty vector, not an error.
    /// Individually malformed records are skipped and logged; duplicate
    /// records at one timestamp keep the first well-formed occurrence.
    pub fn load(&self, source_path: &Path) -> Result<Vec<Snapshot>> {
        let dir_name = self.dir_name(source_path)?;
        let dir = self.root.join(&dir_name);

        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut timestamps = list_timestamps_checked(&dir)?;
        timestamps.sort_unstable();

        let mut snapshots = Vec::with_capacity(timestamps.len());
        let mut seen: HashSet<i64> = HashSet::new();

        for micros in timestamps {
            match self.decode(&dir, &dir_name, source_path, micros) {
                Ok(snapshot) => {
                    if seen.insert(snapshot.timestamp.0) {
                        snapshots.push(snapshot);
                    } else {
                        warn!(
                            path = %source_path.display(),
                            timestamp = micros,
                            "Skipping duplicate snapshot record"
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        path = %source_path.display(),
                        timestamp = micros,
                        error = %e,
                        "Skipping malformed snapshot record"
                    );
                }
            }
        }

        // Record bodies own their timestamps, so a record copied under a
        // different file name decodes out of file-name order.
        snapshots.sort_by_key(|s| s.timestamp);

        Ok(snapshots)
    }

    /// The newest well-formed snapshot for `source_path`, if any.
    pub fn latest(&self, source_path: &Path) -> Result<Option<Snapshot>> {
        Ok(self.load(source_path)?.pop())
    }

    /// Remove the entire history for `source_path`.
    pub fn clear(&self, source_path: &Path) -> Result<()> {
        let dir_name = self.dir_name(source_path)?;
        let dir = self.root.join(&dir_name);

        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| HistoryError::StorageWrite {
                path: source_path.to_path_buf(),
                source: e,
            })?;
            info!(path = %source_path.display(), "Cleared history");
        }

        let mut cache = self.cache.lock();
        let stale: Vec<(String, i64)> = cache
            .iter()
            .filter(|((name, _), _)| *name == dir_name)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            cache.pop(&key);
        }

        Ok(())
    }

    /// The root location under which all histories live.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The retention policy applied at save time.
    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Decode one record, via the cache when possible.
    fn decode(
        &self,
        dir: &Path,
        dir_name: &str,
        source_path: &Path,
        micros: i64,
    ) -> Result<Snapshot> {
        if let Some((body_micros, content)) = self.cache.lock().get(&(dir_name.to_string(), micros))
        {
            return Ok(Snapshot {
                timestamp: Timestamp(*body_micros),
                source_path: source_path.to_path_buf(),
                content: content.clone(),
            });
        }

        let path = dir.join(format!("{}.{}", micros, RECORD_EXT));
        let mut file = File::open(&path)
            .map_err(|e| HistoryError::MalformedSnapshot(format!("Unreadable record: {}", e)))?;
        let decoded = record::read_record(&mut file)?;

        self.cache.lock().put(
            (dir_name.to_string(), micros),
            (decoded.timestamp.0, decoded.content.clone()),
        );

        // The record body carries its own timestamp; trust it for identity
        // so a renamed copy dedupes against the original.
        Ok(Snapshot {
            source_path: source_path.to_path_buf(),
            ..decoded
        })
    }

    /// Apply retention after a save. Failures here are logged, never fatal:
    /// the new snapshot is already durable.
    fn prune(&self, dir: &Path, dir_name: &str, source_path: &Path) {
        let mut timestamps = list_timestamps(dir);
        timestamps.sort_unstable();

        let mut evict: Vec<i64> = Vec::new();

        if let Some(max_age) = self.retention.max_age {
            for &micros in &timestamps {
                if Timestamp(micros).age() > max_age {
                    evict.push(micros);
                }
            }
        }

        if let Some(max_count) = self.retention.max_count {
            let remaining = timestamps.len() - evict.len();
            if remaining > max_count {
                let mut excess = remaining - max_count;
                for &micros in &timestamps {
                    if excess == 0 {
                        break;
                    }
                    if !evict.contains(&micros) {
                        evict.push(micros);
                        excess -= 1;
                    }
                }
            }
        }

        if evict.is_empty() {
            return;
        }

        let mut deleted = 0usize;
        for micros in evict {
            let path = dir.join(format!("{}.{}", micros, RECORD_EXT));
            match fs::remove_file(&path) {
                Ok(()) => {
                    self.cache.lock().pop(&(dir_name.to_string(), micros));
                    deleted += 1;
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to evict snapshot"
                    );
                }
            }
        }

        if deleted > 0 {
            info!(path = %source_path.display(), count = deleted, "Evicted old snapshots");
        }
    }

    /// Map a source path to its history directory name.
    ///
    /// The sanitized stem keeps the directory human-browsable; the hash
    /// suffix over the full path makes the mapping injective, so two paths
    /// that sanitize to the same stem still get distinct histories and no
    /// separator or `..` segment survives into the name.
    fn dir_name(&self, source_path: &Path) -> Result<String> {
        let stem = source_path
            .file_name()
            .ok_or_else(|| {
                HistoryError::InvalidPath(source_path.to_string_lossy().into_owned())
            })?
            .to_string_lossy();

        let sanitized: String = stem
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .take(STEM_PREFIX_MAX)
            .collect();

        let mut hasher = Sha256::new();
        hasher.update(source_path.to_string_lossy().as_bytes());
        let digest = hasher.finalize();

        Ok(format!("{}-{}", sanitized, hex::encode(&digest[..8])))
    }
}

/// Strip trailing newline characters so stored lines are comparison-safe.
fn normalize_line(line: &str) -> String {
    line.trim_end_matches('\n').trim_end_matches('\r').to_string()
}

/// Write, sync, and atomically publish one record file.
fn write_record_file(tmp: &Path, final_path: &Path, snapshot: &Snapshot) -> std::io::Result<()> {
    let mut file = File::create(tmp)?;
    record::write_record(&mut file, snapshot)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, final_path)
}

/// Record timestamps present in a history directory, unordered.
/// Unparseable names (temp files, strays) are ignored.
fn list_timestamps(dir: &Path) -> Vec<i64> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| parse_record_name(&entry.file_name().to_string_lossy()))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Like [`list_timestamps`] but a directory-level read failure is an error.
fn list_timestamps_checked(dir: &Path) -> Result<Vec<i64>> {
    let entries = fs::read_dir(dir).map_err(|e| HistoryError::StorageRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    Ok(entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| parse_record_name(&entry.file_name().to_string_lossy()))
        .collect())
}

fn parse_record_name(name: &str) -> Option<i64> {
    let stem = name.strip_suffix(&format!(".{}", RECORD_EXT))?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}
