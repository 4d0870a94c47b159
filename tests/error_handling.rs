//! Failure-path tests: corrupt records, blocked directories, bad paths.

use local_history::{
    HistoryConfig, HistoryError, HistoryWorker, RetentionPolicy, SnapshotStore,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn test_store(dir: &TempDir) -> SnapshotStore {
    SnapshotStore::new(HistoryConfig {
        root: dir.path().join("history"),
        retention: RetentionPolicy::unlimited(),
        cache_size: 100,
    })
    .unwrap()
}

/// The single history directory under the store root.
fn history_dir(store: &SnapshotStore) -> PathBuf {
    fs::read_dir(store.root())
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path()
}

#[test]
fn test_save_into_blocked_directory_is_storage_write() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let path = Path::new("/f.txt");

    store.save(path, &lines(&["x"])).unwrap();

    // Replace the history directory with a regular file so the next save
    // cannot recreate it.
    let blocked = history_dir(&store);
    fs::remove_dir_all(&blocked).unwrap();
    fs::write(&blocked, b"").unwrap();

    let err = store.save(path, &lines(&["y"])).unwrap_err();
    assert!(matches!(err, HistoryError::StorageWrite { .. }));
}

#[test]
fn test_load_unreadable_directory_is_storage_read() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let path = Path::new("/f.txt");

    store.save(path, &lines(&["x"])).unwrap();

    let blocked = history_dir(&store);
    fs::remove_dir_all(&blocked).unwrap();
    fs::write(&blocked, b"").unwrap();

    // The location exists but cannot be listed.
    let err = store.load(path).unwrap_err();
    assert!(matches!(err, HistoryError::StorageRead { .. }));
}

#[test]
fn test_corrupt_record_does_not_poison_history() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let path = Path::new("/f.txt");

    let good = store.save(path, &lines(&["good"])).unwrap();

    let history = history_dir(&store);
    fs::write(history.join("1.snap"), b"garbage").unwrap();
    fs::write(history.join("2.snap"), b"\x00\x00\x00").unwrap();

    // Corrupt neighbors get skipped; the well-formed record survives.
    let loaded = store.load(path).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].timestamp, good.timestamp);

    let latest = store.latest(path).unwrap().unwrap();
    assert_eq!(latest.timestamp, good.timestamp);
}

#[test]
fn test_truncated_record_skipped() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let path = Path::new("/f.txt");

    store.save(path, &lines(&["only"])).unwrap();

    // Cut the one record short of its checksum.
    let history = history_dir(&store);
    let record = fs::read_dir(&history)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let bytes = fs::read(&record).unwrap();
    fs::write(&record, &bytes[..bytes.len() - 2]).unwrap();

    // Reopen so the read goes to disk, not the decode cache. The history
    // degrades to empty rather than erroring.
    let reopened = SnapshotStore::new(HistoryConfig {
        root: store.root().to_path_buf(),
        retention: RetentionPolicy::unlimited(),
        cache_size: 100,
    })
    .unwrap();
    assert!(reopened.load(path).unwrap().is_empty());
    assert!(reopened.latest(path).unwrap().is_none());
}

#[test]
fn test_stray_files_in_history_directory_ignored() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let path = Path::new("/f.txt");

    store.save(path, &lines(&["real"])).unwrap();

    let history = history_dir(&store);
    fs::write(history.join("notes.txt"), b"unrelated").unwrap();
    fs::write(history.join(".12345.snap.tmp"), b"leftover temp").unwrap();
    fs::write(history.join("abc.snap"), b"non-numeric stem").unwrap();

    let loaded = store.load(path).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].content, lines(&["real"]));
}

#[test]
fn test_paths_without_file_name_rejected() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    for bad in ["/", ""] {
        let err = store.save(Path::new(bad), &lines(&["x"])).unwrap_err();
        assert!(matches!(err, HistoryError::InvalidPath(_)), "{:?}", bad);
    }
}

#[test]
fn test_worker_propagates_errors() {
    let dir = TempDir::new().unwrap();
    let worker = HistoryWorker::spawn(Arc::new(test_store(&dir)));

    let result = worker.save("/", lines(&["x"])).recv().unwrap();
    assert!(matches!(result, Err(HistoryError::InvalidPath(_))));
}

#[test]
fn test_error_messages_name_the_path() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let err = store
        .save(Path::new("/f.txt"), &lines(&["x"]))
        .and_then(|_| {
            let blocked = history_dir(&store);
            fs::remove_dir_all(&blocked).unwrap();
            fs::write(&blocked, b"").unwrap();
            store.save(Path::new("/f.txt"), &lines(&["y"]))
        })
        .unwrap_err();

    assert!(err.to_string().contains("/f.txt"));
}
