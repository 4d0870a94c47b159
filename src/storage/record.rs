//! On-disk snapshot record codec.
//!
//! One record file holds one immutable snapshot. The timestamp doubles as
//! the file name, so it is recoverable without parsing the record body; the
//! body carries it again so a renamed or copied file is detectable.

use crate::error::{HistoryError, Result};
use crate::types::{Snapshot, Timestamp};
use std::io::{Read, Write};
use std::path::PathBuf;

/// Magic bytes for snapshot record files.
const RECORD_MAGIC: &[u8; 4] = b"LHS\0";

/// Current record format version.
const RECORD_VERSION: u8 = 1;

/// Longest source path accepted in a record header.
const MAX_PATH_LEN: usize = 1 << 20;

/// Longest single line accepted in a record body. Decoding trusts length
/// prefixes only up to this bound, so a corrupt prefix cannot force a
/// multi-gigabyte allocation.
const MAX_LINE_LEN: usize = 1 << 24;

/// Write a snapshot record to `w`.
pub fn write_record<W: Write>(w: &mut W, snapshot: &Snapshot) -> std::io::Result<()> {
    w.write_all(RECORD_MAGIC)?;
    w.write_all(&[RECORD_VERSION])?;

    w.write_all(&snapshot.timestamp.0.to_le_bytes())?;

    let path_bytes = snapshot.source_path.to_string_lossy();
    let path_bytes = path_bytes.as_bytes();
    if path_bytes.len() > MAX_PATH_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "source path too long for record header",
        ));
    }
    w.write_all(&(path_bytes.len() as u32).to_le_bytes())?;
    w.write_all(path_bytes)?;

    w.write_all(&(snapshot.content.len() as u32).to_le_bytes())?;
    for line in &snapshot.content {
        let bytes = line.as_bytes();
        w.write_all(&(bytes.len() as u32).to_le_bytes())?;
        w.write_all(bytes)?;
    }

    let checksum = content_checksum(&snapshot.content);
    w.write_all(&checksum.to_le_bytes())?;

    Ok(())
}

/// Read a snapshot record from `r`.
///
/// Any failure here means the record is individually corrupt; callers skip
/// it and keep loading the rest of the history.
pub fn read_record<R: Read>(r: &mut R) -> Result<Snapshot> {
    let mut magic = [0u8; 4];
    read_exact(r, &mut magic)?;
    if &magic != RECORD_MAGIC {
        return Err(HistoryError::MalformedSnapshot(
            "Invalid record magic".into(),
        ));
    }

    let mut version = [0u8; 1];
    read_exact(r, &mut version)?;
    if version[0] != RECORD_VERSION {
        return Err(HistoryError::MalformedSnapshot(format!(
            "Unsupported record version: {}",
            version[0]
        )));
    }

    let mut ts_bytes = [0u8; 8];
    read_exact(r, &mut ts_bytes)?;
    let timestamp = Timestamp(i64::from_le_bytes(ts_bytes));

    let mut path_len_bytes = [0u8; 4];
    read_exact(r, &mut path_len_bytes)?;
    let path_len = u32::from_le_bytes(path_len_bytes) as usize;
    if path_len > MAX_PATH_LEN {
        return Err(HistoryError::MalformedSnapshot(format!(
            "Path length {} exceeds limit",
            path_len
        )));
    }
    let mut path_bytes = vec![0u8; path_len];
    read_exact(r, &mut path_bytes)?;
    let source_path = PathBuf::from(String::from_utf8_lossy(&path_bytes).into_owned());

    let mut count_bytes = [0u8; 4];
    read_exact(r, &mut count_bytes)?;
    let line_count = u32::from_le_bytes(count_bytes) as usize;

    let mut content = Vec::with_capacity(line_count.min(1 << 16));
    for _ in 0..line_count {
        let mut len_bytes = [0u8; 4];
        read_exact(r, &mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_LINE_LEN {
            return Err(HistoryError::MalformedSnapshot(format!(
                "Line length {} exceeds limit",
                len
            )));
        }
        let mut line_bytes = vec![0u8; len];
        read_exact(r, &mut line_bytes)?;
        let line = String::from_utf8(line_bytes)
            .map_err(|e| HistoryError::MalformedSnapshot(format!("Invalid UTF-8 line: {}", e)))?;
        content.push(line);
    }

    let mut checksum_bytes = [0u8; 4];
    read_exact(r, &mut checksum_bytes)?;
    let stored = u32::from_le_bytes(checksum_bytes);
    let computed = content_checksum(&content);
    if stored != computed {
        return Err(HistoryError::MalformedSnapshot(format!(
            "Checksum mismatch: expected {}, got {}",
            stored, computed
        )));
    }

    Ok(Snapshot {
        timestamp,
        source_path,
        content,
    })
}

/// CRC32 over the joined content, line boundaries included.
fn content_checksum(content: &[String]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for line in content {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize()
}

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf)
        .map_err(|e| HistoryError::MalformedSnapshot(format!("Truncated record: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot {
            timestamp: Timestamp(1_700_000_000_000_000),
            source_path: PathBuf::from("/home/user/notes.txt"),
            content: vec!["alpha".to_string(), "beta".to_string(), String::new()],
        }
    }

    #[test]
    fn test_roundtrip() {
        let snapshot = sample();
        let mut buf = Vec::new();
        write_record(&mut buf, &snapshot).unwrap();

        let decoded = read_record(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_empty_content() {
        let snapshot = Snapshot {
            content: Vec::new(),
            ..sample()
        };
        let mut buf = Vec::new();
        write_record(&mut buf, &snapshot).unwrap();

        let decoded = read_record(&mut buf.as_slice()).unwrap();
        assert!(decoded.content.is_empty());
    }

    #[test]
    fn test_bad_magic() {
        let mut buf = Vec::new();
        write_record(&mut buf, &sample()).unwrap();
        buf[0] = b'X';

        let err = read_record(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, HistoryError::MalformedSnapshot(_)));
    }

    #[test]
    fn test_truncated() {
        let mut buf = Vec::new();
        write_record(&mut buf, &sample()).unwrap();
        buf.truncate(buf.len() / 2);

        let err = read_record(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, HistoryError::MalformedSnapshot(_)));
    }

    #[test]
    fn test_overlong_path_rejected_at_write() {
        let snapshot = Snapshot {
            source_path: PathBuf::from("a".repeat(MAX_PATH_LEN + 1)),
            ..sample()
        };
        let mut buf = Vec::new();

        let err = write_record(&mut buf, &snapshot).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_long_path_roundtrip() {
        // Longer than any u16 prefix could have carried.
        let snapshot = Snapshot {
            source_path: PathBuf::from(format!("/deep/{}.txt", "d".repeat(66_000))),
            ..sample()
        };
        let mut buf = Vec::new();
        write_record(&mut buf, &snapshot).unwrap();

        let decoded = read_record(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded.source_path, snapshot.source_path);
    }

    #[test]
    fn test_huge_declared_line_length_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(RECORD_MAGIC);
        buf.push(RECORD_VERSION);
        buf.extend_from_slice(&1_700_000_000_000_000i64.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(b"/f");
        buf.extend_from_slice(&1u32.to_le_bytes());
        // One line claiming close to 4 GiB.
        buf.extend_from_slice(&u32::MAX.to_le_bytes());

        let err = read_record(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, HistoryError::MalformedSnapshot(_)));
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn test_huge_declared_path_length_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(RECORD_MAGIC);
        buf.push(RECORD_VERSION);
        buf.extend_from_slice(&1_700_000_000_000_000i64.to_le_bytes());
        buf.extend_from_slice(&u32::MAX.to_le_bytes());

        let err = read_record(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, HistoryError::MalformedSnapshot(_)));
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn test_corrupted_line_fails_checksum() {
        let snapshot = sample();
        let mut buf = Vec::new();
        write_record(&mut buf, &snapshot).unwrap();

        // Flip a byte inside "alpha"
        let pos = buf
            .windows(5)
            .position(|w| w == b"alpha")
            .expect("content present");
        buf[pos] = b'o';

        let err = read_record(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, HistoryError::MalformedSnapshot(_)));
    }
}
