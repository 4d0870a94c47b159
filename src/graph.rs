//! History log layout: snapshots to renderable rows.
//!
//! The history model is strictly linear: every snapshot has exactly one
//! logical predecessor, the snapshot immediately before it in timestamp
//! order. Connector rows are cosmetic rails between nodes, not branch or
//! merge indicators.

use crate::types::Snapshot;
use serde::{Deserialize, Serialize};

/// One line of the renderable log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphRow {
    /// References a snapshot via its 1-based display index.
    Node {
        /// Display index assigned at load time, valid for one session only.
        index: usize,
        /// Human-readable timestamp shown next to the index.
        label: String,
    },
    /// Purely visual line between two node rows.
    Connector,
}

impl GraphRow {
    /// Render this row as the exact line a list viewer displays.
    ///
    /// Node lines embed the index in brackets so [`resolve_row`] can recover
    /// it from the text alone, with no side-channel state.
    pub fn render(&self) -> String {
        match self {
            GraphRow::Node { index, label } => format!("* [{}] {}", index, label),
            GraphRow::Connector => "|".to_string(),
        }
    }

    /// Whether this row references a snapshot.
    pub fn is_node(&self) -> bool {
        matches!(self, GraphRow::Node { .. })
    }
}

/// Build the row sequence for an ordered snapshot list.
///
/// Rows come out in the same order as the input (oldest first, matching
/// `SnapshotStore::load`): one node per snapshot, exactly one connector
/// between consecutive nodes. `2N - 1` rows for N >= 1, empty for N = 0.
pub fn build_graph(snapshots: &[Snapshot]) -> Vec<GraphRow> {
    let mut rows = Vec::with_capacity(snapshots.len().saturating_mul(2).saturating_sub(1));

    for (i, snapshot) in snapshots.iter().enumerate() {
        if i > 0 {
            rows.push(GraphRow::Connector);
        }
        rows.push(GraphRow::Node {
            index: i + 1,
            label: snapshot.timestamp.display(),
        });
    }

    rows
}

/// Recover a node's display index from a rendered line.
///
/// Returns `None` for connector rows and anything else that does not carry
/// a bracketed index; that is a defined no-op for callers, not an error.
pub fn resolve_row(line: &str) -> Option<usize> {
    let start = line.find('[')?;
    let rest = &line[start + 1..];
    let end = rest.find(']')?;
    let digits = &rest[..end];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}
