//! Per-view session state.
//!
//! A session owns the short-lived `index -> Snapshot` mapping built when a
//! history is loaded for viewing. Indices are a view convenience, never
//! persisted identity; they are recomputed on every load. Two sessions over
//! the same file are fully independent, so two viewer panes cannot corrupt
//! each other's mapping.

use crate::error::Result;
use crate::graph::{self, GraphRow};
use crate::preview::{self, DiffLine, LineDiffer};
use crate::storage::SnapshotStore;
use crate::types::Snapshot;
use std::path::{Path, PathBuf};

/// One viewing session over one file's history.
pub struct HistorySession {
    source_path: PathBuf,

    /// Snapshots in load order (ascending timestamp). Display index `i`
    /// refers to `snapshots[i - 1]`.
    snapshots: Vec<Snapshot>,
}

impl HistorySession {
    /// Load the history for `source_path` and assign display indices 1..=N
    /// in ascending-timestamp order.
    pub fn load(store: &SnapshotStore, source_path: impl AsRef<Path>) -> Result<Self> {
        let source_path = source_path.as_ref().to_path_buf();
        let snapshots = store.load(&source_path)?;

        Ok(Self {
            source_path,
            snapshots,
        })
    }

    /// The file this session views.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Number of snapshots in the session.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the file has no history.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// All snapshots in display order.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Look up a snapshot by its 1-based display index.
    pub fn snapshot(&self, index: usize) -> Option<&Snapshot> {
        if index == 0 {
            return None;
        }
        self.snapshots.get(index - 1)
    }

    /// Build the renderable log rows for this session.
    pub fn graph(&self) -> Vec<GraphRow> {
        graph::build_graph(&self.snapshots)
    }

    /// Resolve a rendered viewer line back to its snapshot.
    ///
    /// Connector lines and anything else without a node index yield `None`;
    /// that is the defined no-op for cursor-on-connector selections.
    pub fn resolve_line(&self, line: &str) -> Option<&Snapshot> {
        graph::resolve_row(line).and_then(|index| self.snapshot(index))
    }

    /// Preview the selected line against the current buffer content.
    ///
    /// `None` when the line does not resolve to a snapshot; no error, no
    /// render.
    pub fn preview<D: LineDiffer + ?Sized>(
        &self,
        differ: &D,
        current: &[String],
        line: &str,
    ) -> Option<Vec<DiffLine>> {
        self.resolve_line(line)
            .map(|snapshot| preview::render_preview(differ, current, snapshot))
    }

    /// Content the editor writes back into the buffer when reverting to the
    /// selected line's snapshot.
    ///
    /// The revert itself records no snapshot; the next regular save
    /// historizes the reverted content.
    pub fn revert_content(&self, line: &str) -> Option<&[String]> {
        self.resolve_line(line)
            .map(|snapshot| snapshot.content.as_slice())
    }
}
