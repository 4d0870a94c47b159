//! Diff preview between current file content and a selected snapshot.
//!
//! This module owns no diff algorithm. It selects which two line sequences
//! to compare and adapts the result into annotated lines; the actual
//! line-level diff sits behind [`LineDiffer`].

use crate::types::Snapshot;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

/// Per-line annotation, enough for a presentation layer to pick a style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffTag {
    Equal,
    Added,
    Removed,
}

/// One annotated line of a preview.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub tag: DiffTag,
    pub text: String,
}

/// External line-diff seam: takes two line sequences, returns annotated
/// lines in display order.
pub trait LineDiffer {
    fn diff(&self, a: &[String], b: &[String]) -> Vec<DiffLine>;
}

/// Default differ backed by the `similar` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimilarDiffer;

impl LineDiffer for SimilarDiffer {
    fn diff(&self, a: &[String], b: &[String]) -> Vec<DiffLine> {
        let old = a.join("\n");
        let new = b.join("\n");
        let diff = TextDiff::from_lines(&old, &new);

        diff.iter_all_changes()
            .map(|change| DiffLine {
                tag: match change.tag() {
                    ChangeTag::Equal => DiffTag::Equal,
                    ChangeTag::Insert => DiffTag::Added,
                    ChangeTag::Delete => DiffTag::Removed,
                },
                text: change.value().trim_end_matches('\n').to_string(),
            })
            .collect()
    }
}

/// Compute the preview for a selected snapshot.
///
/// Direction is fixed: the current buffer is the `a` side, the snapshot
/// content the `b` side. `Removed` therefore marks a line reverting would
/// remove from the buffer, `Added` a line reverting would bring back.
/// Identical inputs yield only `Equal` lines.
pub fn render_preview<D: LineDiffer + ?Sized>(
    differ: &D,
    current: &[String],
    snapshot: &Snapshot,
) -> Vec<DiffLine> {
    differ.diff(current, &snapshot.content)
}
