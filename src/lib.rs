//! # Local History
//!
//! A per-file local revision history engine: every save of a tracked file
//! persists a full-content snapshot, and the set of snapshots can be browsed
//! as a navigable log and diffed against the file's current content.
//!
//! ## Core Concepts
//!
//! - **Snapshots**: Immutable, timestamped full-content captures, one
//!   history directory per source file
//! - **Retention**: Count and/or age limits applied at save time, oldest
//!   snapshots evicted first
//! - **Graph**: A linear log layout of node and connector rows for a
//!   list-style viewer
//! - **Preview**: A line diff between the current buffer and a selected
//!   snapshot
//!
//! ## Example
//!
//! ```ignore
//! use local_history::{HistoryConfig, HistorySession, SimilarDiffer, SnapshotStore};
//!
//! let store = SnapshotStore::new(HistoryConfig {
//!     root: "./.local-history".into(),
//!     ..Default::default()
//! })?;
//!
//! // Persist the buffer on save
//! store.save("/home/user/notes.txt".as_ref(), &buffer_lines)?;
//!
//! // Open the viewer
//! let session = HistorySession::load(&store, "/home/user/notes.txt")?;
//! for row in session.graph() {
//!     println!("{}", row.render());
//! }
//!
//! // Preview the line under the cursor
//! if let Some(diff) = session.preview(&SimilarDiffer, &buffer_lines, &cursor_line) {
//!     render_diff(diff);
//! }
//! ```
//!
//! The crate is purely request/response: it never initiates editor actions,
//! and no failure here is fatal to the host process.

pub mod error;
pub mod graph;
pub mod preview;
pub mod session;
pub mod storage;
pub mod types;
pub mod worker;

// Re-exports
pub use error::{HistoryError, Result};
pub use graph::{build_graph, resolve_row, GraphRow};
pub use preview::{render_preview, DiffLine, DiffTag, LineDiffer, SimilarDiffer};
pub use session::HistorySession;
pub use storage::SnapshotStore;
pub use types::{HistoryConfig, RetentionPolicy, Snapshot, Timestamp};
pub use worker::{HistoryWorker, TaskHandle};
