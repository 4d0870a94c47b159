//! Background execution of storage I/O.
//!
//! Disk operations may block and must stay off the thread handling
//! interactive input. The worker owns a dedicated thread fed by a channel;
//! each request returns a [`TaskHandle`] the caller can block on, poll, or
//! simply drop. Dropping the handle abandons the result without affecting
//! store consistency, which never depends on the caller waiting.

use crate::error::Result;
use crate::storage::SnapshotStore;
use crate::types::Snapshot;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// A storage request queued for the worker thread.
enum Job {
    Save {
        path: PathBuf,
        content: Vec<String>,
        reply: Sender<Result<Snapshot>>,
    },
    Load {
        path: PathBuf,
        reply: Sender<Result<Vec<Snapshot>>>,
    },
    Clear {
        path: PathBuf,
        reply: Sender<Result<()>>,
    },
}

/// Receiving side of one queued storage operation.
pub struct TaskHandle<T> {
    receiver: Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Block until the operation completes.
    pub fn recv(&self) -> std::result::Result<Result<T>, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Check for a result without blocking.
    pub fn try_recv(&self) -> std::result::Result<Result<T>, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block with a timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<Result<T>, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Dedicated I/O thread in front of a [`SnapshotStore`].
pub struct HistoryWorker {
    sender: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    store: Arc<SnapshotStore>,
}

impl HistoryWorker {
    /// Spawn the worker thread for `store`.
    pub fn spawn(store: Arc<SnapshotStore>) -> Self {
        let (sender, receiver) = unbounded::<Job>();
        let thread_store = Arc::clone(&store);

        let handle = thread::Builder::new()
            .name("local-history-io".to_string())
            .spawn(move || {
                for job in receiver {
                    match job {
                        Job::Save {
                            path,
                            content,
                            reply,
                        } => {
                            // A failed send means the caller abandoned the
                            // task; the write already completed either way.
                            let _ = reply.send(thread_store.save(&path, &content));
                        }
                        Job::Load { path, reply } => {
                            let _ = reply.send(thread_store.load(&path));
                        }
                        Job::Clear { path, reply } => {
                            let _ = reply.send(thread_store.clear(&path));
                        }
                    }
                }
                debug!("History worker stopped");
            })
            .expect("Failed to spawn history worker thread");

        Self {
            sender: Some(sender),
            handle: Some(handle),
            store,
        }
    }

    /// The store this worker serves, for direct synchronous access.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Queue a save of `content` for `path`.
    pub fn save(&self, path: impl Into<PathBuf>, content: Vec<String>) -> TaskHandle<Snapshot> {
        let (reply, receiver) = bounded(1);
        self.submit(Job::Save {
            path: path.into(),
            content,
            reply,
        });
        TaskHandle { receiver }
    }

    /// Queue a load of the full history for `path`.
    pub fn load(&self, path: impl Into<PathBuf>) -> TaskHandle<Vec<Snapshot>> {
        let (reply, receiver) = bounded(1);
        self.submit(Job::Load {
            path: path.into(),
            reply,
        });
        TaskHandle { receiver }
    }

    /// Queue removal of the entire history for `path`.
    pub fn clear(&self, path: impl Into<PathBuf>) -> TaskHandle<()> {
        let (reply, receiver) = bounded(1);
        self.submit(Job::Clear {
            path: path.into(),
            reply,
        });
        TaskHandle { receiver }
    }

    fn submit(&self, job: Job) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(job);
        }
    }
}

impl Drop for HistoryWorker {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain queued jobs and exit.
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
