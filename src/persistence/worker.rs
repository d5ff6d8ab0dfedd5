//! # Save Worker
//!
//! Fire-and-forget persistence on the tokio runtime.
//!
//! The engine hands snapshots to a [`SaveHandle`] and moves on; a background
//! task drains the queue, keeps only the newest snapshot, and writes it
//! through the [`ProgressionStore`] on the blocking pool. Each attempt is
//! bounded by a timeout and failed attempts are retried with linear backoff.
//! Nothing on this path can stall a turn.
//!
//! A blocking write cannot be cancelled. When an attempt times out, the next
//! retry waits on that same write instead of starting another one behind the
//! store lock. A write still running when the worker gives up keeps the lock
//! until it returns, so the next snapshot's first attempt waits for it.

use super::{ProgressionStore, SaveData};
use crate::{BattleError, BattleResult};
use log::{debug, error, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Timeout and retry settings for the save worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavePolicy {
    /// Upper bound on one save attempt
    pub timeout: Duration,
    /// Extra attempts after the first failure
    pub max_retries: u32,
    /// Delay before retry `n` is `backoff * n`
    pub backoff: Duration,
}

impl Default for SavePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            max_retries: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

/// What the worker did before its queue closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: u32,
    pub failed: u32,
    /// Snapshots dropped because a newer one was already queued
    pub coalesced: u32,
}

/// Sending half of the save queue. Cheap to clone; never blocks.
#[derive(Debug, Clone)]
pub struct SaveHandle {
    tx: mpsc::UnboundedSender<SaveData>,
}

impl SaveHandle {
    /// Queues a snapshot. Returns false once the worker has shut down.
    pub fn submit(&self, data: SaveData) -> bool {
        match self.tx.send(data) {
            Ok(()) => true,
            Err(_) => {
                warn!("Save worker is gone, snapshot dropped");
                false
            }
        }
    }
}

/// Receiving half of a save queue that no worker drains.
///
/// Lets callers observe what would have been saved.
#[derive(Debug)]
pub struct SaveQueue {
    rx: mpsc::UnboundedReceiver<SaveData>,
}

impl SaveQueue {
    /// Takes the next queued snapshot without waiting.
    pub fn try_next(&mut self) -> Option<SaveData> {
        self.rx.try_recv().ok()
    }

    /// Drains everything queued so far.
    pub fn drain(&mut self) -> Vec<SaveData> {
        let mut drained = Vec::new();
        while let Some(data) = self.try_next() {
            drained.push(data);
        }
        drained
    }
}

/// Creates a save queue without a worker behind it.
pub fn save_channel() -> (SaveHandle, SaveQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SaveHandle { tx }, SaveQueue { rx })
}

/// Background task that writes queued snapshots.
pub struct SaveWorker;

impl SaveWorker {
    /// Spawns the worker on the current tokio runtime.
    ///
    /// The worker exits once every [`SaveHandle`] has been dropped and the
    /// queue is empty; its join handle yields a [`SaveReport`].
    pub fn spawn<S>(store: S, policy: SavePolicy) -> (SaveHandle, JoinHandle<SaveReport>)
    where
        S: ProgressionStore + 'static,
    {
        let (handle, queue) = save_channel();
        let store = Arc::new(Mutex::new(store));
        let task = tokio::spawn(Self::run(store, queue.rx, policy));
        (handle, task)
    }

    async fn run<S>(
        store: Arc<Mutex<S>>,
        mut rx: mpsc::UnboundedReceiver<SaveData>,
        policy: SavePolicy,
    ) -> SaveReport
    where
        S: ProgressionStore + 'static,
    {
        let mut report = SaveReport::default();

        while let Some(mut data) = rx.recv().await {
            while let Ok(newer) = rx.try_recv() {
                data = newer;
                report.coalesced += 1;
            }

            if Self::save_with_retry(&store, data, policy).await {
                report.saved += 1;
            } else {
                report.failed += 1;
            }
        }

        debug!(
            "Save worker finished: {} saved, {} failed, {} coalesced",
            report.saved, report.failed, report.coalesced
        );
        report
    }

    async fn save_with_retry<S>(store: &Arc<Mutex<S>>, data: SaveData, policy: SavePolicy) -> bool
    where
        S: ProgressionStore + 'static,
    {
        let mut stuck: Option<JoinHandle<BattleResult<()>>> = None;

        for attempt in 0..=policy.max_retries {
            let mut task = match stuck.take() {
                Some(task) => {
                    debug!("Save attempt {} waits on the previous write", attempt + 1);
                    task
                }
                None => {
                    let store = Arc::clone(store);
                    let snapshot = data.clone();
                    tokio::task::spawn_blocking(move || {
                        let mut guard = store
                            .lock()
                            .map_err(|_| BattleError::Persistence("store lock poisoned".to_string()))?;
                        guard.save(&snapshot)
                    })
                }
            };

            match tokio::time::timeout(policy.timeout, &mut task).await {
                Ok(Ok(Ok(()))) => return true,
                Ok(Ok(Err(e))) => warn!("Save attempt {} failed: {}", attempt + 1, e),
                Ok(Err(e)) => warn!("Save attempt {} panicked: {}", attempt + 1, e),
                Err(_) => {
                    warn!(
                        "Save attempt {} timed out after {:?}",
                        attempt + 1,
                        policy.timeout
                    );
                    stuck = Some(task);
                }
            }

            if attempt < policy.max_retries {
                tokio::time::sleep(policy.backoff * (attempt + 1)).await;
            }
        }

        error!(
            "Giving up on save after {} attempts",
            policy.max_retries + 1
        );
        false
    }
}
