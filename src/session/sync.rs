//! Serialized background writer for one profile
//!
//! Mutations hand their settled record sets to [`SyncHandle::submit`] and
//! return immediately. A single task per profile writes them one at a time;
//! while a write is in flight, newer snapshots of the same table replace the
//! queued ones so only the latest state reaches the store.

use crate::db::{ProfileStore, RecordSet};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Receives the outcome of each background save
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Handle to the writer task of one profile
pub struct SyncHandle {
    profile_id: String,
    tx: mpsc::UnboundedSender<RecordSet>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Start the writer. Must be called from within a tokio runtime.
    pub fn spawn(
        store: Arc<dyn ProfileStore>,
        profile_id: impl Into<String>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let profile_id = profile_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(store, profile_id.clone(), rx, notifier));
        Self {
            profile_id,
            tx,
            task,
        }
    }

    /// Queue a snapshot for writing; never blocks
    pub fn submit(&self, records: RecordSet) {
        if self.tx.send(records).is_err() {
            tracing::warn!(
                "Writer for profile '{}' has stopped; snapshot dropped",
                self.profile_id
            );
        }
    }

    /// Stop accepting snapshots and wait until everything queued is written
    pub async fn close(self) -> Result<()> {
        drop(self.tx);
        self.task
            .await
            .with_context(|| format!("Writer task for profile '{}' failed", self.profile_id))
    }
}

/// Fold `next` into `pending`, replacing any queued snapshot of the same table
fn coalesce(pending: &mut Vec<RecordSet>, next: RecordSet) {
    match pending.iter_mut().find(|queued| queued.table() == next.table()) {
        Some(queued) => *queued = next,
        None => pending.push(next),
    }
}

async fn run_writer(
    store: Arc<dyn ProfileStore>,
    profile_id: String,
    mut rx: mpsc::UnboundedReceiver<RecordSet>,
    notifier: Arc<dyn Notifier>,
) {
    while let Some(first) = rx.recv().await {
        let mut pending = vec![first];
        while let Ok(next) = rx.try_recv() {
            coalesce(&mut pending, next);
        }

        for records in pending {
            let table = records.table().table_name();
            match store.save(&profile_id, &records).await {
                Ok(()) => notifier.success(&format!("Saved {} for profile '{}'", table, profile_id)),
                Err(e) => notifier.error(&format!(
                    "Failed to save {} for profile '{}': {:#}",
                    table, profile_id, e
                )),
            }
        }
    }

    tracing::debug!("Writer for profile '{}' finished", profile_id);
}
