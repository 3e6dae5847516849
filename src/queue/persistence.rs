// Background queue persistence
// Playback never waits on the database: the board submits jobs and a worker
// task writes them out after a short delay, dropping superseded writes.
use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::MultiQueue;
use crate::db::{DatabaseConnection, DbOperations};

#[derive(Debug, Clone)]
pub enum PersistJob {
    /// Header plus every song row
    SaveSongs(MultiQueue),
    /// Header fields only (position, shuffle flag, title...)
    SaveHeader(MultiQueue),
    /// Board order changed: reindex headers and drop queues not listed
    SaveAll(Vec<MultiQueue>),
    Delete(i64),
}

impl PersistJob {
    fn describe(&self) -> String {
        match self {
            PersistJob::SaveSongs(mq) => format!("save queue {}", mq.id),
            PersistJob::SaveHeader(mq) => format!("update queue {}", mq.id),
            PersistJob::SaveAll(mqs) => format!("update {} queues", mqs.len()),
            PersistJob::Delete(id) => format!("delete queue {id}"),
        }
    }
}

/// Drop jobs whose effect is overwritten by a later job in the same batch.
///
/// Relative order of the surviving jobs is preserved.
pub(crate) fn coalesce(jobs: Vec<PersistJob>) -> Vec<PersistJob> {
    let mut full: HashSet<i64> = HashSet::new();
    let mut header: HashSet<i64> = HashSet::new();
    let mut bulk_seen = false;
    let mut kept = Vec::with_capacity(jobs.len());

    for job in jobs.into_iter().rev() {
        let keep = match &job {
            PersistJob::SaveSongs(mq) => {
                header.insert(mq.id);
                full.insert(mq.id)
            }
            PersistJob::Delete(id) => {
                header.insert(*id);
                full.insert(*id)
            }
            PersistJob::SaveHeader(mq) => !full.contains(&mq.id) && header.insert(mq.id),
            PersistJob::SaveAll(_) => !std::mem::replace(&mut bulk_seen, true),
        };
        if keep {
            kept.push(job);
        }
    }

    kept.reverse();
    kept
}

fn execute(db: &DatabaseConnection, job: &PersistJob) -> Result<(), anyhow::Error> {
    match job {
        PersistJob::SaveSongs(mq) => DbOperations::save_queue(db, mq),
        PersistJob::SaveHeader(mq) => DbOperations::update_queue(db, mq).map(|_| ()),
        PersistJob::SaveAll(mqs) => DbOperations::update_all_queues(db, mqs),
        PersistJob::Delete(id) => DbOperations::delete_queue(db, *id),
    }
}

/// Handle to the background writer.
pub struct QueuePersister {
    jobs: Option<mpsc::UnboundedSender<PersistJob>>,
    closing: Option<watch::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl QueuePersister {
    /// Start the worker. Must be called from within a tokio runtime.
    pub fn spawn(db: DatabaseConnection, save_delay: Duration) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (closing_tx, closing_rx) = watch::channel(());
        let worker = tokio::spawn(run_worker(db, jobs_rx, closing_rx, save_delay));

        Self {
            jobs: Some(jobs_tx),
            closing: Some(closing_tx),
            worker: Some(worker),
        }
    }

    pub fn submit(&self, job: PersistJob) {
        let Some(jobs) = &self.jobs else {
            warn!("queue persister already shut down, dropping {}", job.describe());
            return;
        };
        if let Err(e) = jobs.send(job) {
            warn!("queue persister stopped, dropping {}", e.0.describe());
        }
    }

    /// Flush pending jobs without waiting out the delay, then stop the worker
    pub async fn shutdown(&mut self) {
        self.jobs.take();
        self.closing.take();

        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                error!("queue persister worker failed: {e}");
            }
        }
    }
}

async fn run_worker(
    db: DatabaseConnection,
    mut jobs: mpsc::UnboundedReceiver<PersistJob>,
    mut closing: watch::Receiver<()>,
    save_delay: Duration,
) {
    while let Some(first) = jobs.recv().await {
        // Resolves early once the handle is shut down
        tokio::select! {
            _ = tokio::time::sleep(save_delay) => {}
            _ = closing.changed() => {}
        }

        let mut batch = vec![first];
        while let Ok(job) = jobs.try_recv() {
            batch.push(job);
        }
        let received = batch.len();
        let batch = coalesce(batch);
        debug!("persisting {} of {} queued jobs", batch.len(), received);

        for job in batch {
            let db = db.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                let result = execute(&db, &job);
                (job, result)
            })
            .await;

            match outcome {
                Ok((_, Ok(()))) => {}
                Ok((job, Err(e))) => error!("failed to {}: {e:#}", job.describe()),
                Err(e) => error!("queue persistence task panicked: {e}"),
            }
        }
    }

    debug!("queue persister stopped");
}
