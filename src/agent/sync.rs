use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use crate::eid::Eid;
use crate::items::{Item, ItemDraft};

use super::client::ApiClient;
use super::queue::OfflineQueue;

/// Where the backend sits from the agent's point of view. The seam keeps
/// the network out of tests.
pub trait ItemSubmitter: Send + Sync {
    fn submit(&self, draft: &ItemDraft) -> anyhow::Result<Item>;
    fn is_online(&self) -> bool;
}

impl ItemSubmitter for ApiClient {
    fn submit(&self, draft: &ItemDraft) -> anyhow::Result<Item> {
        self.create_item(draft)
    }

    fn is_online(&self) -> bool {
        ApiClient::is_online(self)
    }
}

/// What happened to one submission.
#[derive(Debug)]
pub enum Submission {
    Confirmed(Box<Item>),
    Queued(Eid),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub attempted: usize,
    pub confirmed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    /// Another pass was already in flight.
    Skipped,
    Completed(SyncOutcome),
}

/// The capture client's submit-or-queue pipeline. Pending submissions move
/// Drafted -> Submitting -> Confirmed | Queued, and queued entries go back
/// through Submitting on every sync pass until they confirm.
pub struct SyncAgent {
    submitter: Arc<dyn ItemSubmitter>,
    queue: OfflineQueue,
    in_flight: Mutex<()>,
}

impl SyncAgent {
    pub fn new(submitter: Arc<dyn ItemSubmitter>, queue: OfflineQueue) -> Self {
        Self {
            submitter,
            queue,
            in_flight: Mutex::new(()),
        }
    }

    /// The single entry point every capture path converges on.
    /// Connectivity trouble is never an error; it turns into a queued
    /// entry.
    pub fn submit_or_queue(&self, draft: ItemDraft) -> anyhow::Result<Submission> {
        if !self.submitter.is_online() {
            log::info!("offline, queueing item for later sync");
            let entry = self.queue.enqueue(draft)?;
            return Ok(Submission::Queued(entry.id));
        }

        match self.submitter.submit(&draft) {
            Ok(item) => Ok(Submission::Confirmed(Box::new(item))),
            Err(err) => {
                log::warn!("submit failed, queueing item: {err}");
                let entry = self.queue.enqueue(draft)?;
                Ok(Submission::Queued(entry.id))
            }
        }
    }

    /// One sync pass: snapshot the queue, submit every entry exactly once
    /// (sequentially, to keep ordering predictable), and keep exactly the
    /// failed subset queued. A trigger arriving while a pass is running is
    /// a no-op.
    pub fn sync_once(&self) -> SyncResult {
        let Ok(_guard) = self.in_flight.try_lock() else {
            log::debug!("sync already in progress, skipping");
            return SyncResult::Skipped;
        };

        let snapshot = self.queue.snapshot();
        if snapshot.is_empty() {
            return SyncResult::Completed(SyncOutcome::default());
        }

        log::info!("syncing {} queued items", snapshot.len());

        let mut confirmed: Vec<Eid> = Vec::new();
        let mut failed = 0usize;

        for entry in &snapshot {
            match self.submitter.submit(&entry.payload) {
                Ok(_) => confirmed.push(entry.id.clone()),
                Err(err) => {
                    log::warn!("failed to sync entry {}: {err}", entry.id);
                    failed += 1;
                }
            }
        }

        if let Err(err) = self.queue.remove_confirmed(&confirmed) {
            log::error!("failed to persist queue after sync: {err}");
        }

        let outcome = SyncOutcome {
            attempted: snapshot.len(),
            confirmed: confirmed.len(),
            failed,
        };

        if outcome.failed == 0 {
            log::info!("sync complete, {} items submitted", outcome.confirmed);
        } else {
            // partial success is a normal, reportable outcome
            log::warn!(
                "partial sync: {} submitted, {} still queued",
                outcome.confirmed,
                outcome.failed
            );
        }

        SyncResult::Completed(outcome)
    }

    /// Startup trigger: replay only when something is queued and the
    /// backend looks reachable.
    pub fn sync_on_startup(&self) -> Option<SyncResult> {
        if self.queue.is_empty() {
            return None;
        }
        if !self.submitter.is_online() {
            log::info!("offline, {} items stay queued", self.queue.len());
            return None;
        }

        log::info!("found {} queued items, syncing", self.queue.len());
        Some(self.sync_once())
    }

    /// Watch connectivity and replay the queue after every
    /// offline-to-online transition, giving the link a moment to settle
    /// first.
    pub fn watch(&self, probe_interval: Duration, settle_delay: Duration) {
        let _ = self.sync_on_startup();

        let mut online = self.submitter.is_online();

        loop {
            sleep(probe_interval);

            let now_online = self.submitter.is_online();

            if now_online && !online {
                log::info!("connection restored, syncing offline queue");
                sleep(settle_delay);
                self.sync_once();
            }
            if !now_online && online {
                log::info!("connection lost, new items will be queued");
            }

            online = now_online;
        }
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }
}
