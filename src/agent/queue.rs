use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::eid::Eid;
use crate::items::ItemDraft;
use crate::storage::{BackendLocal, StorageManager};

const QUEUE_FILE: &str = "queue.json";

/// A pending submission. The id here belongs to the queue entry, not to
/// the item the backend will eventually mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: Eid,
    pub payload: ItemDraft,
    pub queued_at: DateTime<Utc>,
}

/// Durable offline queue. Every mutation is a lock-guarded
/// read-modify-write so concurrent capture surfaces cannot lose each
/// other's entries.
pub struct OfflineQueue {
    store: BackendLocal,
    lock: Mutex<()>,
}

impl OfflineQueue {
    pub fn open(base_path: &str) -> std::io::Result<Self> {
        Ok(Self {
            store: BackendLocal::new(base_path)?,
            lock: Mutex::new(()),
        })
    }

    pub fn enqueue(&self, payload: ItemDraft) -> anyhow::Result<QueueEntry> {
        let _guard = self.lock.lock().unwrap();

        let mut entries = self.read_entries();
        let entry = QueueEntry {
            id: Eid::new(),
            payload,
            queued_at: Utc::now(),
        };
        entries.push(entry.clone());
        self.write_entries(&entries)?;

        Ok(entry)
    }

    pub fn snapshot(&self) -> Vec<QueueEntry> {
        let _guard = self.lock.lock().unwrap();
        self.read_entries()
    }

    /// Drop the confirmed entries. Failed entries and anything enqueued
    /// mid-pass stay queued for the next trigger.
    pub fn remove_confirmed(&self, confirmed: &[Eid]) -> anyhow::Result<()> {
        let _guard = self.lock.lock().unwrap();

        let mut entries = self.read_entries();
        entries.retain(|entry| !confirmed.contains(&entry.id));
        self.write_entries(&entries)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_entries(&self) -> Vec<QueueEntry> {
        if !self.store.exists(QUEUE_FILE) {
            return Vec::new();
        }

        match self.store.read(QUEUE_FILE) {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|err| {
                log::error!("malformed offline queue: {err}");
                Vec::new()
            }),
            Err(err) => {
                log::error!("failed to read offline queue: {err}");
                Vec::new()
            }
        }
    }

    fn write_entries(&self, entries: &[QueueEntry]) -> anyhow::Result<()> {
        let data = serde_json::to_vec_pretty(entries)?;
        self.store.write(QUEUE_FILE, &data)?;
        Ok(())
    }
}
