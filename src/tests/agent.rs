use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use crate::agent::{
    capture, ItemSubmitter, OfflineQueue, Submission, SyncAgent, SyncOutcome, SyncResult,
};
use crate::eid::Eid;
use crate::items::{Item, ItemDraft, ItemMetadata};

struct FakeBackend {
    online: AtomicBool,
    fail_titles: Mutex<HashSet<String>>,
    submitted: Mutex<Vec<ItemDraft>>,
    submit_delay: Option<Duration>,
}

impl FakeBackend {
    fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            fail_titles: Mutex::new(HashSet::new()),
            submitted: Mutex::new(Vec::new()),
            submit_delay: None,
        }
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn fail_title(&self, title: &str) {
        self.fail_titles.lock().unwrap().insert(title.to_string());
    }

    fn clear_failures(&self) {
        self.fail_titles.lock().unwrap().clear();
    }

    fn submitted_titles(&self) -> Vec<String> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|draft| draft.title.clone().unwrap_or_default())
            .collect()
    }
}

impl ItemSubmitter for FakeBackend {
    fn submit(&self, draft: &ItemDraft) -> anyhow::Result<Item> {
        if let Some(delay) = self.submit_delay {
            std::thread::sleep(delay);
        }

        let title = draft.title.clone().unwrap_or_default();
        if self.fail_titles.lock().unwrap().contains(&title) {
            anyhow::bail!("backend returned 500 Internal Server Error");
        }

        self.submitted.lock().unwrap().push(draft.clone());

        let now = Utc::now();
        Ok(Item {
            id: Eid::new(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            url: draft.url.clone(),
            item_type: draft.item_type.unwrap_or_default(),
            tags: draft.tags.clone(),
            user_id: draft.user_id.clone().unwrap_or_else(|| "default_user".into()),
            image_url: draft.image_url.clone(),
            ocr_text: draft.ocr_text.clone(),
            embedding: None,
            metadata: ItemMetadata::default(),
            created_at: now,
            updated_at: now,
        })
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

fn create_agent(backend: Arc<FakeBackend>) -> (SyncAgent, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let queue = OfflineQueue::open(tmp.path().to_str().unwrap()).expect("failed to open queue");

    (SyncAgent::new(backend, queue), tmp)
}

#[test]
fn offline_submission_is_queued_not_lost() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_online(false);
    let (agent, _tmp) = create_agent(backend.clone());

    let outcome = agent
        .submit_or_queue(capture::note("remember this", vec![]))
        .unwrap();

    assert!(matches!(outcome, Submission::Queued(_)));
    assert_eq!(agent.queue().len(), 1);
    assert!(backend.submitted_titles().is_empty());
}

#[test]
fn failed_submission_falls_back_to_the_queue() {
    let backend = Arc::new(FakeBackend::new());
    backend.fail_title("remember this");
    let (agent, _tmp) = create_agent(backend);

    let outcome = agent
        .submit_or_queue(capture::note("remember this", vec![]))
        .unwrap();

    assert!(matches!(outcome, Submission::Queued(_)));
    assert_eq!(agent.queue().len(), 1);
}

#[test]
fn online_submission_is_confirmed_directly() {
    let backend = Arc::new(FakeBackend::new());
    let (agent, _tmp) = create_agent(backend);

    let outcome = agent
        .submit_or_queue(capture::note("remember this", vec![]))
        .unwrap();

    assert!(matches!(outcome, Submission::Confirmed(_)));
    assert!(agent.queue().is_empty());
}

#[test]
fn queue_survives_a_restart() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_online(false);

    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let base_path = tmp.path().to_str().unwrap().to_string();

    {
        let queue = OfflineQueue::open(&base_path).unwrap();
        let agent = SyncAgent::new(backend.clone(), queue);
        agent
            .submit_or_queue(capture::note("survives restarts", vec![]))
            .unwrap();
    }

    let reopened = OfflineQueue::open(&base_path).unwrap();
    let entries = reopened.snapshot();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].payload.content.as_deref(),
        Some("survives restarts")
    );
}

#[test]
fn sync_with_reliable_backend_empties_the_queue() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_online(false);
    let (agent, _tmp) = create_agent(backend.clone());

    for i in 0..3 {
        agent
            .submit_or_queue(capture::note(&format!("queued {i}"), vec![]))
            .unwrap();
    }
    assert_eq!(agent.queue().len(), 3);

    backend.set_online(true);
    let result = agent.sync_once();

    assert_eq!(
        result,
        SyncResult::Completed(SyncOutcome {
            attempted: 3,
            confirmed: 3,
            failed: 0,
        })
    );
    assert!(agent.queue().is_empty());

    // sequential replay keeps enqueue order
    assert_eq!(
        backend.submitted_titles(),
        vec!["queued 0", "queued 1", "queued 2"]
    );
}

#[test]
fn partial_sync_keeps_exactly_the_failed_subset() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_online(false);
    let (agent, _tmp) = create_agent(backend.clone());

    for i in 0..3 {
        agent
            .submit_or_queue(capture::note(&format!("queued {i}"), vec![]))
            .unwrap();
    }

    backend.set_online(true);
    backend.fail_title("queued 1");

    let result = agent.sync_once();
    assert_eq!(
        result,
        SyncResult::Completed(SyncOutcome {
            attempted: 3,
            confirmed: 2,
            failed: 1,
        })
    );

    let remaining = agent.queue().snapshot();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].payload.title.as_deref(), Some("queued 1"));

    // the failed entry is retried on the next pass, with no duplicates of
    // the already-confirmed ones
    backend.clear_failures();
    let result = agent.sync_once();
    assert_eq!(
        result,
        SyncResult::Completed(SyncOutcome {
            attempted: 1,
            confirmed: 1,
            failed: 0,
        })
    );
    assert!(agent.queue().is_empty());
    assert_eq!(
        backend.submitted_titles(),
        vec!["queued 0", "queued 2", "queued 1"]
    );
}

#[test]
fn concurrent_sync_triggers_run_a_single_pass() {
    let mut backend = FakeBackend::new();
    backend.submit_delay = Some(Duration::from_millis(300));
    let backend = Arc::new(backend);
    backend.set_online(false);

    let (agent, _tmp) = create_agent(backend.clone());
    agent
        .submit_or_queue(capture::note("slow entry", vec![]))
        .unwrap();
    backend.set_online(true);

    let agent = Arc::new(agent);
    let first = std::thread::spawn({
        let agent = agent.clone();
        move || agent.sync_once()
    });

    // give the first pass time to take the single-flight guard
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(agent.sync_once(), SyncResult::Skipped);

    let first = first.join().unwrap();
    assert_eq!(
        first,
        SyncResult::Completed(SyncOutcome {
            attempted: 1,
            confirmed: 1,
            failed: 0,
        })
    );
    assert!(agent.queue().is_empty());
}

#[test]
fn startup_sync_only_fires_with_queued_work_and_connectivity() {
    let backend = Arc::new(FakeBackend::new());
    let (agent, _tmp) = create_agent(backend.clone());

    // empty queue: nothing to do
    assert!(agent.sync_on_startup().is_none());

    backend.set_online(false);
    agent
        .submit_or_queue(capture::note("left over", vec![]))
        .unwrap();

    // offline: stays queued
    assert!(agent.sync_on_startup().is_none());
    assert_eq!(agent.queue().len(), 1);

    backend.set_online(true);
    let result = agent.sync_on_startup().unwrap();
    assert_eq!(
        result,
        SyncResult::Completed(SyncOutcome {
            attempted: 1,
            confirmed: 1,
            failed: 0,
        })
    );
    assert!(agent.queue().is_empty());
}
