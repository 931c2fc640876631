use std::{
    sync::{
        atomic::{AtomicU16, Ordering},
        mpsc, Arc, RwLock,
    },
    thread::sleep,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    eid::Eid,
    items::ItemStore,
    semantic::{self, EmbeddingProvider},
    storage::{self, StorageManager},
};

const QUEUE_DUMP_FILE: &str = "task-queue.json";

pub fn now() -> u128 {
    let start = SystemTime::now();
    let since_the_epoch = start
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards");
    since_the_epoch.as_millis()
}

pub fn throttle(counter: Arc<AtomicU16>, config: Arc<RwLock<Config>>) {
    while counter.load(Ordering::Relaxed) >= config.read().unwrap().task_queue_max_threads {
        sleep(Duration::from_millis(100));
    }
}

/// Worker loop for background enrichment. Tasks are deliberately detached
/// from the requests that spawn them; a task failure never surfaces to any
/// caller, and there is no retry beyond a restart of interrupted tasks on
/// boot.
pub fn start_queue(
    task_rx: mpsc::Receiver<Task>,
    store: Arc<dyn ItemStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: Arc<RwLock<Config>>,
    base_path: String,
) {
    let thread_ctr = Arc::new(AtomicU16::new(0));

    log::debug!("waiting for job");
    while let Ok(task) = task_rx.recv() {
        log::debug!("got the job");
        let store = store.clone();
        let embedder = embedder.clone();
        let thread_counter = thread_ctr.clone();
        let config = config.clone();
        let base_path = base_path.clone();

        // graceful shutdown
        if let Task::Shutdown = &task {
            while thread_counter.load(Ordering::Relaxed) > 0 {
                sleep(Duration::from_millis(100));
            }
            return;
        };

        let id = save_task(&base_path, task.clone(), Status::Pending);
        let task_handle = std::thread::spawn({
            let thread_counter = thread_counter.clone();
            let id = id.clone();
            let base_path = base_path.clone();
            move || {
                throttle(thread_counter.clone(), config.clone());

                thread_counter.fetch_add(1, Ordering::Relaxed);
                set_status(&base_path, id.clone(), Status::InProgress);

                let status = task.run(store, embedder);
                set_status(&base_path, id.clone(), status);

                // remove task a bit later to give clients an opportunity to react
                std::thread::spawn(move || {
                    sleep(Duration::from_secs(10));
                    remove_task(&base_path, id);
                });
            }
        });

        // handle thread panics
        let base_path_for_panic = base_path.clone();
        std::thread::spawn(move || {
            if let Err(err) = task_handle.join() {
                log::error!("task_handle panicked: {err:?}");
                remove_task(&base_path_for_panic, id);
            }

            thread_counter.fetch_sub(1, Ordering::Relaxed);
        });
    }
}

pub fn read_queue_dump(base_path: &str) -> QueueDump {
    let empty = || QueueDump {
        queue: vec![],
        now: now(),
    };

    let store = match storage::BackendLocal::new(base_path) {
        Ok(store) => store,
        Err(err) => {
            log::error!("failed to initialize queue storage: {err}");
            return empty();
        }
    };

    if !store.exists(QUEUE_DUMP_FILE) {
        return empty();
    }

    match store.read(QUEUE_DUMP_FILE) {
        Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|err| {
            log::error!("malformed queue dump: {err}");
            empty()
        }),
        Err(err) => {
            log::error!("failed to read queue dump: {err}");
            empty()
        }
    }
}

pub fn write_queue_dump(base_path: &str, queue_dump: &QueueDump) {
    let store = match storage::BackendLocal::new(base_path) {
        Ok(store) => store,
        Err(err) => {
            log::error!("failed to initialize queue storage: {err}");
            return;
        }
    };

    let queue_dump_str = match serde_json::to_string_pretty(&queue_dump) {
        Ok(data) => data,
        Err(err) => {
            log::error!("failed to serialize queue dump: {err}");
            return;
        }
    };
    if let Err(err) = store.write(QUEUE_DUMP_FILE, queue_dump_str.as_bytes()) {
        log::error!("failed to write queue dump: {err}");
    }
}

pub fn remove_task(base_path: &str, id: Eid) {
    let mut queue_dump = read_queue_dump(base_path);
    queue_dump.queue.retain(|td| td.id != id);
    queue_dump.now = now();
    write_queue_dump(base_path, &queue_dump);
}

pub fn set_status(base_path: &str, id: Eid, status: Status) {
    let mut queue_dump = read_queue_dump(base_path);
    if let Some(task_dump) = queue_dump.queue.iter_mut().find(|td| td.id == id) {
        task_dump.status = status;
    }

    queue_dump.now = now();
    write_queue_dump(base_path, &queue_dump);
}

pub fn save_task(base_path: &str, task: Task, status: Status) -> Eid {
    let eid = Eid::new();

    let task_dump = TaskDump {
        id: eid.clone(),
        task,
        status,
    };

    let mut queue_dump = read_queue_dump(base_path);

    queue_dump.queue.push(task_dump);
    queue_dump.now = now();
    write_queue_dump(base_path, &queue_dump);

    eid
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Status {
    Interrupted,
    Pending,
    InProgress,
    Done,
    Error(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueDump {
    pub queue: Vec<TaskDump>,
    pub now: u128,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskDump {
    pub id: Eid,
    pub task: Task,
    pub status: Status,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Task {
    /// request to compute and attach an item's embedding
    ComputeEmbedding { item_id: Eid },

    /// request to gracefully shutdown task queue
    Shutdown,
}

impl Task {
    pub fn run(&self, store: Arc<dyn ItemStore>, embedder: Arc<dyn EmbeddingProvider>) -> Status {
        match self {
            Task::ComputeEmbedding { item_id } => {
                let item = match store.get(item_id) {
                    Ok(Some(item)) => item,
                    Ok(None) => {
                        log::debug!("item {item_id} gone before embedding, dropping task");
                        return Status::Done;
                    }
                    Err(err) => return Status::Error(err.to_string()),
                };

                let text = semantic::embeddings::item_text(&item);
                if text.trim().is_empty() {
                    log::debug!("no text content to embed for {item_id}");
                    return Status::Done;
                }

                let embedding = match embedder.embed(&text) {
                    Ok(embedding) => embedding,
                    Err(err) => {
                        log::warn!("embedding failed for {item_id}: {err}");
                        return Status::Error(err.to_string());
                    }
                };

                // the item may have been deleted while we were embedding;
                // that race is accepted and the write-back just drops
                match store.attach_embedding(&item.id, embedding) {
                    Ok(true) => Status::Done,
                    Ok(false) => {
                        log::debug!("item {item_id} deleted during embedding");
                        Status::Done
                    }
                    Err(err) => Status::Error(err.to_string()),
                }
            }
            Task::Shutdown => unreachable!(),
        }
    }
}
