use std::{
    path::PathBuf,
    sync::{mpsc, Arc, RwLock},
};

use crate::{
    config::Config,
    detect,
    eid::Eid,
    items::{self, Item, ItemDraft, ItemMetadata, ItemPatch, ItemQuery, ItemStore, ItemType},
    llm::LlmClient,
    metadata::{self, transcript::TranscriptClient, MetaDeps},
    ocr,
    query::{self, ParsedQuery},
    semantic::{self, EmbeddingProvider, HttpEmbeddings, RankedItem, DEFAULT_RESULT_LIMIT},
    storage::{self, StorageManager},
};

use super::errors::AppError;
use super::task_runner::{self, Status, Task};

#[derive(Debug)]
pub struct SemanticSearch {
    pub total_searched: usize,
    pub items: Vec<RankedItem>,
}

pub struct UploadResult {
    pub image_url: String,
    pub filename: String,
    pub ocr_text: Option<String>,
    pub ocr_processed: bool,
}

/// The backend's service layer: one of these owns the store, the upload
/// directory, the embedding provider and the background task queue.
pub struct ItemService {
    pub store: Arc<dyn ItemStore>,
    pub uploads: Arc<dyn StorageManager>,
    uploads_dir: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,

    task_tx: Option<Arc<mpsc::Sender<Task>>>,
    task_queue_handle: Option<std::thread::JoinHandle<()>>,

    config: Arc<RwLock<Config>>,
    base_path: String,
}

impl ItemService {
    pub fn new(config: Arc<RwLock<Config>>, base_path: &str) -> anyhow::Result<Self> {
        let store = Arc::new(items::BackendJson::load(&format!("{base_path}/items.json"))?);
        let uploads_dir = PathBuf::from(format!("{base_path}/uploads"));
        let uploads = Arc::new(storage::BackendLocal::new(&format!("{base_path}/uploads"))?);
        let embedder = Arc::new(HttpEmbeddings::from_config(
            &config.read().unwrap().embeddings,
        ));

        Ok(Self {
            store,
            uploads,
            uploads_dir,
            embedder,
            task_tx: None,
            task_queue_handle: None,
            config,
            base_path: base_path.to_string(),
        })
    }

    pub fn run_queue(&mut self) {
        let (task_tx, task_rx) = mpsc::channel::<Task>();

        let handle = std::thread::spawn({
            let store = self.store.clone();
            let embedder = self.embedder.clone();
            let config = self.config.clone();
            let base_path = self.base_path.clone();

            let mut queue_dump = task_runner::read_queue_dump(&self.base_path);
            let task_list = queue_dump.queue.clone();

            queue_dump.queue = Vec::new();
            task_runner::write_queue_dump(&self.base_path, &queue_dump);

            std::thread::spawn({
                let task_tx = task_tx.clone();

                move || {
                    for task in task_list {
                        if let Status::Done = task.status {
                            continue;
                        }
                        if let Task::Shutdown = task.task {
                            continue;
                        }

                        log::info!("restarting interrupted task \"{:?}\"", task.task);
                        if let Err(err) = task_tx.send(task.task) {
                            log::error!("failed to initialize interrupted task: {err:?}");
                        }
                    }
                }
            });

            move || {
                task_runner::start_queue(task_rx, store, embedder, config, base_path);
            }
        });

        self.task_queue_handle = Some(handle);
        self.task_tx = Some(Arc::new(task_tx));
    }

    /// Create an item. An explicitly supplied type skips metadata
    /// extraction entirely; otherwise a URL goes through the normalizer,
    /// and the plain detector has the last word on the type. The embedding
    /// is scheduled fire-and-forget; the response never waits for it.
    pub fn create(&self, draft: ItemDraft) -> Result<Item, AppError> {
        let mut draft = draft;

        let raw_url = draft.url.clone();
        let raw_content = draft.content.clone();

        let mut item_type = draft.item_type.take();
        let mut metadata = ItemMetadata::default();

        if item_type.is_none() {
            if let Some(url) = &raw_url {
                let meta = metadata::fetch_meta(url, &self.meta_deps());

                if draft.title.is_none() {
                    draft.title = meta.title.clone();
                }
                if draft.content.is_none() {
                    draft.content = meta.description.clone();
                }

                item_type = meta.item_type;
                metadata = meta.to_item_metadata();
            }
        }

        let item_type = item_type
            .unwrap_or_else(|| detect::detect_type(raw_url.as_deref(), raw_content.as_deref()));

        let item = self
            .store
            .create(draft, item_type, metadata)
            .map_err(AppError::store)?;

        self.schedule_embedding(&item);

        Ok(item)
    }

    /// Plain listing: free-text substring search plus an optional type
    /// filter, newest first.
    pub fn list(&self, q: Option<&str>, item_type: Option<ItemType>) -> Result<Vec<Item>, AppError> {
        let query = ItemQuery {
            keywords: q
                .map(|q| q.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
            types: item_type.map(|t| vec![t]),
            ..Default::default()
        };

        self.store.query(&query).map_err(AppError::store)
    }

    /// Natural-language search: translate, compile, query.
    pub fn nl_search(
        &self,
        query_text: &str,
        limit: Option<usize>,
    ) -> Result<(ParsedQuery, Vec<Item>), AppError> {
        if query_text.trim().is_empty() {
            return Err(AppError::Validation(
                "search query is required".to_string(),
            ));
        }

        let llm = LlmClient::from_config(&self.config.read().unwrap().llm);
        let parsed = query::translate(query_text, llm.as_ref());

        let mut compiled = query::compile(&parsed);
        compiled.limit = limit;

        let items = self.store.query(&compiled).map_err(AppError::store)?;

        Ok((parsed, items))
    }

    /// Embedding-based search over a full in-memory snapshot of every
    /// embedded item. Failing to embed the query is an error; items still
    /// waiting for their embedding simply are not candidates.
    pub fn semantic_search(
        &self,
        query_text: &str,
        limit: Option<usize>,
    ) -> Result<SemanticSearch, AppError> {
        if query_text.trim().is_empty() {
            return Err(AppError::Validation(
                "search query is required".to_string(),
            ));
        }

        let query_vec = self.embedder.embed(query_text)?;

        let items = self
            .store
            .query(&ItemQuery::default())
            .map_err(AppError::store)?;
        let total_searched = items.iter().filter(|item| item.embedding.is_some()).count();

        let ranked = semantic::rank(
            &query_vec,
            items,
            limit.unwrap_or(DEFAULT_RESULT_LIMIT),
        );

        Ok(SemanticSearch {
            total_searched,
            items: ranked,
        })
    }

    pub fn get(&self, id: &Eid) -> Result<Item, AppError> {
        self.store
            .get(id)
            .map_err(AppError::store)?
            .ok_or(AppError::NotFound)
    }

    pub fn recent(&self, limit: usize, item_type: Option<ItemType>) -> Result<Vec<Item>, AppError> {
        let query = ItemQuery {
            types: item_type.map(|t| vec![t]),
            limit: Some(limit),
            ..Default::default()
        };

        self.store.query(&query).map_err(AppError::store)
    }

    pub fn update(&self, id: &Eid, patch: ItemPatch) -> Result<Item, AppError> {
        self.store
            .update(id, patch)
            .map_err(AppError::store)?
            .ok_or(AppError::NotFound)
    }

    pub fn delete(&self, id: &Eid) -> Result<(), AppError> {
        if self.store.delete(id).map_err(AppError::store)? {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    pub fn total(&self) -> Result<usize, AppError> {
        self.store.total().map_err(AppError::store)
    }

    /// Store an uploaded image and run best-effort OCR over it.
    pub fn store_upload(&self, original_name: &str, bytes: &[u8]) -> Result<UploadResult, AppError> {
        let filetype = infer::get(bytes)
            .map(|ftype| ftype.extension().to_string())
            .or_else(|| {
                original_name
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_lowercase())
            })
            .unwrap_or_else(|| "png".to_string());

        let filename = format!("{}.{}", Eid::new(), filetype);

        self.uploads
            .write(&filename, bytes)
            .map_err(|err| AppError::Store(err.to_string()))?;

        let ocr_text = ocr::extract_text(&self.uploads_dir.join(&filename));
        let ocr_processed = ocr_text.is_some();

        Ok(UploadResult {
            image_url: format!("/uploads/{filename}"),
            filename,
            ocr_text,
            ocr_processed,
        })
    }

    pub fn uploads_dir(&self) -> &PathBuf {
        &self.uploads_dir
    }

    pub fn config(&self) -> Arc<RwLock<Config>> {
        self.config.clone()
    }

    pub fn wait_task_queue_finish(&mut self) {
        if let Some(handle) = self.task_queue_handle.take() {
            if let Err(err) = handle.join() {
                log::error!("task queue thread panicked: {err:?}");
            }
        }
    }

    pub fn shutdown(&self) {
        if let Some(task_tx) = self.task_tx.as_ref() {
            if let Err(err) = task_tx.send(Task::Shutdown) {
                log::error!("{err}");
            }
        }
    }

    fn meta_deps(&self) -> MetaDeps {
        let config = self.config.read().unwrap();

        MetaDeps {
            scrape: config.scrape.clone(),
            llm: LlmClient::from_config(&config.llm),
            transcript: Some(TranscriptClient::new()),
        }
    }

    fn schedule_embedding(&self, item: &Item) {
        match self.task_tx.as_ref() {
            Some(task_tx) => {
                if let Err(err) = task_tx.send(Task::ComputeEmbedding {
                    item_id: item.id.clone(),
                }) {
                    log::error!("{err}");
                }
            }
            None => log::debug!("no task queue running, embedding for {} deferred", item.id),
        }
    }
}

#[cfg(test)]
impl ItemService {
    pub fn new_with(
        store: Arc<dyn ItemStore>,
        uploads: Arc<dyn StorageManager>,
        uploads_dir: PathBuf,
        embedder: Arc<dyn EmbeddingProvider>,
        task_tx: Option<Arc<mpsc::Sender<Task>>>,
        config: Arc<RwLock<Config>>,
        base_path: String,
    ) -> Self {
        Self {
            store,
            uploads,
            uploads_dir,
            embedder,
            task_tx,
            task_queue_handle: None,
            config,
            base_path,
        }
    }
}
