use std::sync::{Arc, RwLock};

use crate::app::{AppError, ItemService};
use crate::config::Config;
use crate::eid::Eid;
use crate::items::{BackendJson, ItemDraft, ItemPatch, ItemStore, ItemType};
use crate::semantic::EmbeddingProvider;
use crate::storage::{self, StorageManager};

pub struct FakeEmbedder {
    pub vector: Vec<f32>,
    pub fail: bool,
}

impl EmbeddingProvider for FakeEmbedder {
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        if self.fail {
            anyhow::bail!("embedding endpoint unreachable");
        }
        Ok(self.vector.clone())
    }
}

/// Creates an isolated ItemService over a unique temp directory. Each test
/// gets its own directory so parallel tests never collide, and no real
/// data is touched.
pub fn create_service_with(
    embedder: Arc<dyn EmbeddingProvider>,
) -> (ItemService, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let base_path = tmp.path().to_str().unwrap().to_string();

    let store = Arc::new(
        BackendJson::load(tmp.path().join("items.json").to_str().unwrap())
            .expect("failed to create item store"),
    );
    let uploads_dir = tmp.path().join("uploads");
    let uploads = Arc::new(
        storage::BackendLocal::new(uploads_dir.to_str().unwrap())
            .expect("failed to create uploads storage"),
    );

    let mut config = Config::load_with(&base_path).expect("failed to load config");
    // keep dead-URL fetches from stalling the suite
    config.scrape.timeout_secs = 1;
    let config = Arc::new(RwLock::new(config));

    let service = ItemService::new_with(
        store,
        uploads,
        uploads_dir,
        embedder,
        None,
        config,
        base_path,
    );

    (service, tmp)
}

pub fn create_service() -> (ItemService, tempfile::TempDir) {
    create_service_with(Arc::new(FakeEmbedder {
        vector: vec![1.0, 0.0],
        fail: false,
    }))
}

#[test]
fn explicit_type_skips_metadata_extraction() {
    let (service, _tmp) = create_service();

    let item = service
        .create(ItemDraft {
            title: Some("My note".into()),
            url: Some("https://example.com/page".into()),
            item_type: Some(ItemType::Note),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(item.item_type, ItemType::Note);
    assert!(item.metadata.is_empty());
    assert_eq!(item.title.as_deref(), Some("My note"));
}

#[test]
fn video_url_without_type_is_classified_with_video_id() {
    let (service, _tmp) = create_service();

    let item = service
        .create(ItemDraft {
            url: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".into()),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(item.item_type, ItemType::Video);
    assert_eq!(item.metadata.video_id.as_deref(), Some("dQw4w9WgXcQ"));
    assert_eq!(
        item.metadata.image.as_deref(),
        Some("https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg")
    );
}

#[test]
fn unreachable_url_still_creates_an_article() {
    let (service, _tmp) = create_service();

    // .invalid never resolves, so extraction contributes nothing and the
    // detector falls back on the URL rule
    let item = service
        .create(ItemDraft {
            url: Some("https://nowhere.invalid/post".into()),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(item.item_type, ItemType::Article);
    assert!(item.metadata.is_empty());
}

#[test]
fn bare_content_is_detected_as_note_or_todo() {
    let (service, _tmp) = create_service();

    let note = service
        .create(ItemDraft {
            content: Some("a passing thought".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(note.item_type, ItemType::Note);

    let todo = service
        .create(ItemDraft {
            content: Some("- buy milk".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(todo.item_type, ItemType::Todo);
}

#[test]
fn update_and_delete_of_unknown_ids_are_not_found() {
    let (service, _tmp) = create_service();

    let missing = Eid::from("01J00000000000000000000000");

    let err = service.update(&missing, ItemPatch::default()).unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = service.delete(&missing).unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[test]
fn delete_removes_the_item() {
    let (service, _tmp) = create_service();

    let item = service
        .create(ItemDraft {
            content: Some("short".into()),
            ..Default::default()
        })
        .unwrap();

    service.delete(&item.id).unwrap();
    assert!(matches!(
        service.get(&item.id).unwrap_err(),
        AppError::NotFound
    ));
    assert_eq!(service.total().unwrap(), 0);
}

#[test]
fn list_filters_by_text_and_type() {
    let (service, _tmp) = create_service();

    service
        .create(ItemDraft {
            title: Some("Rust patterns".into()),
            content: Some("ownership notes".into()),
            item_type: Some(ItemType::Article),
            ..Default::default()
        })
        .unwrap();
    service
        .create(ItemDraft {
            title: Some("Groceries".into()),
            content: Some("- milk".into()),
            item_type: Some(ItemType::Todo),
            ..Default::default()
        })
        .unwrap();

    let hits = service.list(Some("rust"), None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title.as_deref(), Some("Rust patterns"));

    let hits = service.list(None, Some(ItemType::Todo)).unwrap();
    assert_eq!(hits.len(), 1);

    let hits = service.list(Some("rust"), Some(ItemType::Todo)).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn blank_nl_search_is_a_validation_error() {
    let (service, _tmp) = create_service();

    assert!(matches!(
        service.nl_search("", None).unwrap_err(),
        AppError::Validation(_)
    ));
    assert!(matches!(
        service.nl_search("   ", None).unwrap_err(),
        AppError::Validation(_)
    ));
}

#[test]
fn nl_search_fallback_matches_keywords() {
    let (service, _tmp) = create_service();

    service
        .create(ItemDraft {
            title: Some("Rust ownership guide".into()),
            item_type: Some(ItemType::Article),
            ..Default::default()
        })
        .unwrap();
    service
        .create(ItemDraft {
            title: Some("Gardening tips".into()),
            item_type: Some(ItemType::Article),
            ..Default::default()
        })
        .unwrap();

    // no API key in the environment, so this exercises the fallback path
    let (parsed, items) = service.nl_search("show me the rust guide", None).unwrap();

    assert_eq!(
        parsed.keywords,
        Some(vec!["rust".to_string(), "guide".to_string()])
    );
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title.as_deref(), Some("Rust ownership guide"));
}

#[test]
fn semantic_search_ranks_and_reports_total() {
    let (service, _tmp) = create_service();

    let a = service
        .create(ItemDraft {
            content: Some("first".into()),
            item_type: Some(ItemType::Note),
            ..Default::default()
        })
        .unwrap();
    let b = service
        .create(ItemDraft {
            content: Some("second".into()),
            item_type: Some(ItemType::Note),
            ..Default::default()
        })
        .unwrap();
    let unembedded = service
        .create(ItemDraft {
            content: Some("third".into()),
            item_type: Some(ItemType::Note),
            ..Default::default()
        })
        .unwrap();

    service
        .store
        .attach_embedding(&a.id, vec![0.9, 0.436])
        .unwrap();
    service
        .store
        .attach_embedding(&b.id, vec![0.1, 0.995])
        .unwrap();

    let search = service.semantic_search("anything", Some(1)).unwrap();

    assert_eq!(search.total_searched, 2);
    assert_eq!(search.items.len(), 1);
    assert_eq!(search.items[0].item.id, a.id);
    assert!(search.items[0].similarity > 0.8);

    // the item still waiting for its embedding is simply not a candidate
    assert!(search.items.iter().all(|hit| hit.item.id != unembedded.id));
}

#[test]
fn semantic_search_surfaces_embedding_failure() {
    let (service, _tmp) = create_service_with(Arc::new(FakeEmbedder {
        vector: vec![],
        fail: true,
    }));

    assert!(matches!(
        service.semantic_search("anything", None).unwrap_err(),
        AppError::Other(_)
    ));
}

#[test]
fn upload_is_stored_and_reported() {
    let (service, _tmp) = create_service();

    let png: Vec<u8> = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        .into_iter()
        .chain([0u8; 16])
        .collect();

    let result = service.store_upload("shot.png", &png).unwrap();

    assert!(result.filename.ends_with(".png"));
    assert_eq!(result.image_url, format!("/uploads/{}", result.filename));
    assert!(service.uploads.exists(&result.filename));

    #[cfg(not(feature = "ocr"))]
    {
        assert!(!result.ocr_processed);
        assert!(result.ocr_text.is_none());
    }
}

#[test]
fn recent_respects_limit_and_type() {
    let (service, _tmp) = create_service();

    for i in 0..5 {
        service
            .create(ItemDraft {
                title: Some(format!("note {i}")),
                item_type: Some(ItemType::Note),
                ..Default::default()
            })
            .unwrap();
    }
    service
        .create(ItemDraft {
            title: Some("the todo".into()),
            item_type: Some(ItemType::Todo),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(service.recent(3, None).unwrap().len(), 3);
    assert_eq!(service.recent(10, Some(ItemType::Todo)).unwrap().len(), 1);
}
