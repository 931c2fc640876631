use crate::eid::Eid;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, RwLock},
};

pub const DEFAULT_USER_ID: &str = "default_user";

/// Coarse content-type tag. Always one of these values; anything the
/// detector cannot place becomes `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Note,
    Article,
    Product,
    Todo,
    Video,
    Image,
    #[default]
    Other,
}

impl ItemType {
    pub fn parse(value: &str) -> Option<ItemType> {
        match value.to_lowercase().as_str() {
            "note" => Some(ItemType::Note),
            "article" => Some(ItemType::Article),
            "product" => Some(ItemType::Product),
            "todo" => Some(ItemType::Todo),
            "video" => Some(ItemType::Video),
            "image" => Some(ItemType::Image),
            "other" => Some(ItemType::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Note => "note",
            ItemType::Article => "article",
            ItemType::Product => "product",
            ItemType::Todo => "todo",
            ItemType::Video => "video",
            ItemType::Image => "image",
            ItemType::Other => "other",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Best-effort facts scraped from an item's URL. Every field is optional;
/// a total extraction failure leaves the whole record empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ItemMetadata {
    pub fn is_empty(&self) -> bool {
        *self == ItemMetadata::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Eid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(rename = "type", default)]
    pub item_type: ItemType,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_user_id")]
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,

    /// Attached by a follow-up write once computed; absence means
    /// "not yet computed", never an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    #[serde(default)]
    pub metadata: ItemMetadata,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

/// Canonical submission payload. This is the POST body, the offline-queue
/// payload and what every capture path produces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
}

/// Partial in-place edit. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Compiled store filter. Every present condition must hold (logical AND);
/// the keyword list is itself a conjunction of per-keyword disjunctions
/// across title/content/url/tags.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub keywords: Vec<String>,
    pub types: Option<Vec<ItemType>>,
    pub tags: Option<Vec<String>>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub authors: Option<Vec<String>>,
    pub url_patterns: Option<Vec<String>>,
    pub limit: Option<usize>,
}

impl ItemQuery {
    pub fn matches(&self, item: &Item) -> bool {
        let title = item.title.as_deref().unwrap_or_default().to_lowercase();
        let content = item.content.as_deref().unwrap_or_default().to_lowercase();
        let url = item.url.as_deref().unwrap_or_default().to_lowercase();

        for keyword in &self.keywords {
            let keyword = keyword.to_lowercase();
            let hit = title.contains(&keyword)
                || content.contains(&keyword)
                || url.contains(&keyword)
                || item
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase().contains(&keyword));
            if !hit {
                return false;
            }
        }

        if let Some(types) = &self.types {
            if !types.contains(&item.item_type) {
                return false;
            }
        }

        if let Some(tags) = &self.tags {
            if !tags.iter().any(|tag| item.tags.contains(tag)) {
                return false;
            }
        }

        if let Some(after) = &self.created_after {
            if item.created_at < *after {
                return false;
            }
        }

        if let Some(before) = &self.created_before {
            if item.created_at > *before {
                return false;
            }
        }

        if let Some(authors) = &self.authors {
            let author = item.metadata.author.as_deref().unwrap_or_default();
            if !authors.iter().any(|a| a == author) {
                return false;
            }
        }

        if let Some(patterns) = &self.url_patterns {
            if !patterns
                .iter()
                .any(|pattern| url.contains(&pattern.to_lowercase()))
            {
                return false;
            }
        }

        true
    }
}

pub trait ItemStore: Send + Sync {
    fn create(
        &self,
        draft: ItemDraft,
        item_type: ItemType,
        metadata: ItemMetadata,
    ) -> anyhow::Result<Item>;
    fn get(&self, id: &Eid) -> anyhow::Result<Option<Item>>;
    fn update(&self, id: &Eid, patch: ItemPatch) -> anyhow::Result<Option<Item>>;
    /// Follow-up write attaching a computed embedding. Returns false when
    /// the item disappeared in the meantime.
    fn attach_embedding(&self, id: &Eid, embedding: Vec<f32>) -> anyhow::Result<bool>;
    fn delete(&self, id: &Eid) -> anyhow::Result<bool>;
    /// Filtered query, newest-first.
    fn query(&self, query: &ItemQuery) -> anyhow::Result<Vec<Item>>;
    fn total(&self) -> anyhow::Result<usize>;
}

/// File-backed store: the whole collection lives in memory and every
/// mutation rewrites the JSON document atomically.
#[derive(Debug, Clone, Default)]
pub struct BackendJson {
    list: Arc<RwLock<Vec<Item>>>,
    path: PathBuf,
}

impl BackendJson {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let path = PathBuf::from(path);

        let items: Vec<Item> = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("malformed item database at {}", path.display()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::info!("creating new item database at {}", path.display());
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };

        let store = BackendJson {
            list: Arc::new(RwLock::new(items)),
            path,
        };
        store.save()?;

        Ok(store)
    }

    fn save(&self) -> anyhow::Result<()> {
        let items = self.list.read().unwrap();

        let temp_path = self.path.with_extension("json-tmp");
        let data = serde_json::to_vec_pretty(&*items)?;
        std::fs::write(&temp_path, data)?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    #[cfg(test)]
    pub fn list(&self) -> Arc<RwLock<Vec<Item>>> {
        self.list.clone()
    }
}

impl ItemStore for BackendJson {
    fn create(
        &self,
        draft: ItemDraft,
        item_type: ItemType,
        metadata: ItemMetadata,
    ) -> anyhow::Result<Item> {
        let now = Utc::now();
        let item = Item {
            id: Eid::new(),
            title: draft.title,
            content: draft.content,
            url: draft.url,
            item_type,
            // duplicates are allowed by design; deduping here would change
            // observable behavior
            tags: draft.tags,
            user_id: draft.user_id.unwrap_or_else(default_user_id),
            image_url: draft.image_url,
            ocr_text: draft.ocr_text,
            embedding: None,
            metadata,
            created_at: now,
            updated_at: now,
        };

        self.list.write().unwrap().push(item.clone());
        self.save()?;

        Ok(item)
    }

    fn get(&self, id: &Eid) -> anyhow::Result<Option<Item>> {
        let items = self.list.read().unwrap();
        Ok(items.iter().find(|item| item.id == *id).cloned())
    }

    fn update(&self, id: &Eid, patch: ItemPatch) -> anyhow::Result<Option<Item>> {
        let mut items = self.list.write().unwrap();

        let Some(item) = items.iter_mut().find(|item| item.id == *id) else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            item.title = Some(title);
        }
        if let Some(content) = patch.content {
            item.content = Some(content);
        }
        if let Some(url) = patch.url {
            item.url = Some(url);
        }
        if let Some(item_type) = patch.item_type {
            item.item_type = item_type;
        }
        if let Some(tags) = patch.tags {
            item.tags = tags;
        }
        if let Some(image_url) = patch.image_url {
            item.image_url = Some(image_url);
        }
        item.updated_at = Utc::now();

        let result = item.clone();
        drop(items);

        self.save()?;

        Ok(Some(result))
    }

    fn attach_embedding(&self, id: &Eid, embedding: Vec<f32>) -> anyhow::Result<bool> {
        let mut items = self.list.write().unwrap();

        let Some(item) = items.iter_mut().find(|item| item.id == *id) else {
            return Ok(false);
        };

        item.embedding = Some(embedding);
        item.updated_at = Utc::now();
        drop(items);

        self.save()?;

        Ok(true)
    }

    fn delete(&self, id: &Eid) -> anyhow::Result<bool> {
        let mut items = self.list.write().unwrap();

        let Some(idx) = items.iter().position(|item| item.id == *id) else {
            return Ok(false);
        };
        items.remove(idx);
        drop(items);

        self.save()?;

        Ok(true)
    }

    fn query(&self, query: &ItemQuery) -> anyhow::Result<Vec<Item>> {
        let items = self.list.read().unwrap();

        let mut output: Vec<Item> = items
            .iter()
            .filter(|item| query.matches(item))
            .cloned()
            .collect();

        output.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(limit) = query.limit {
            output.truncate(limit);
        }

        Ok(output)
    }

    fn total(&self) -> anyhow::Result<usize> {
        Ok(self.list.read().unwrap().len())
    }
}
