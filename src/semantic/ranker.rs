use serde::Serialize;

use crate::items::Item;

pub const DEFAULT_RESULT_LIMIT: usize = 10;

/// Cosine similarity with lenient edges: mismatched lengths or a
/// zero-magnitude side yield exactly 0.0 instead of an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// An item annotated with its similarity to the query vector.
#[derive(Debug, Clone, Serialize)]
pub struct RankedItem {
    #[serde(flatten)]
    pub item: Item,
    pub similarity: f32,
}

/// Rank embedded items by descending cosine similarity against the query
/// vector. Items without an embedding are not candidates; ties keep their
/// incoming order (stable sort).
pub fn rank(query: &[f32], items: Vec<Item>, limit: usize) -> Vec<RankedItem> {
    let mut ranked: Vec<RankedItem> = items
        .into_iter()
        .filter_map(|item| {
            let similarity = item
                .embedding
                .as_deref()
                .map(|embedding| cosine_similarity(query, embedding))?;
            Some(RankedItem { item, similarity })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{ItemDraft, ItemMetadata, ItemStore, ItemType};

    const TOLERANCE: f32 = 1e-6;

    #[test]
    fn self_similarity_is_one() {
        let v = vec![0.5, -1.0, 2.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn mismatched_lengths_score_exactly_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn zero_vector_scores_exactly_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&b, &a), 0.0);
    }

    fn item_with_embedding(store: &crate::items::BackendJson, embedding: Vec<f32>) -> Item {
        let item = store
            .create(ItemDraft::default(), ItemType::Note, ItemMetadata::default())
            .unwrap();
        store.attach_embedding(&item.id, embedding).unwrap();
        store.get(&item.id).unwrap().unwrap()
    }

    #[test]
    fn ranking_orders_by_descending_similarity_and_truncates() {
        let tmp = tempfile::tempdir().unwrap();
        let store = crate::items::BackendJson::load(
            tmp.path().join("items.json").to_str().unwrap(),
        )
        .unwrap();

        // similarities vs [1, 0]: ~0.9, ~0.5, ~0.1
        let low = item_with_embedding(&store, vec![0.1, 0.995]);
        let high = item_with_embedding(&store, vec![0.9, 0.436]);
        let mid = item_with_embedding(&store, vec![0.5, 0.866]);

        let query = vec![1.0, 0.0];
        let ranked = rank(
            &query,
            vec![
                store.get(&low.id).unwrap().unwrap(),
                store.get(&high.id).unwrap().unwrap(),
                store.get(&mid.id).unwrap().unwrap(),
            ],
            2,
        );

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].item.id, high.id);
        assert_eq!(ranked[1].item.id, mid.id);
        assert!(ranked[0].similarity > ranked[1].similarity);
    }

    #[test]
    fn items_without_embeddings_are_not_candidates() {
        let tmp = tempfile::tempdir().unwrap();
        let store = crate::items::BackendJson::load(
            tmp.path().join("items.json").to_str().unwrap(),
        )
        .unwrap();

        let bare = store
            .create(ItemDraft::default(), ItemType::Note, ItemMetadata::default())
            .unwrap();
        let ranked = rank(&[1.0, 0.0], vec![bare], DEFAULT_RESULT_LIMIT);
        assert!(ranked.is_empty());
    }
}
