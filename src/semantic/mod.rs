pub mod embeddings;
pub mod ranker;

pub use embeddings::{EmbeddingProvider, HttpEmbeddings};
pub use ranker::{cosine_similarity, rank, RankedItem, DEFAULT_RESULT_LIMIT};
