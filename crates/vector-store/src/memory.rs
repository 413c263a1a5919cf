use crate::error::StoreError;
use crate::traits::{SearchHit, VectorStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory vector store: an id→vector map with brute-force cosine
/// search. Not built for large corpora, but exact and thread-safe,
/// which is what the synchronizer's tests and small trees need.
pub struct MemoryVectorStore {
    dimension: usize,
    vectors: RwLock<HashMap<i64, Vec<f32>>>,
}

impl MemoryVectorStore {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Whether `id` is currently stored. Exposed for assertions on the
    /// id lifecycle.
    pub async fn contains(&self, id: i64) -> bool {
        self.vectors.read().await.contains_key(&id)
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add_with_ids(&self, vectors: &[Vec<f32>], ids: &[i64]) -> Result<(), StoreError> {
        if vectors.len() != ids.len() {
            return Err(StoreError::LengthMismatch {
                ids: ids.len(),
                vectors: vectors.len(),
            });
        }
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }

        let mut store = self.vectors.write().await;
        for id in ids {
            if store.contains_key(id) {
                return Err(StoreError::DuplicateId(*id));
            }
        }
        for (id, vector) in ids.iter().zip(vectors.iter()) {
            store.insert(*id, vector.clone());
        }
        log::debug!("Added {} vectors", ids.len());
        Ok(())
    }

    async fn remove_ids(&self, ids: &[i64]) -> Result<(), StoreError> {
        let mut store = self.vectors.write().await;
        let mut removed = 0usize;
        for id in ids {
            if store.remove(id).is_some() {
                removed += 1;
            }
        }
        log::debug!("Removed {removed} of {} requested ids", ids.len());
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, StoreError> {
        if query.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let store = self.vectors.read().await;
        let mut hits: Vec<SearchHit> = store
            .iter()
            .map(|(id, vector)| SearchHit {
                id: *id,
                score: Self::cosine_similarity(query, vector),
            })
            .collect();

        // Ties broken by id so results are stable across runs.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.vectors.read().await.len())
    }
}
