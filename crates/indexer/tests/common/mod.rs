use async_trait::async_trait;
use semsync_indexer::{IndexSynchronizer, SyncHealth};
use semsync_vector_store::{EmbedError, EmbeddingProvider};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Deterministic embedder for tests: the vector is a pure function of
/// the chunk text, so search results can be predicted exactly. Chunks
/// whose text starts with a registered prefix can be delayed (to force
/// stale-result races) or failed (to exercise abort paths).
pub struct TestEmbedder {
    dimension: usize,
    calls: AtomicU64,
    seen: Mutex<Vec<String>>,
    delays: Mutex<Vec<(String, Duration)>>,
    failures: Mutex<Vec<String>>,
}

impl TestEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicU64::new(0),
            seen: Mutex::new(Vec::new()),
            delays: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn delay_prefix(&self, prefix: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .push((prefix.to_string(), delay));
    }

    pub fn fail_prefix(&self, prefix: &str) {
        self.failures.lock().unwrap().push(prefix.to_string());
    }

    /// Whether any chunk starting with `prefix` has reached the
    /// embedder yet.
    pub fn has_seen_prefix(&self, prefix: &str) -> bool {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .any(|text| text.starts_with(prefix))
    }

    pub fn vector_for(dimension: usize, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; dimension];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % dimension] += f32::from(byte);
        }
        if vector.iter().all(|component| *component == 0.0) {
            vector[0] = 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for TestEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(text.to_string());

        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| text.starts_with(prefix));
        if failure {
            return Err(EmbedError::Inference("test failure".to_string()));
        }

        let delay = self
            .delays
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| text.starts_with(prefix))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(Self::vector_for(self.dimension, text))
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Block until the published health satisfies `pred`, or panic after
/// five seconds.
pub async fn wait_for_health<F>(sync: &IndexSynchronizer, pred: F) -> SyncHealth
where
    F: Fn(&SyncHealth) -> bool,
{
    let mut rx = sync.health_stream();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let snapshot = rx.borrow_and_update().clone();
                if pred(&snapshot) {
                    return snapshot;
                }
            }
            if rx.changed().await.is_err() {
                panic!("health channel closed before condition held");
            }
        }
    })
    .await
    .expect("timed out waiting for health condition")
}
