use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::event::FileEvent;
use crate::scanner::scan_eligible_files;
use crate::stats::ScanStats;
use crate::watcher::spawn_fs_watcher;
use notify::RecommendedWatcher;
use semsync_chunker::{Chunker, ChunkerConfig};
use semsync_vector_store::{EmbedError, EmbeddingProvider, SearchHit, VectorStore};
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, watch, Mutex as TokioMutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

/// Observable state of a running synchronizer, published on a watch
/// channel after every change.
#[derive(Debug, Clone, Serialize)]
pub struct SyncHealth {
    /// Files currently tracked in the index.
    pub files: usize,
    /// Chunks currently committed across all tracked files.
    pub chunks: usize,
    /// Updates scheduled but not yet committed, discarded, or failed.
    pub pending_updates: usize,
    pub updates_applied: u64,
    /// Completed updates dropped because a newer generation superseded
    /// them before commit.
    pub updates_discarded: u64,
    pub updates_failed: u64,
    pub last_error: Option<String>,
    pub last_scan: Option<ScanStats>,
}

impl SyncHealth {
    fn initial() -> Self {
        Self {
            files: 0,
            chunks: 0,
            pending_updates: 0,
            updates_applied: 0,
            updates_discarded: 0,
            updates_failed: 0,
            last_error: None,
            last_scan: None,
        }
    }
}

/// Point-in-time view of one tracked file, answered by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub generation: u64,
    pub chunk_ids: Vec<i64>,
}

/// Keeps a vector store consistent with the current contents of a
/// watched source tree.
///
/// One coordinator task owns the path→ids map; per-file work (read,
/// chunk, embed) runs on bounded concurrent workers whose results are
/// committed only if no newer notification for the same path arrived in
/// the meantime. See [`IndexSynchronizer::start`].
#[derive(Clone)]
pub struct IndexSynchronizer {
    inner: Arc<SyncInner>,
}

struct SyncInner {
    command_tx: mpsc::Sender<Command>,
    health_tx: watch::Sender<SyncHealth>,
    store: Arc<dyn VectorStore>,
    _watcher: std::sync::Mutex<Option<RecommendedWatcher>>,
    _health_guard: TokioMutex<watch::Receiver<SyncHealth>>,
    join: TokioMutex<Option<JoinHandle<()>>>,
}

enum Command {
    TrackedFile {
        path: PathBuf,
        reply: oneshot::Sender<Option<FileSnapshot>>,
    },
    TrackedPaths {
        reply: oneshot::Sender<Vec<PathBuf>>,
    },
    Shutdown,
}

impl IndexSynchronizer {
    /// Subscribe a recursive watcher on `config.root`, bulk-scan the
    /// tree, then keep the store in sync with live filesystem events.
    ///
    /// The bulk scan completes before this returns; notifications that
    /// arrive while it runs queue in the event channel and are replayed
    /// afterward, never lost.
    pub async fn start(
        config: SyncConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        config.validate()?;
        let (event_tx, event_rx) = mpsc::channel(config.event_queue_size);
        let watcher = spawn_fs_watcher(&config.root, event_tx)?;
        Self::start_inner(config, embedder, store, event_rx, Some(watcher)).await
    }

    /// Like [`start`](Self::start), but driven by a caller-supplied
    /// event channel instead of an OS watcher. This is the seam tests
    /// use to drive ordering-sensitive scenarios deterministically.
    pub async fn start_with_events(
        config: SyncConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        event_rx: mpsc::Receiver<FileEvent>,
    ) -> Result<Self> {
        config.validate()?;
        Self::start_inner(config, embedder, store, event_rx, None).await
    }

    async fn start_inner(
        config: SyncConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        event_rx: mpsc::Receiver<FileEvent>,
        watcher: Option<RecommendedWatcher>,
    ) -> Result<Self> {
        let chunker = Chunker::new(ChunkerConfig {
            max_chunk_chars: config.max_chunk_chars,
        })?;
        let (command_tx, command_rx) = mpsc::channel(16);
        let (outcome_tx, mut outcome_rx) = mpsc::channel(config.max_concurrent_updates);
        let (health_tx, health_rx) = watch::channel(SyncHealth::initial());

        let ctx = Arc::new(WorkerCtx {
            chunker,
            embedder,
            dimension: config.embedding_dimension,
            permits: Arc::new(Semaphore::new(config.max_concurrent_updates)),
            outcome_tx,
        });

        let mut coordinator = Coordinator {
            config,
            ctx,
            store: store.clone(),
            files: HashMap::new(),
            generations: HashMap::new(),
            next_id: 1,
            health: SyncHealth::initial(),
            health_tx: health_tx.clone(),
        };

        let stats = coordinator.bulk_scan(&mut outcome_rx).await;
        log::info!(
            "Bulk scan indexed {} files / {} chunks in {}ms ({} skipped)",
            stats.files,
            stats.chunks,
            stats.time_ms,
            stats.skipped
        );
        coordinator.health.last_scan = Some(stats);
        coordinator.publish_health();

        let join = tokio::spawn(coordinator.run(event_rx, command_rx, outcome_rx));

        Ok(Self {
            inner: Arc::new(SyncInner {
                command_tx,
                health_tx,
                store,
                _watcher: std::sync::Mutex::new(watcher),
                _health_guard: TokioMutex::new(health_rx),
                join: TokioMutex::new(Some(join)),
            }),
        })
    }

    /// Passthrough to [`VectorStore::search`]. Never blocked by the
    /// write path; indexing failures elsewhere do not surface here.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        Ok(self.inner.store.search(query, k).await?)
    }

    #[must_use]
    pub fn health_snapshot(&self) -> SyncHealth {
        self.inner.health_tx.subscribe().borrow().clone()
    }

    #[must_use]
    pub fn health_stream(&self) -> watch::Receiver<SyncHealth> {
        self.inner.health_tx.subscribe()
    }

    /// Current index entry for `path`, or `None` if untracked (or the
    /// synchronizer has stopped).
    pub async fn tracked_file(&self, path: &Path) -> Option<FileSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(Command::TrackedFile {
                path: path.to_path_buf(),
                reply,
            })
            .await
            .ok()?;
        rx.await.ok().flatten()
    }

    /// Sorted list of all tracked paths.
    pub async fn tracked_paths(&self) -> Vec<PathBuf> {
        let (reply, rx) = oneshot::channel();
        if self
            .inner
            .command_tx
            .send(Command::TrackedPaths { reply })
            .await
            .is_err()
        {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Stop consuming events and shut the coordinator down. In-flight
    /// updates are abandoned; whatever was last committed stays
    /// committed.
    pub async fn stop(&self) {
        let _ = self.inner.command_tx.send(Command::Shutdown).await;
        if let Some(handle) = self.inner.join.lock().await.take() {
            let _ = handle.await;
        }
        if let Ok(mut guard) = self.inner._watcher.lock() {
            guard.take();
        }
    }
}

impl Drop for IndexSynchronizer {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let _ = self.inner.command_tx.try_send(Command::Shutdown);
        }
    }
}

struct WatchedFile {
    generation: u64,
    chunk_ids: Vec<i64>,
    fingerprint: u64,
}

struct WorkerCtx {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    dimension: usize,
    permits: Arc<Semaphore>,
    outcome_tx: mpsc::Sender<WorkerOutcome>,
}

struct CompletedUpdate {
    path: PathBuf,
    generation: u64,
    vectors: Vec<Vec<f32>>,
    fingerprint: u64,
}

enum WorkerOutcome {
    Ready(CompletedUpdate),
    /// The file vanished (or was a directory) before it could be read.
    Skipped { path: PathBuf },
    Failed { path: PathBuf, error: SyncError },
}

enum OutcomeResult {
    Applied { chunks: usize },
    Discarded,
    Skipped,
    Failed(String),
}

struct Coordinator {
    config: SyncConfig,
    ctx: Arc<WorkerCtx>,
    store: Arc<dyn VectorStore>,
    files: HashMap<PathBuf, WatchedFile>,
    /// Latest generation handed out per path. An update commits only if
    /// its captured generation still equals this value. Entries outlive
    /// delete and rename so a late result for a removed path still
    /// fails the check; growth is bounded by the set of paths ever seen
    /// under the root.
    generations: HashMap<PathBuf, u64>,
    next_id: i64,
    health: SyncHealth,
    health_tx: watch::Sender<SyncHealth>,
}

impl Coordinator {
    /// Index every eligible file under the root, one at a time in path
    /// order, so id assignment is deterministic for a given tree.
    async fn bulk_scan(&mut self, outcome_rx: &mut mpsc::Receiver<WorkerOutcome>) -> ScanStats {
        let started = Instant::now();
        let mut stats = ScanStats::new();

        let paths = scan_eligible_files(&self.config);
        log::info!(
            "Bulk scan: {} eligible files under {}",
            paths.len(),
            self.config.root.display()
        );

        for path in paths {
            self.schedule_update(path);
            while self.health.pending_updates > 0 {
                let Some(outcome) = outcome_rx.recv().await else {
                    break;
                };
                match self.handle_outcome(outcome).await {
                    OutcomeResult::Applied { chunks } => stats.add_file(chunks),
                    OutcomeResult::Failed(error) => stats.add_error(error),
                    OutcomeResult::Skipped => stats.skipped += 1,
                    OutcomeResult::Discarded => {}
                }
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        {
            stats.time_ms = started.elapsed().as_millis() as u64;
            if stats.time_ms == 0 {
                stats.time_ms = 1;
            }
        }
        stats
    }

    async fn run(
        mut self,
        mut event_rx: mpsc::Receiver<FileEvent>,
        mut command_rx: mpsc::Receiver<Command>,
        mut outcome_rx: mpsc::Receiver<WorkerOutcome>,
    ) {
        loop {
            tokio::select! {
                maybe_event = event_rx.recv() => match maybe_event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        // The watch subscription died under us; the host
                        // decides whether to restart (which rescans).
                        log::error!("Watch subscription terminated; synchronizer exiting");
                        self.health.last_error = Some("watch subscription terminated".to_string());
                        self.publish_health();
                        break;
                    }
                },
                Some(outcome) = outcome_rx.recv() => {
                    self.handle_outcome(outcome).await;
                }
                maybe_cmd = command_rx.recv() => match maybe_cmd {
                    Some(Command::TrackedFile { path, reply }) => {
                        let snapshot = self.files.get(&path).map(|file| FileSnapshot {
                            generation: file.generation,
                            chunk_ids: file.chunk_ids.clone(),
                        });
                        let _ = reply.send(snapshot);
                    }
                    Some(Command::TrackedPaths { reply }) => {
                        let mut paths: Vec<PathBuf> = self.files.keys().cloned().collect();
                        paths.sort();
                        let _ = reply.send(paths);
                    }
                    Some(Command::Shutdown) | None => break,
                },
            }
        }
    }

    async fn handle_event(&mut self, event: FileEvent) {
        match event {
            FileEvent::Created(path) | FileEvent::Modified(path) => self.schedule_update(path),
            FileEvent::Deleted(path) => self.handle_delete(path).await,
            FileEvent::Renamed { from, to } => self.handle_rename(from, to).await,
        }
    }

    /// Assign the next generation for `path` and hand the read/chunk/
    /// embed work to a bounded worker. The assignment happens here, on
    /// the coordinator, so two rapid events for the same path can never
    /// race for the same generation.
    fn schedule_update(&mut self, path: PathBuf) {
        if !self.config.matches_extension(&path) {
            return;
        }
        let generation = self.bump_generation(&path);
        self.health.pending_updates += 1;
        self.publish_health();
        tokio::spawn(run_update(self.ctx.clone(), path, generation));
    }

    fn bump_generation(&mut self, path: &Path) -> u64 {
        let generation = self.generations.entry(path.to_path_buf()).or_insert(0);
        *generation += 1;
        *generation
    }

    async fn handle_outcome(&mut self, outcome: WorkerOutcome) -> OutcomeResult {
        self.health.pending_updates = self.health.pending_updates.saturating_sub(1);
        let result = match outcome {
            WorkerOutcome::Ready(update) => self.commit(update).await,
            WorkerOutcome::Skipped { path } => {
                log::debug!("File vanished before indexing: {}", path.display());
                OutcomeResult::Skipped
            }
            WorkerOutcome::Failed { path, error } => {
                let message = format!("{}: {error}", path.display());
                log::warn!("Update failed, previous index state kept: {message}");
                self.health.updates_failed += 1;
                self.health.last_error = Some(message.clone());
                OutcomeResult::Failed(message)
            }
        };
        self.publish_health();
        result
    }

    async fn commit(&mut self, update: CompletedUpdate) -> OutcomeResult {
        let latest = self.generations.get(&update.path).copied().unwrap_or(0);
        if update.generation != latest {
            log::debug!(
                "Discarding stale result for {} (generation {} superseded by {latest})",
                update.path.display(),
                update.generation
            );
            self.health.updates_discarded += 1;
            return OutcomeResult::Discarded;
        }

        let ids = self.allocate_ids(update.vectors.len());

        // Add before remove: a concurrent search sees old or new chunks
        // for this file, never neither.
        if let Err(err) = self.store.add_with_ids(&update.vectors, &ids).await {
            let message = format!("{}: {err}", update.path.display());
            log::warn!("Vector store add failed, update aborted: {message}");
            self.health.updates_failed += 1;
            self.health.last_error = Some(message.clone());
            return OutcomeResult::Failed(message);
        }

        let chunks = ids.len();
        let previous = self.files.insert(
            update.path.clone(),
            WatchedFile {
                generation: update.generation,
                chunk_ids: ids,
                fingerprint: update.fingerprint,
            },
        );
        if let Some(previous) = previous {
            self.remove_entry_ids(&update.path, &previous).await;
        }

        self.health.files = self.files.len();
        self.health.chunks += chunks;
        self.health.updates_applied += 1;
        log::debug!(
            "Indexed {} ({chunks} chunks, generation {})",
            update.path.display(),
            update.generation
        );
        OutcomeResult::Applied { chunks }
    }

    async fn handle_delete(&mut self, path: PathBuf) {
        if let Some(generation) = self.generations.get_mut(&path) {
            // Invalidate any in-flight update for this path.
            *generation += 1;
        }
        let Some(entry) = self.files.remove(&path) else {
            // Duplicate or late delete.
            return;
        };
        let chunks = entry.chunk_ids.len();
        self.remove_entry_ids(&path, &entry).await;
        self.health.files = self.files.len();
        self.publish_health();
        log::debug!("Deleted {} from index ({chunks} chunks)", path.display());
    }

    async fn handle_rename(&mut self, from: PathBuf, to: PathBuf) {
        if let Some(generation) = self.generations.get_mut(&from) {
            // In-flight work for the old path is now moot.
            *generation += 1;
        }

        let Some(entry) = self.files.remove(&from) else {
            // Untracked source. Editors commonly write `foo.tmp` and
            // rename it over `foo.go`, so an eligible destination is a
            // create, not a no-op.
            if self.config.matches_extension(&to) {
                self.schedule_update(to);
            }
            return;
        };

        if !self.config.matches_extension(&to) {
            // Renamed out of the indexed set.
            self.remove_entry_ids(&from, &entry).await;
            self.health.files = self.files.len();
            self.publish_health();
            return;
        }

        match tokio::fs::read(&to).await {
            Ok(bytes) if fingerprint_bytes(&bytes) == entry.fingerprint => {
                // Pure move: relocate the map key; ids and content are
                // untouched and nothing is re-embedded.
                if let Some(evicted) = self.files.remove(&to) {
                    self.remove_entry_ids(&to, &evicted).await;
                }
                let dest_latest = self.generations.get(&to).copied().unwrap_or(0);
                // Preserve the entry's generation unless the destination
                // path already advanced past it; generations stay
                // monotonic per path either way.
                let generation = if dest_latest >= entry.generation {
                    dest_latest + 1
                } else {
                    entry.generation
                };
                self.generations.insert(to.clone(), generation);
                log::debug!(
                    "Relocated {} -> {} ({} chunks preserved)",
                    from.display(),
                    to.display(),
                    entry.chunk_ids.len()
                );
                self.files.insert(
                    to,
                    WatchedFile {
                        generation,
                        chunk_ids: entry.chunk_ids,
                        fingerprint: entry.fingerprint,
                    },
                );
                self.health.files = self.files.len();
                self.publish_health();
            }
            _ => {
                // Content changed in flight, or the destination is
                // unreadable: degrade to delete(old) + create(new),
                // both through the generation mechanism.
                self.remove_entry_ids(&from, &entry).await;
                self.health.files = self.files.len();
                self.publish_health();
                self.schedule_update(to);
            }
        }
    }

    /// Remove an entry's ids from the store, tolerating failure: ids
    /// orphaned in the store with no map entry are cleaned up by the
    /// next restart's bulk scan.
    async fn remove_entry_ids(&mut self, path: &Path, entry: &WatchedFile) {
        if entry.chunk_ids.is_empty() {
            return;
        }
        if let Err(err) = self.store.remove_ids(&entry.chunk_ids).await {
            log::warn!(
                "Failed to remove superseded ids for {}: {err}",
                path.display()
            );
        }
        self.health.chunks = self.health.chunks.saturating_sub(entry.chunk_ids.len());
    }

    fn allocate_ids(&mut self, count: usize) -> Vec<i64> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(self.next_id);
            self.next_id += 1;
        }
        ids
    }

    fn publish_health(&self) {
        let _ = self.health_tx.send(self.health.clone());
    }
}

/// Read, chunk, and embed one file, then hand the result back to the
/// coordinator for the staleness check and commit. Every embedding must
/// succeed or the whole update is abandoned.
async fn run_update(ctx: Arc<WorkerCtx>, path: PathBuf, generation: u64) {
    let Ok(_permit) = ctx.permits.clone().acquire_owned().await else {
        return;
    };

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let _ = ctx.outcome_tx.send(WorkerOutcome::Skipped { path }).await;
            return;
        }
        Err(err) => {
            let is_dir = tokio::fs::metadata(&path)
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            let outcome = if is_dir {
                WorkerOutcome::Skipped { path }
            } else {
                WorkerOutcome::Failed {
                    path,
                    error: err.into(),
                }
            };
            let _ = ctx.outcome_tx.send(outcome).await;
            return;
        }
    };

    let fingerprint = fingerprint_bytes(&bytes);
    let text = String::from_utf8_lossy(&bytes);
    let chunks = ctx.chunker.split(&text);

    let mut join = JoinSet::new();
    for chunk in chunks {
        let embedder = ctx.embedder.clone();
        join.spawn(async move { (chunk.sequence, embedder.embed(&chunk.text).await) });
    }

    let mut vectors: Vec<Option<Vec<f32>>> = vec![None; join.len()];
    while let Some(joined) = join.join_next().await {
        let (sequence, result) = match joined {
            Ok(pair) => pair,
            Err(err) => {
                join.abort_all();
                let _ = ctx
                    .outcome_tx
                    .send(WorkerOutcome::Failed {
                        path,
                        error: SyncError::Other(format!("embedding task panicked: {err}")),
                    })
                    .await;
                return;
            }
        };
        match result {
            Ok(vector) if vector.len() == ctx.dimension => {
                vectors[sequence] = Some(vector);
            }
            Ok(vector) => {
                join.abort_all();
                let _ = ctx
                    .outcome_tx
                    .send(WorkerOutcome::Failed {
                        path,
                        error: EmbedError::DimensionMismatch {
                            expected: ctx.dimension,
                            actual: vector.len(),
                        }
                        .into(),
                    })
                    .await;
                return;
            }
            Err(err) => {
                // Partial embedding failure aborts the whole update;
                // the previous committed state stays untouched.
                join.abort_all();
                let _ = ctx
                    .outcome_tx
                    .send(WorkerOutcome::Failed {
                        path,
                        error: err.into(),
                    })
                    .await;
                return;
            }
        }
    }

    let Some(vectors) = vectors.into_iter().collect::<Option<Vec<_>>>() else {
        let _ = ctx
            .outcome_tx
            .send(WorkerOutcome::Failed {
                path,
                error: SyncError::Other("embedding produced an incomplete chunk set".to_string()),
            })
            .await;
        return;
    };

    let _ = ctx
        .outcome_tx
        .send(WorkerOutcome::Ready(CompletedUpdate {
            path,
            generation,
            vectors,
            fingerprint,
        }))
        .await;
}

fn fingerprint_bytes(bytes: &[u8]) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::fingerprint_bytes;

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(fingerprint_bytes(b"hello"), fingerprint_bytes(b"hello"));
    }

    #[test]
    fn fingerprint_differs_for_different_content() {
        assert_ne!(fingerprint_bytes(b"hello"), fingerprint_bytes(b"hellp"));
        assert_ne!(fingerprint_bytes(b""), fingerprint_bytes(b"\0"));
    }
}
