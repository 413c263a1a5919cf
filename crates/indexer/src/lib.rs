//! # Semsync Indexer
//!
//! Live synchronization between a watched source tree and a vector
//! search index.
//!
//! ## Pipeline
//!
//! ```text
//! Filesystem events ──┐
//!                     ├──> Coordinator (path→ids map, per-path generations)
//! Bulk scan ──────────┘          │
//!                                ├──> Worker: read → chunk → embed
//!                                │          └─> commit iff generation
//!                                │              is still the latest
//!                                └──> Vector store (add new, remove old)
//! ```
//!
//! A single coordinator task owns all mutable state. Workers for
//! different paths run concurrently; results for the same path are
//! serialized by the generation check, so the committed index always
//! reflects the most recently observed content for every file.
//!
//! ## Example
//!
//! ```no_run
//! use semsync_indexer::{IndexSynchronizer, SyncConfig};
//! use semsync_vector_store::MemoryVectorStore;
//! use std::sync::Arc;
//!
//! # async fn example(embedder: Arc<dyn semsync_vector_store::EmbeddingProvider>) -> anyhow::Result<()> {
//! let config = SyncConfig::new("/path/to/project", ["rs", "go"]);
//! let store = Arc::new(MemoryVectorStore::new(config.embedding_dimension));
//!
//! let sync = IndexSynchronizer::start(config, embedder, store).await?;
//! let hits = sync.search(&vec![0.0; 384], 10).await?;
//! sync.stop().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod event;
mod scanner;
mod stats;
mod sync;
mod watcher;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use event::FileEvent;
pub use stats::ScanStats;
pub use sync::{FileSnapshot, IndexSynchronizer, SyncHealth};
