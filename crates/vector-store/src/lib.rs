//! # Semsync Vector Store
//!
//! Collaborator interfaces for the index synchronizer:
//!
//! - [`EmbeddingProvider`]: text → fixed-dimension vector
//! - [`VectorStore`]: add-with-id / remove-by-id / k-nearest search
//!
//! Both are async traits so real backends (model servers, ANN engines)
//! can plug in without touching the synchronizer. [`MemoryVectorStore`]
//! is the reference store: brute-force cosine over an id→vector map,
//! safe for concurrent readers and writers.

mod error;
mod memory;
mod traits;

pub use error::{EmbedError, StoreError};
pub use memory::MemoryVectorStore;
pub use traits::{EmbeddingProvider, SearchHit, VectorStore};
