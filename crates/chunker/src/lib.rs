//! # Semsync Chunker
//!
//! Deterministic fixed-width text chunking for embedding.
//!
//! Files are split into windows of at most `max_chunk_chars` characters.
//! Concatenating the chunks in sequence order reproduces the input
//! exactly, which is what lets the synchronizer treat a file's chunk set
//! as a faithful stand-in for its content.
//!
//! ## Example
//!
//! ```
//! use semsync_chunker::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig { max_chunk_chars: 4 })?;
//! let chunks = chunker.split("hello world");
//!
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(chunks[0].text, "hell");
//! # Ok::<(), semsync_chunker::ChunkerError>(())
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("Invalid chunker config: {0}")]
    InvalidConfig(String),
}

/// A bounded slice of a file's text, the unit submitted for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk within its file, starting at 0.
    pub sequence: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Maximum characters per chunk. Counted in `char`s, not bytes, so
    /// multi-byte text never splits mid-character.
    pub max_chunk_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 1000,
        }
    }
}

/// Splits text into fixed-width chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self, ChunkerError> {
        if config.max_chunk_chars == 0 {
            return Err(ChunkerError::InvalidConfig(
                "max_chunk_chars must be greater than zero".to_string(),
            ));
        }
        Ok(Self { config })
    }

    #[must_use]
    pub const fn max_chunk_chars(&self) -> usize {
        self.config.max_chunk_chars
    }

    /// Split `text` into `ceil(chars / max_chunk_chars)` ordered chunks.
    ///
    /// Empty input yields no chunks; no produced chunk is ever empty.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let max = self.config.max_chunk_chars;
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut count = 0usize;

        for ch in text.chars() {
            current.push(ch);
            count += 1;
            if count == max {
                chunks.push(Chunk {
                    sequence: chunks.len(),
                    text: std::mem::take(&mut current),
                });
                count = 0;
            }
        }

        if !current.is_empty() {
            chunks.push(Chunk {
                sequence: chunks.len(),
                text: current,
            });
        }

        chunks
    }
}
