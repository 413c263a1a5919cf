use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Configuration for one synchronizer instance. Immutable after
/// [`IndexSynchronizer::start`](crate::IndexSynchronizer::start).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Directory tree to watch and index.
    pub root: PathBuf,
    /// File extensions eligible for indexing, lowercase, without the
    /// leading dot.
    pub extensions: HashSet<String>,
    /// Maximum characters per chunk.
    pub max_chunk_chars: usize,
    /// Dimension every embedding must have.
    pub embedding_dimension: usize,
    /// Bound on concurrently running per-file updates.
    pub max_concurrent_updates: usize,
    /// Capacity of the filesystem event queue. When full, the watcher
    /// thread blocks until the synchronizer catches up; events are
    /// never dropped.
    pub event_queue_size: usize,
}

impl SyncConfig {
    pub fn new(
        root: impl Into<PathBuf>,
        extensions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(&ext.into()))
                .collect(),
            max_chunk_chars: 1000,
            embedding_dimension: 384,
            max_concurrent_updates: 16,
            event_queue_size: 1024,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(SyncError::InvalidConfig(format!(
                "root is not a directory: {}",
                self.root.display()
            )));
        }
        if self.embedding_dimension == 0 {
            return Err(SyncError::InvalidConfig(
                "embedding_dimension must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_updates == 0 {
            return Err(SyncError::InvalidConfig(
                "max_concurrent_updates must be greater than zero".to_string(),
            ));
        }
        if self.event_queue_size == 0 {
            return Err(SyncError::InvalidConfig(
                "event_queue_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `path` is eligible for indexing by extension.
    #[must_use]
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn extensions_are_normalized() {
        let config = SyncConfig::new("/tmp", [".Go", "RS"]);
        assert!(config.matches_extension(Path::new("main.go")));
        assert!(config.matches_extension(Path::new("lib.RS")));
        assert!(!config.matches_extension(Path::new("notes.txt")));
    }

    #[test]
    fn paths_without_extension_never_match() {
        let config = SyncConfig::new("/tmp", ["go"]);
        assert!(!config.matches_extension(Path::new("Makefile")));
        assert!(!config.matches_extension(Path::new(".gitignore")));
    }

    #[test]
    fn validate_rejects_missing_root() {
        let config = SyncConfig::new("/definitely/not/a/real/dir", ["go"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_dimension() {
        let mut config = SyncConfig::new(std::env::temp_dir(), ["go"]);
        config.embedding_dimension = 0;
        assert!(config.validate().is_err());
    }
}
