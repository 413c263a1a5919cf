use serde::Serialize;

/// Outcome of the startup bulk scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    /// Files successfully indexed.
    pub files: usize,
    /// Chunks committed across those files.
    pub chunks: usize,
    /// Files that vanished or failed before committing.
    pub skipped: usize,
    pub errors: Vec<String>,
    pub time_ms: u64,
}

impl ScanStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_file(&mut self, chunks: usize) {
        self.files += 1;
        self.chunks += chunks;
    }

    pub(crate) fn add_error(&mut self, error: String) {
        self.skipped += 1;
        self.errors.push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn accumulates_files_and_errors() {
        let mut stats = ScanStats::new();
        stats.add_file(3);
        stats.add_file(1);
        stats.add_error("oops".to_string());

        assert_eq!(stats.files, 2);
        assert_eq!(stats.chunks, 4);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.errors, vec!["oops".to_string()]);
    }
}
