use crate::config::SyncConfig;
use std::path::PathBuf;
use walkdir::{DirEntry, WalkDir};

/// Enumerate every eligible file under the configured root, sorted by
/// path so bulk scans are deterministic for a given tree.
pub(crate) fn scan_eligible_files(config: &SyncConfig) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(&config.root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(entry.into_path()),
            Ok(_) => None,
            Err(err) => {
                log::warn!("Skipping unreadable entry during scan: {err}");
                None
            }
        })
        .filter(|path| config.matches_extension(path))
        .collect();
    paths.sort();
    paths
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_string_lossy()
            .starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.go", "b");
        write(&dir, "a.go", "a");
        write(&dir, "notes.txt", "n");
        write(&dir, "nested/c.go", "c");

        let config = SyncConfig::new(dir.path(), ["go"]);
        let paths = scan_eligible_files(&config);
        let rels: Vec<_> = paths
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rels,
            vec![
                PathBuf::from("a.go"),
                PathBuf::from("b.go"),
                PathBuf::from("nested/c.go"),
            ]
        );
    }

    #[test]
    fn scan_skips_hidden_directories_and_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.go", "a");
        write(&dir, ".git/objects/x.go", "x");
        write(&dir, ".hidden.go", "h");

        let config = SyncConfig::new(dir.path(), ["go"]);
        let paths = scan_eligible_files(&config);
        assert_eq!(paths, vec![dir.path().join("a.go")]);
    }
}
