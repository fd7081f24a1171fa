use crate::errors::ExportResult;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Destination for export-to-file results
pub trait ExportStorage {
    fn write_export(&self, path: &Path, contents: &str) -> ExportResult<()>;

    /// Storage name for logging
    fn name(&self) -> &str;
}

/// Writes exports to the local filesystem, creating the export directory
/// when it does not exist yet.
pub struct FileStorage;

impl Default for FileStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStorage {
    pub fn new() -> Self {
        Self
    }
}

impl ExportStorage for FileStorage {
    fn write_export(&self, path: &Path, contents: &str) -> ExportResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Keeps exports in memory instead of writing them (dry runs, tests)
#[derive(Default)]
pub struct MemoryStorage {
    writes: Mutex<Vec<(PathBuf, String)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<(PathBuf, String)> {
        self.writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }
}

impl ExportStorage for MemoryStorage {
    fn write_export(&self, path: &Path, contents: &str) -> ExportResult<()> {
        if let Ok(mut writes) = self.writes.lock() {
            writes.push((path.to_path_buf(), contents.to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_creates_export_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("site/content/post.org");

        FileStorage::new().write_export(&path, "#+TITLE: Post\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "#+TITLE: Post\n");
    }

    #[test]
    fn test_memory_storage_records_writes() {
        let storage = MemoryStorage::new();
        storage.write_export(Path::new("/out/a.org"), "a").unwrap();
        assert_eq!(
            storage.writes(),
            vec![(PathBuf::from("/out/a.org"), "a".to_string())]
        );
    }
}
