//! [`KnowledgeDir`] builder for local document trees.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory holding dataset folders and sync config files.
///
/// # Example
///
/// ```rust,no_run
/// use kb_test_utils::KnowledgeDir;
///
/// let dir = KnowledgeDir::new();
/// dir.write_doc("handbook", "intro.md", "# Intro");
/// let config = dir.write_config("kb-sync.yaml", "datasets: []");
/// ```
pub struct KnowledgeDir {
    temp_dir: TempDir,
}

impl Default for KnowledgeDir {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeDir {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of a dataset folder; not created until a document is written.
    pub fn dataset_path(&self, dataset_dir: &str) -> PathBuf {
        self.root().join(dataset_dir)
    }

    /// Write `content` to `<dataset_dir>/<filename>`, creating the folder.
    pub fn write_doc(&self, dataset_dir: &str, filename: &str, content: &str) -> PathBuf {
        let dir = self.dataset_path(dataset_dir);
        fs::create_dir_all(&dir)
            .unwrap_or_else(|e| panic!("write_doc: failed to create {}: {e}", dir.display()));
        let path = dir.join(filename);
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("write_doc: failed to write {}: {e}", path.display()));
        path
    }

    pub fn remove_doc(&self, dataset_dir: &str, filename: &str) {
        let path = self.dataset_path(dataset_dir).join(filename);
        fs::remove_file(&path)
            .unwrap_or_else(|e| panic!("remove_doc: failed to remove {}: {e}", path.display()));
    }

    /// Write a config file at the root and return its path.
    pub fn write_config(&self, filename: &str, content: &str) -> PathBuf {
        let path = self.root().join(filename);
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("write_config: failed to write {}: {e}", path.display()));
        path
    }
}
