//! File-store capability consumed by the session sources.

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};

/// Minimal read-only view of a filesystem.
pub trait FileStore: Send + Sync {
    /// Names of the entries directly inside `path`, sorted.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn mod_time(&self, path: &Path) -> io::Result<DateTime<Utc>>;

    fn exists(&self, path: &Path) -> bool;

    /// Read a file as text, replacing invalid UTF-8.
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read_file(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// [`FileStore`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

impl FileStore for LocalFileStore {
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn mod_time(&self, path: &Path) -> io::Result<DateTime<Utc>> {
        let modified = std::fs::metadata(path)?.modified()?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
