//! Path -> (bytes, mtime) memoization shared across the preprocessing of one
//! top-level file and its recursive includes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::LoadError;

#[derive(Debug, Clone)]
struct CachedFile {
    bytes: String,
    mtime: Option<SystemTime>,
}

/// Memoizes file reads by canonical absolute path, keyed additionally on
/// mtime: a cache hit is only returned when the file's current mtime matches
/// what was cached, otherwise the entry is refreshed transparently.
#[derive(Debug, Default)]
pub struct IncludeCache {
    entries: HashMap<PathBuf, CachedFile>,
}

impl IncludeCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Reads `path`, reusing a cached copy when the file's mtime has not
    /// changed since it was last read.
    pub fn read(&mut self, path: &Path) -> Result<String, LoadError> {
        let mtime = fs::metadata(path).ok().and_then(|m| m.modified().ok());

        if let Some(cached) = self.entries.get(path) {
            if cached.mtime.is_some() && cached.mtime == mtime {
                return Ok(cached.bytes.clone());
            }
        }

        let bytes = fs::read_to_string(path).map_err(LoadError::Io)?;
        self.entries.insert(
            path.to_path_buf(),
            CachedFile {
                bytes: bytes.clone(),
                mtime,
            },
        );
        Ok(bytes)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
