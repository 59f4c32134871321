//! File pool keyed by canonical path.
//!
//! Tools that recurse over dependency trees hit the same libraries over
//! and over; the pool hands back the already-open file instead. Entries
//! are weak: a file with no outside owner left is dropped, and the next
//! request re-opens it. The pool is an explicitly constructed value — no
//! process-wide registry.

use std::collections::HashMap;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::file::ElfFile;
use crate::ElfResult;

/// A pooled, file-backed [`ElfFile`].
pub type PooledFile = Arc<Mutex<ElfFile<BufReader<fs::File>>>>;

/// Weak-reference pool of open files.
#[derive(Default)]
pub struct FilePool {
    files: Mutex<HashMap<PathBuf, Weak<Mutex<ElfFile<BufReader<fs::File>>>>>>,
}

impl FilePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path`, reusing the live instance if one exists.
    ///
    /// Paths are canonicalized first, so different spellings of the same
    /// file share one entry.
    pub fn open(&self, path: impl AsRef<Path>) -> ElfResult<PooledFile> {
        let canonical = fs::canonicalize(path)?;
        let mut files = self.files.lock();

        if let Some(live) = files.get(&canonical).and_then(Weak::upgrade) {
            return Ok(live);
        }

        let file = Arc::new(Mutex::new(ElfFile::open(&canonical)?));
        files.insert(canonical, Arc::downgrade(&file));
        Ok(file)
    }

    /// Drop registry entries whose files are gone.
    pub fn prune(&self) {
        self.files.lock().retain(|_, weak| weak.strong_count() > 0);
    }

    /// Number of live pooled files.
    pub fn live_count(&self) -> usize {
        self.files
            .lock()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}
