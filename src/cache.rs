use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::csv_reader::read_data;
use crate::dataset::Table;
use crate::error::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Unchanged,
    Reloaded,
}

#[derive(Debug)]
struct Entry {
    modified: SystemTime,
    loaded_at: DateTime<Local>,
    table: Arc<Table>,
}

/// Loaded table for one source file. The entry is reused until the file's
/// modification time changes or [`SnapshotCache::invalidate`] is called.
#[derive(Debug)]
pub struct SnapshotCache {
    path: PathBuf,
    entry: Option<Entry>,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SnapshotCache {
            path: path.into(),
            entry: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn loaded_at(&self) -> Option<DateTime<Local>> {
        self.entry.as_ref().map(|e| e.loaded_at)
    }

    pub fn invalidate(&mut self) {
        debug!(path = %self.path.display(), "snapshot invalidated");
        self.entry = None;
    }

    /// Current table, re-reading the file when it changed on disk. A failed
    /// read drops the cached entry so no stale table outlives a broken source.
    pub fn snapshot(&mut self) -> Result<(Arc<Table>, Refresh), LoadError> {
        let modified = match self.modified() {
            Ok(modified) => modified,
            Err(err) => {
                self.entry = None;
                return Err(err);
            }
        };
        if let Some(entry) = &self.entry {
            if entry.modified == modified {
                return Ok((Arc::clone(&entry.table), Refresh::Unchanged));
            }
        }

        let started = Instant::now();
        let table = match read_data(&self.path) {
            Ok(table) => Arc::new(table),
            Err(err) => {
                self.entry = None;
                return Err(err);
            }
        };
        info!(
            path = %self.path.display(),
            rows = table.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded snapshot"
        );
        self.entry = Some(Entry {
            modified,
            loaded_at: Local::now(),
            table: Arc::clone(&table),
        });
        Ok((table, Refresh::Reloaded))
    }

    fn modified(&self) -> Result<SystemTime, LoadError> {
        fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .map_err(|source| LoadError::Io {
                path: self.path.clone(),
                source,
            })
    }
}
