//! File-backed progress cursor.
//!
//! A tiny JSON document rewritten after every confirmed unit. Loading never
//! fails: an absent or unreadable file means the harvest starts from the
//! zero cursor, which is always safe (re-fetching is allowed, skipping is
//! not).

use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::domain::progress::{ProgressCursor, ProgressStore};

pub struct FileProgressStore {
    path: PathBuf,
}

impl FileProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProgressStore for FileProgressStore {
    fn load(&self) -> ProgressCursor {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = ?self.path, "No progress file; starting from the beginning");
                return ProgressCursor::default();
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e,
                      "Progress file unreadable; starting from the beginning");
                return ProgressCursor::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(cursor) => {
                info!(path = ?self.path, ?cursor, "Resuming from persisted cursor");
                cursor
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e,
                      "Progress file corrupt; starting from the beginning");
                ProgressCursor::default()
            }
        }
    }

    fn save(&self, cursor: &ProgressCursor) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating progress directory {parent:?}"))?;
        }
        let content = serde_json::to_string_pretty(cursor).context("serializing cursor")?;
        // Write a sibling file and rename it into place; a crash mid-write
        // must never leave a half-written cursor at the real path.
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("writing progress file {tmp_path:?}"))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("replacing progress file {:?}", self.path))
    }
}
