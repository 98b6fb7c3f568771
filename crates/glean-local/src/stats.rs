use glean_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::extract::reading_minutes;

/// Running "reading time saved" counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingStats {
    pub total_saved_minutes: u64,
    pub summaries: u64,
}

#[derive(Debug, Clone)]
pub struct StatsFile {
    path: PathBuf,
}

impl StatsFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `stats.json` next to the library records.
    pub fn in_dir(dir: &std::path::Path) -> Self {
        Self::new(dir.join("stats.json"))
    }

    /// Missing or unreadable stats start from zero.
    pub fn load(&self) -> ReadingStats {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), error = %e, "resetting unreadable stats");
                ReadingStats::default()
            }),
            Err(_) => ReadingStats::default(),
        }
    }

    /// Credit the reading time of `article` to the counter.
    pub fn record_summary(&self, article: &str) -> Result<ReadingStats> {
        let mut stats = self.load();
        stats.total_saved_minutes += reading_minutes(article);
        stats.summaries += 1;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec(&stats).map_err(|e| Error::Store(e.to_string()))?;
        fs::write(&self.path, bytes)?;
        Ok(stats)
    }
}
