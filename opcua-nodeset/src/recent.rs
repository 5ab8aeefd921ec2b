use std::path::Path;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::NodesetMetadata;

/// Error reading or writing the recent imports file. Callers are free to ignore these,
/// the history is a convenience.
#[derive(Error, Debug)]
pub enum RecentImportsError {
    /// Reading or writing the file failed.
    #[error("Failed to access recent imports file: {0}")]
    Io(#[from] std::io::Error),
    /// The file content is not a valid recent imports list.
    #[error("Failed to parse recent imports: {0}")]
    Json(#[from] serde_json::Error),
}

/// An entry in the recent imports history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentImport {
    /// Identity of the import.
    pub id: Uuid,
    /// File name.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
    /// Time of the import.
    pub timestamp: DateTime<Utc>,
}

impl From<&NodesetMetadata> for RecentImport {
    fn from(value: &NodesetMetadata) -> Self {
        Self {
            id: value.id,
            name: value.file_name.clone(),
            size: value.size,
            timestamp: value.loaded_at,
        }
    }
}

/// Bounded history of imported files, most recent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentImports {
    limit: usize,
    entries: Vec<RecentImport>,
}

impl RecentImports {
    /// Create an empty history keeping at most `limit` entries.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: Vec::new(),
        }
    }

    /// Load the history from a JSON file.
    pub fn load(path: &Path, limit: usize) -> Result<Self, RecentImportsError> {
        let content = std::fs::read_to_string(path)?;
        let mut entries: Vec<RecentImport> = serde_json::from_str(&content)?;
        entries.truncate(limit);
        Ok(Self { limit, entries })
    }

    /// Load the history from a JSON file, starting over with an empty history if the file
    /// does not exist or cannot be read.
    pub fn load_or_default(path: &Path, limit: usize) -> Self {
        if !path.exists() {
            return Self::new(limit);
        }
        match Self::load(path, limit) {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    "Ignoring unreadable recent imports file {}: {e}",
                    path.display()
                );
                Self::new(limit)
            }
        }
    }

    /// Write the history to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), RecentImportsError> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Add an entry at the front. An earlier entry with the same name is removed,
    /// and the oldest entries are dropped beyond the limit.
    pub fn record(&mut self, entry: RecentImport) {
        self.entries.retain(|e| e.name != entry.name);
        self.entries.insert(0, entry);
        self.entries.truncate(self.limit);
    }

    /// Entries, most recent first.
    pub fn entries(&self) -> &[RecentImport] {
        &self.entries
    }

    /// Maximum number of entries.
    pub fn limit(&self) -> usize {
        self.limit
    }
}
