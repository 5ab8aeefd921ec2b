// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Configuration of the importer, and loading and saving of configuration files.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ConflictPolicy;

/// Error returned from saving or loading config objects.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration is invalid, with a list of validation errors.
    #[error("Invalid configuration: {}", .0.join(", "))]
    ConfigInvalid(Vec<String>),
    /// Reading or writing file failed.
    #[error("Failed to read or write configuration: {0}")]
    IO(#[from] std::io::Error),
    /// Failed to serialize or deserialize config object.
    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A trait that handles the loading / saving and validity of configuration information.
pub trait Config: Serialize {
    /// Save the configuration object to a file.
    fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Err(e) = self.validate() {
            return Err(ConfigError::ConfigInvalid(e));
        }
        let s = serde_yaml::to_string(&self)?;
        let mut f = File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Load the configuration object from the given path.
    fn load<A>(path: &Path) -> Result<A, ConfigError>
    where
        for<'de> A: Config + Deserialize<'de>,
    {
        let mut f = File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let config: A = serde_yaml::from_str(&s)?;
        config.validate().map_err(ConfigError::ConfigInvalid)?;
        Ok(config)
    }

    /// Validate the config struct, returning a list of validation errors if it fails.
    fn validate(&self) -> Result<(), Vec<String>>;
}

mod defaults {
    use crate::ConflictPolicy;

    pub fn max_file_size_mb() -> u64 {
        50
    }

    pub fn accepted_extensions() -> Vec<String> {
        vec![".xml".to_owned()]
    }

    pub fn conflict_policy() -> ConflictPolicy {
        ConflictPolicy::WarnAndContinue
    }

    pub fn preferred_locale() -> String {
        "en".to_owned()
    }

    pub fn read_timeout_ms() -> Option<u64> {
        Some(30_000)
    }

    pub fn recent_imports_limit() -> usize {
        5
    }
}

/// Settings of the import pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Largest accepted file, in megabytes.
    #[serde(default = "defaults::max_file_size_mb")]
    pub max_file_size_mb: u64,
    /// Accepted file name extensions, matched without regard to case.
    /// The leading dot is optional.
    #[serde(default = "defaults::accepted_extensions")]
    pub accepted_extensions: Vec<String>,
    /// What to do when a document declares an already loaded namespace.
    #[serde(default = "defaults::conflict_policy")]
    pub conflict_policy: ConflictPolicy,
    /// Locale preferred when picking display names and descriptions.
    #[serde(default = "defaults::preferred_locale")]
    pub preferred_locale: String,
    /// Timeout for reading a file from disk, in milliseconds. `None` means no timeout.
    #[serde(default = "defaults::read_timeout_ms")]
    pub read_timeout_ms: Option<u64>,
    /// File the recent imports are stored in, if any.
    #[serde(default)]
    pub recent_imports_path: Option<PathBuf>,
    /// Number of recent imports to keep.
    #[serde(default = "defaults::recent_imports_limit")]
    pub recent_imports_limit: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: defaults::max_file_size_mb(),
            accepted_extensions: defaults::accepted_extensions(),
            conflict_policy: defaults::conflict_policy(),
            preferred_locale: defaults::preferred_locale(),
            read_timeout_ms: defaults::read_timeout_ms(),
            recent_imports_path: None,
            recent_imports_limit: defaults::recent_imports_limit(),
        }
    }
}

impl ImportConfig {
    /// Size ceiling in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Whether a file name has one of the accepted extensions.
    pub fn accepts_file_name(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        self.accepted_extensions.iter().any(|ext| {
            let ext = ext.trim_start_matches('.').to_lowercase();
            !ext.is_empty()
                && name.len() > ext.len() + 1
                && name.ends_with(&ext)
                && name[..name.len() - ext.len()].ends_with('.')
        })
    }

    /// Timeout for reading a file from disk.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

impl Config for ImportConfig {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.max_file_size_mb == 0 {
            errors.push("max_file_size_mb must be greater than 0".to_owned());
        }
        if self
            .accepted_extensions
            .iter()
            .all(|e| e.trim_start_matches('.').is_empty())
        {
            errors.push("accepted_extensions must contain at least one extension".to_owned());
        }
        if self.read_timeout_ms == Some(0) {
            errors.push("read_timeout_ms must be greater than 0".to_owned());
        }
        if self.recent_imports_limit == 0 {
            errors.push("recent_imports_limit must be greater than 0".to_owned());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
