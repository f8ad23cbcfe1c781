// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Persistent crawl state for one feed. Passed by value through a
/// synchronization pass and saved back updated; the engine never mutates
/// registry state in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
    pub url: String,
    /// Cache validator from the last successful crawl
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_crawled: Option<DateTime<Utc>>,
    /// Identities of every episode ever seen on this feed
    #[serde(default)]
    pub known_guids: HashSet<String>,
}

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            etag: None,
            last_crawled: None,
            known_guids: HashSet::new(),
        }
    }
}

/// The external feed registry, specified at its interface boundary.
///
/// `save` is keyed by the feed's pre-pass URL so that a relocated feed
/// updates its existing record instead of inserting a second one.
pub trait FeedRegistry: Send + Sync {
    fn load_all(&self) -> Result<Vec<FeedSource>, RegistryError>;
    fn save(&self, previous_url: &str, source: &FeedSource) -> Result<(), RegistryError>;
}

/// File-backed registry: a pretty-printed JSON array of [`FeedSource`]
/// records. A hand-written file listing only `url` values is valid; the
/// other fields default. Saves rewrite the whole file under a lock so
/// concurrent workers cannot interleave.
pub struct JsonFileRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileRegistry {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn read_entries(&self) -> Result<Vec<FeedSource>, RegistryError> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|source| RegistryError::ReadFailed {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| RegistryError::ParseFailed {
            path: self.path.clone(),
            source,
        })
    }

    fn write_entries(&self, entries: &[FeedSource]) -> Result<(), RegistryError> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json).map_err(|source| RegistryError::WriteFailed {
            path: self.path.clone(),
            source,
        })
    }
}

impl FeedRegistry for JsonFileRegistry {
    fn load_all(&self) -> Result<Vec<FeedSource>, RegistryError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.read_entries()
    }

    fn save(&self, previous_url: &str, source: &FeedSource) -> Result<(), RegistryError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut entries = self.read_entries()?;
        let Some(entry) = entries.iter_mut().find(|entry| entry.url == previous_url) else {
            return Err(RegistryError::UnknownFeed {
                url: previous_url.to_string(),
            });
        };
        *entry = source.clone();

        self.write_entries(&entries)
    }
}
