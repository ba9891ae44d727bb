// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON-file backed durable store.
//!
//! All entries live in one JSON object. Writes go to a hidden sibling temp
//! file that is synced and then renamed over the original, so a crash mid-write leaves either the old or
//! the new contents, never a mix.

use crate::db::DurableStore;
use crate::error::AppError;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable store persisted to a single JSON file.
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, AppError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                AppError::Persistence(format!("Corrupt store {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(AppError::Persistence(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| AppError::Persistence(format!("Failed to encode store: {}", e)))?;

        let tmp = self.temp_path()?;
        let write = |tmp: &Path| -> std::io::Result<()> {
            let mut file = File::create(tmp)?;
            file.write_all(json.as_bytes())?;
            // Contents must be on disk before the rename makes them visible
            file.sync_all()
        };
        write(&tmp).map_err(|e| {
            AppError::Persistence(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::Persistence(format!("Failed to replace {}: {}", self.path.display(), e))
        })
    }

    /// Hidden sibling `.{name}.tmp`, distinct from the store path whatever its extension.
    fn temp_path(&self) -> Result<PathBuf, AppError> {
        let file_name = self.path.file_name().ok_or_else(|| {
            AppError::Persistence(format!("Store path {} has no file name", self.path.display()))
        })?;
        let parent = self.path.parent().unwrap_or_else(|| Path::new(""));
        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let _guard = self.guard();
        Ok(self.read_map()?.remove(key))
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), AppError> {
        let _guard = self.guard();
        let mut map = self.read_map()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        self.write_map(&map)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), AppError> {
        let _guard = self.guard();
        // An unreadable file is as good as cleared: drop it.
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable store file");
                return match fs::remove_file(&self.path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(AppError::Persistence(e.to_string())),
                };
            }
        };
        for key in keys {
            map.remove(*key);
        }
        if map.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AppError::Persistence(e.to_string())),
            };
        }
        self.write_map(&map)
    }
}
