// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory durable store for tests and ephemeral sessions.

use crate::db::DurableStore;
use crate::error::AppError;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Store backed by a shared map.
///
/// Clones share contents, so a test can keep a handle and inspect what the
/// session wrote. `set_unavailable(true)` makes writes fail the way a full or
/// locked browser store would.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, String>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Persistence(
                "Durable store unavailable (quota or permissions)".to_string(),
            ));
        }
        Ok(())
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), AppError> {
        self.check_available()?;
        for (key, value) in entries {
            self.entries.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), AppError> {
        // Removal never fails: clearing must always succeed.
        for key in keys {
            self.entries.remove(*key);
        }
        Ok(())
    }
}
