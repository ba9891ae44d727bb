// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: the single owner of the current identity and the shared
//! story collection.
//!
//! Every identity change (login, restore, logout) bumps a generation counter.
//! Remote calls capture a [`SessionTicket`] before they start and hand it back
//! to [`SessionStore::apply_if_current`] when they finish; results whose ticket
//! no longer matches are discarded instead of mutating a newer session.

use crate::db::{self, DurableStore};
use crate::error::{AppError, Result};
use crate::models::{Identity, LoginToken, Story, StoryCollection, StoryId, StoredCredentials};
use crate::services::{IdentityService, StoryService};
use futures_util::future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory session contents.
#[derive(Debug, Default)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub stories: StoryCollection,
}

/// Captured view of "who is logged in" at the start of a remote call.
#[derive(Debug, Clone)]
pub struct SessionTicket {
    pub generation: u64,
    pub username: String,
    pub token: LoginToken,
}

/// Outcome of applying a remote completion to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Local state now reflects the acknowledged change.
    Applied,
    /// Nothing needed to change (idempotent no-op).
    Unchanged,
    /// The identity the call was made for is no longer current.
    Discarded,
}

/// Process-wide session state with an explicit init/teardown lifecycle.
pub struct SessionStore {
    state: RwLock<SessionState>,
    generation: AtomicU64,
    initialized: AtomicBool,
    store: Arc<dyn DurableStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            generation: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
            store,
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────

    /// Startup sequence: restore the persisted identity and fetch the
    /// collection, whatever the outcome of the restore.
    ///
    /// Runs once; a second call fails without touching state.
    pub async fn initialize(
        &self,
        identities: &IdentityService,
        stories: &StoryService,
    ) -> Result<Option<Identity>> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Session already initialized"
            )));
        }

        let stored = match self.stored_credentials() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored credentials, starting anonymous");
                None
            }
        };

        // Restore and fetch are independent; both relink views by id.
        let restore = async {
            match &stored {
                Some(creds) => {
                    identities
                        .restore_from_token(Some(&creds.token), Some(&creds.username))
                        .await
                }
                None => None,
            }
        };
        let (restored, fetched) = future::join(restore, stories.fetch_all()).await;

        if let Some(identity) = restored {
            self.set_identity(identity);
        }
        fetched?;

        let identity = self.current_identity();
        match &identity {
            Some(id) => tracing::info!(username = %id.username, "Session initialized (logged in)"),
            None => tracing::info!("Session initialized (anonymous)"),
        }
        Ok(identity)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Make `identity` current. Invalidates all outstanding tickets.
    pub fn set_identity(&self, mut identity: Identity) -> u64 {
        let mut state = self.write();
        identity.relink(&state.stories);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(username = %identity.username, generation, "Identity set");
        state.identity = Some(identity);
        generation
    }

    /// Drop the identity and the durable entries. Always succeeds.
    pub fn clear(&self) {
        {
            let mut state = self.write();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(identity) = state.identity.take() {
                tracing::info!(username = %identity.username, generation, "Identity cleared");
            }
        }

        if let Err(e) = db::clear_credentials(self.store.as_ref()) {
            tracing::warn!(error = %e, "Failed to clear stored credentials");
        }
    }

    // ─── Durable Store ───────────────────────────────────────────

    /// Write the identity's token and username to the durable store.
    pub fn persist(&self, identity: &Identity) -> Result<()> {
        db::save_credentials(self.store.as_ref(), &identity.credentials()).map_err(|e| {
            tracing::warn!(username = %identity.username, error = %e, "Failed to persist credentials");
            match e {
                AppError::Persistence(_) => e,
                other => AppError::Persistence(other.to_string()),
            }
        })
    }

    pub fn stored_credentials(&self) -> Result<Option<StoredCredentials>> {
        db::load_credentials(self.store.as_ref())
    }

    // ─── Reads ───────────────────────────────────────────────────

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.read().identity.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().identity.is_some()
    }

    /// Capture the current identity for a remote call, if any.
    pub fn ticket(&self) -> Option<SessionTicket> {
        let state = self.read();
        state.identity.as_ref().map(|identity| SessionTicket {
            generation: self.generation(),
            username: identity.username.clone(),
            token: identity.login_token.clone(),
        })
    }

    /// True while the ticket's identity is still the current one.
    pub fn is_current(&self, ticket: &SessionTicket) -> bool {
        self.with_current(ticket, |_, _| ()).is_some()
    }

    /// Run `f` against the state only if the ticket's identity is current.
    pub fn with_current<R>(
        &self,
        ticket: &SessionTicket,
        f: impl FnOnce(&Identity, &StoryCollection) -> R,
    ) -> Option<R> {
        let state = self.read();
        match &state.identity {
            Some(identity)
                if self.generation() == ticket.generation
                    && identity.username == ticket.username =>
            {
                Some(f(identity, &state.stories))
            }
            _ => None,
        }
    }

    pub fn stories(&self) -> StoryCollection {
        self.read().stories.clone()
    }

    pub fn find_story(&self, id: &StoryId) -> Option<Arc<Story>> {
        self.read().stories.get(id).cloned()
    }

    /// Run `f` against a consistent view of the whole state.
    pub fn with_state<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.read())
    }

    // ─── Writes ──────────────────────────────────────────────────

    /// Full replace of the collection. Identity views are relinked by id.
    pub fn replace_stories(&self, stories: Vec<Story>) -> usize {
        let mut state = self.write();
        let fresh = StoryCollection::from_stories(stories.into_iter().map(Arc::new));
        let count = fresh.len();
        if let Some(identity) = state.identity.as_mut() {
            identity.relink(&fresh);
        }
        state.stories = fresh;
        count
    }

    /// Apply a remote completion if the ticket's identity is still current.
    ///
    /// `f` runs under the write lock against the current identity and the
    /// collection, so its changes become visible all at once.
    pub fn apply_if_current<F>(&self, ticket: &SessionTicket, f: F) -> Completion
    where
        F: FnOnce(&mut Identity, &mut StoryCollection) -> bool,
    {
        let mut state = self.write();
        let current = self.generation();
        let SessionState { identity, stories } = &mut *state;

        match identity {
            Some(identity)
                if current == ticket.generation && identity.username == ticket.username =>
            {
                if f(identity, stories) {
                    Completion::Applied
                } else {
                    Completion::Unchanged
                }
            }
            _ => {
                tracing::warn!(
                    username = %ticket.username,
                    ticket_generation = ticket.generation,
                    current_generation = current,
                    "Discarding stale completion"
                );
                Completion::Discarded
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
