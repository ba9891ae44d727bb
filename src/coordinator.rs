// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! View coordinator: turns user intents into ordered service calls and
//! returns the snapshot to re-render.
//!
//! Concurrency rules:
//! - Mutations of the same identity or the same story never interleave. A
//!   second intent either waits its turn (FIFO) or is rejected, per
//!   [`ConflictPolicy`].
//! - Rendering waits until no mutation is in flight, so a snapshot never shows
//!   state that an outstanding call is about to change.
//! - Logout takes no entity lock. It invalidates the session at once and
//!   in-flight completions are discarded by the session's stale guard.
//! - An intent queued behind a lock runs only if the identity it was issued
//!   for is still current once the lock is granted.

use crate::config::{ConflictPolicy, Config};
use crate::db::DurableStore;
use crate::error::{AppError, Result};
use crate::models::{Identity, NewAccount, NewStory, StoryId};
use crate::services::{IdentityService, StoryApi, StoryService};
use crate::session::{Completion, SessionStore, SessionTicket};
use crate::view::{self, Notice, RenderSnapshot, View};
use dashmap::DashMap;
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// A user intent, the coordinator's single input.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Login {
        username: String,
        password: String,
    },
    CreateAccount {
        username: String,
        password: String,
        name: String,
    },
    Logout,
    Submit {
        title: String,
        url: String,
        author: String,
    },
    ToggleFavorite {
        story_id: String,
    },
    Delete {
        story_id: String,
    },
    Navigate {
        view: View,
    },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Login { .. } => "login",
            Intent::CreateAccount { .. } => "create_account",
            Intent::Logout => "logout",
            Intent::Submit { .. } => "submit",
            Intent::ToggleFavorite { .. } => "toggle_favorite",
            Intent::Delete { .. } => "delete",
            Intent::Navigate { .. } => "navigate",
        }
    }
}

/// Entities that mutations serialize on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// The "current identity" slot (login / account creation).
    Session,
    Identity(String),
    Story(StoryId),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Session => f.write_str("session"),
            EntityKey::Identity(username) => write!(f, "identity {}", username),
            EntityKey::Story(id) => write!(f, "story {}", id),
        }
    }
}

/// Shared per-entity locks.
pub type EntityLocks = Arc<DashMap<EntityKey, Arc<Mutex<()>>>>;

/// Dispatches intents; owns no business state.
pub struct ViewCoordinator {
    session: Arc<SessionStore>,
    identities: IdentityService,
    stories: StoryService,
    policy: ConflictPolicy,
    /// Per-entity mutex to serialize mutations.
    locks: EntityLocks,
    /// Mutations hold it shared; rendering takes it exclusively.
    render_gate: RwLock<()>,
    current_view: StdMutex<View>,
}

impl ViewCoordinator {
    /// Wire up the session, services and coordinator for `config`.
    pub fn new(config: &Config, api: Arc<dyn StoryApi>, store: Arc<dyn DurableStore>) -> Self {
        let session = Arc::new(SessionStore::new(store));
        let identities = IdentityService::new(Arc::clone(&api), Arc::clone(&session));
        let stories = StoryService::new(api, Arc::clone(&session), config.story_limit);
        Self {
            session,
            identities,
            stories,
            policy: config.conflict_policy,
            locks: Arc::new(DashMap::new()),
            render_gate: RwLock::new(()),
            current_view: StdMutex::new(View::All),
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn identities(&self) -> &IdentityService {
        &self.identities
    }

    pub fn stories(&self) -> &StoryService {
        &self.stories
    }

    /// Page-load sequence followed by the first render.
    pub async fn start(&self) -> Result<RenderSnapshot> {
        {
            let _gate = self.render_gate.read().await;
            self.session
                .initialize(&self.identities, &self.stories)
                .await?;
        }
        self.render(View::All).await
    }

    /// Handle one intent and return the snapshot of the affected view.
    pub async fn dispatch(&self, intent: Intent) -> Result<RenderSnapshot> {
        let name = intent.name();
        tracing::debug!(intent = name, "Dispatching intent");

        let result = self.handle(intent).await;
        if let Err(e) = &result {
            tracing::info!(intent = name, kind = e.kind(), error = %e, "Intent failed");
        }
        result
    }

    async fn handle(&self, intent: Intent) -> Result<RenderSnapshot> {
        match intent {
            Intent::Login { username, password } => {
                let saved = {
                    let _locks = self.acquire(vec![EntityKey::Session]).await?;
                    let _gate = self.render_gate.read().await;
                    let identity = self.identities.login(&username, &password).await?;
                    self.adopt(identity)
                };
                self.render_with(View::All, saved.err()).await
            }

            Intent::CreateAccount {
                username,
                password,
                name,
            } => {
                let saved = {
                    let _locks = self.acquire(vec![EntityKey::Session]).await?;
                    let _gate = self.render_gate.read().await;
                    let identity = self
                        .identities
                        .create_account(NewAccount {
                            username,
                            password,
                            name,
                        })
                        .await?;
                    self.adopt(identity)
                };
                self.render_with(View::All, saved.err()).await
            }

            Intent::Logout => {
                self.session.clear();
                self.render(View::All).await
            }

            Intent::Submit { title, url, author } => {
                {
                    let ticket = self.require_ticket("submit stories")?;
                    let _locks = self
                        .acquire_for(&ticket, vec![EntityKey::Identity(ticket.username.clone())])
                        .await?;
                    let _gate = self.render_gate.read().await;
                    self.stories
                        .submit_as(&ticket, NewStory::new(title, url, author))
                        .await?;
                }
                self.render(View::All).await
            }

            Intent::ToggleFavorite { story_id } => {
                let story_id = StoryId::new(story_id);
                {
                    let ticket = self.require_ticket("favorite stories")?;
                    let _locks = self
                        .acquire_for(
                            &ticket,
                            vec![
                                EntityKey::Identity(ticket.username.clone()),
                                EntityKey::Story(story_id.clone()),
                            ],
                        )
                        .await?;
                    let _gate = self.render_gate.read().await;
                    let outcome = self
                        .identities
                        .toggle_favorite_as(&ticket, &story_id)
                        .await?;
                    tracing::debug!(story_id = %story_id, ?outcome, "Favorite toggled");
                }
                self.render(self.view()).await
            }

            Intent::Delete { story_id } => {
                let story_id = StoryId::new(story_id);
                {
                    let ticket = self.require_ticket("delete stories")?;
                    let _locks = self
                        .acquire_for(
                            &ticket,
                            vec![
                                EntityKey::Identity(ticket.username.clone()),
                                EntityKey::Story(story_id.clone()),
                            ],
                        )
                        .await?;
                    let _gate = self.render_gate.read().await;
                    let outcome = self.stories.remove_as(&ticket, &story_id).await?;
                    if outcome == Completion::Discarded {
                        tracing::debug!(story_id = %story_id, "Delete completed after logout");
                    }
                }
                self.render(View::MyStories).await
            }

            Intent::Navigate { view } => {
                if view == View::All {
                    let _gate = self.render_gate.read().await;
                    self.stories.fetch_all().await?;
                }
                self.render(view).await
            }
        }
    }

    /// Make a freshly authenticated identity current and persist it.
    ///
    /// The session continues even if persisting fails; the error is handed
    /// back so it can be reported with the snapshot.
    fn adopt(&self, identity: Identity) -> Result<()> {
        let saved = self.session.persist(&identity);
        if let Err(e) = &saved {
            tracing::warn!(error = %e, "Continuing without durable session");
        }
        self.session.set_identity(identity);
        saved
    }

    fn require_ticket(&self, action: &str) -> Result<SessionTicket> {
        self.session
            .ticket()
            .ok_or_else(|| AppError::Authorization(format!("log in to {}", action)))
    }

    fn view(&self) -> View {
        *self
            .current_view
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Render `view` once no mutation is in flight.
    pub async fn render(&self, view: View) -> Result<RenderSnapshot> {
        self.render_with(view, None).await
    }

    async fn render_with(&self, view: View, notice: Option<AppError>) -> Result<RenderSnapshot> {
        let _gate = self.render_gate.write().await;
        let mut snapshot = self.session.with_state(|state| view::render(state, view))?;
        if let Some(err) = &notice {
            snapshot.notices.push(Notice::from(err));
        }
        *self
            .current_view
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = view;
        Ok(snapshot)
    }

    /// Number of entities with a lock currently held or awaited.
    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    /// Take the locks for an intent bound to `ticket`.
    ///
    /// Fails if the ticket's identity stopped being current while waiting.
    async fn acquire_for(
        &self,
        ticket: &SessionTicket,
        keys: Vec<EntityKey>,
    ) -> Result<Vec<EntityGuard>> {
        let guards = self.acquire(keys).await?;
        if !self.session.is_current(ticket) {
            return Err(AppError::Authorization(format!(
                "session for {} ended while the request was queued",
                ticket.username
            )));
        }
        Ok(guards)
    }

    /// Take the locks for `keys` in order, waiting or failing per policy.
    async fn acquire(&self, keys: Vec<EntityKey>) -> Result<Vec<EntityGuard>> {
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            let lock = self
                .locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();

            let guard = match self.policy {
                ConflictPolicy::Queue => lock.lock_owned().await,
                ConflictPolicy::Reject => match lock.try_lock_owned() {
                    Ok(guard) => guard,
                    Err(_) => {
                        tracing::info!(entity = %key, "Rejecting overlapping mutation");
                        return Err(AppError::ConcurrentModification(key.to_string()));
                    }
                },
            };
            guards.push(EntityGuard {
                key,
                guard: Some(guard),
                locks: Arc::clone(&self.locks),
            });
        }
        Ok(guards)
    }
}

/// Held entity lock. Releasing the last reference drops the map entry.
struct EntityGuard {
    key: EntityKey,
    guard: Option<OwnedMutexGuard<()>>,
    locks: EntityLocks,
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        self.guard.take();
        prune(&self.locks, &self.key);
    }
}

/// Remove `key` unless someone else still holds or awaits its lock.
fn prune(locks: &EntityLocks, key: &EntityKey) {
    locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
}
