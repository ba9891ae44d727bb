// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test fixtures: an in-memory story service and coordinator builders.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use story_session::config::{Config, ConflictPolicy};
use story_session::db::MemoryStore;
use story_session::models::{LoginToken, NewAccount, NewStory, Story, StoryId};
use story_session::services::{AuthResponse, RemoteError, StoryApi, UserPayload};
use story_session::ViewCoordinator;
use tokio::sync::{Notify, Semaphore};

#[derive(Clone)]
struct FakeUser {
    password: String,
    name: String,
    favorites: Vec<StoryId>,
}

#[derive(Default)]
struct FakeState {
    users: HashMap<String, FakeUser>,
    /// token -> username
    tokens: HashMap<String, String>,
    /// Newest first
    stories: Vec<Story>,
    next_id: u64,
}

/// In-memory stand-in for the story service.
///
/// Server-side state changes happen immediately; with a hold installed, the
/// *response* to favorite/submit calls is delayed until the test releases it.
#[derive(Default)]
pub struct FakeStoryApi {
    state: Mutex<FakeState>,
    offline: AtomicBool,
    fail_favorites: AtomicBool,
    hold: Mutex<Option<Arc<Semaphore>>>,
    entered: Arc<Notify>,
    favorite_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

pub fn token_for(username: &str) -> String {
    format!("token-{}", username)
}

impl FakeStoryApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_user(&self, username: &str, password: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.users.insert(
            username.to_string(),
            FakeUser {
                password: password.to_string(),
                name: name.to_string(),
                favorites: vec![],
            },
        );
        state.tokens.insert(token_for(username), username.to_string());
    }

    /// Add a story owned by `owner` at the front of the server list.
    pub fn seed_story(&self, id: &str, owner: &str, title: &str) {
        let mut state = self.state.lock().unwrap();
        state.stories.insert(0, make_story(id, owner, title));
    }

    pub fn seed_favorite(&self, username: &str, id: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.get_mut(username) {
            user.favorites.push(StoryId::from(id));
        }
    }

    pub fn revoke_tokens(&self) {
        self.state.lock().unwrap().tokens.clear();
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_fail_favorites(&self, fail: bool) {
        self.fail_favorites.store(fail, Ordering::SeqCst);
    }

    /// Delay responses until permits are added to the returned semaphore.
    pub fn hold_responses(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.hold.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Resolves once a held call has reached the service.
    pub async fn call_entered(&self) {
        self.entered.notified().await;
    }

    pub fn favorite_calls(&self) -> usize {
        self.favorite_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn server_favorites(&self, username: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .users
            .get(username)
            .map(|u| u.favorites.iter().map(|id| id.to_string()).collect())
            .unwrap_or_default()
    }

    pub fn server_story_ids(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .stories
            .iter()
            .map(|s| s.story_id.to_string())
            .collect()
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    async fn maybe_hold(&self) {
        let gate = self.hold.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.entered.notify_one();
            gate.acquire().await.unwrap().forget();
        }
    }

    fn authorize(&self, token: &LoginToken) -> Result<String, RemoteError> {
        let state = self.state.lock().unwrap();
        state
            .tokens
            .get(token.expose())
            .cloned()
            .ok_or_else(|| rejected(401, "Invalid token"))
    }

    fn user_payload(state: &FakeState, username: &str) -> Option<UserPayload> {
        let user = state.users.get(username)?;
        let resolve = |id: &StoryId| state.stories.iter().find(|s| &s.story_id == id).cloned();
        Some(UserPayload {
            username: username.to_string(),
            name: user.name.clone(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
            favorites: user.favorites.iter().filter_map(resolve).collect(),
            stories: state
                .stories
                .iter()
                .filter(|s| s.username == username)
                .cloned()
                .collect(),
        })
    }

    async fn toggle(
        &self,
        token: &LoginToken,
        username: &str,
        story_id: &StoryId,
        add: bool,
    ) -> Result<UserPayload, RemoteError> {
        self.check_online()?;
        self.favorite_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_favorites.load(Ordering::SeqCst) {
            return Err(rejected(500, "favorite backend down"));
        }
        let owner = self.authorize(token)?;
        if owner != username {
            return Err(rejected(401, "Token does not match user"));
        }

        let payload = {
            let mut state = self.state.lock().unwrap();
            if !state.stories.iter().any(|s| &s.story_id == story_id) {
                return Err(rejected(404, "No such story"));
            }
            let user = state.users.get_mut(username).unwrap();
            user.favorites.retain(|id| id != story_id);
            if add {
                user.favorites.push(story_id.clone());
            }
            Self::user_payload(&state, username).unwrap()
        };

        self.maybe_hold().await;
        Ok(payload)
    }
}

pub fn rejected(status: u16, message: &str) -> RemoteError {
    RemoteError::Rejected {
        status,
        message: message.to_string(),
    }
}

pub fn make_story(id: &str, owner: &str, title: &str) -> Story {
    Story {
        story_id: StoryId::from(id),
        title: title.to_string(),
        url: format!("https://www.example.com/{}", id),
        author: "Some Author".to_string(),
        username: owner.to_string(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl StoryApi for FakeStoryApi {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, RemoteError> {
        self.check_online()?;
        let state = self.state.lock().unwrap();
        match state.users.get(username) {
            Some(user) if user.password == password => Ok(AuthResponse {
                token: token_for(username),
                user: Self::user_payload(&state, username).unwrap(),
            }),
            _ => Err(rejected(401, "Invalid credentials")),
        }
    }

    async fn signup(&self, account: &NewAccount) -> Result<AuthResponse, RemoteError> {
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        if state.users.contains_key(&account.username) {
            return Err(rejected(409, "Username already exists"));
        }
        state.users.insert(
            account.username.clone(),
            FakeUser {
                password: account.password.clone(),
                name: account.name.clone(),
                favorites: vec![],
            },
        );
        state
            .tokens
            .insert(token_for(&account.username), account.username.clone());
        Ok(AuthResponse {
            token: token_for(&account.username),
            user: Self::user_payload(&state, &account.username).unwrap(),
        })
    }

    async fn get_user(
        &self,
        token: &LoginToken,
        username: &str,
    ) -> Result<UserPayload, RemoteError> {
        self.check_online()?;
        let owner = self.authorize(token)?;
        if owner != username {
            return Err(rejected(401, "Token does not match user"));
        }
        let state = self.state.lock().unwrap();
        Self::user_payload(&state, username).ok_or_else(|| rejected(404, "No such user"))
    }

    async fn list_stories(&self, limit: u32) -> Result<Vec<Story>, RemoteError> {
        self.check_online()?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state.stories.iter().take(limit as usize).cloned().collect())
    }

    async fn create_story(
        &self,
        token: &LoginToken,
        story: &NewStory,
    ) -> Result<Story, RemoteError> {
        self.check_online()?;
        let username = self.authorize(token)?;
        let created = {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let created = Story {
                story_id: StoryId::new(format!("story-{}", state.next_id)),
                title: story.title.clone(),
                url: story.url.clone(),
                author: story.author.clone(),
                username,
                created_at: Utc::now(),
            };
            state.stories.insert(0, created.clone());
            created
        };
        self.maybe_hold().await;
        Ok(created)
    }

    async fn delete_story(
        &self,
        token: &LoginToken,
        story_id: &StoryId,
    ) -> Result<(), RemoteError> {
        self.check_online()?;
        let username = self.authorize(token)?;
        {
            let mut state = self.state.lock().unwrap();
            let Some(pos) = state.stories.iter().position(|s| &s.story_id == story_id) else {
                return Err(rejected(404, "No such story"));
            };
            if state.stories[pos].username != username {
                return Err(rejected(403, "Not your story"));
            }
            state.stories.remove(pos);
            for user in state.users.values_mut() {
                user.favorites.retain(|id| id != story_id);
            }
        }
        self.maybe_hold().await;
        Ok(())
    }

    async fn add_favorite(
        &self,
        token: &LoginToken,
        username: &str,
        story_id: &StoryId,
    ) -> Result<UserPayload, RemoteError> {
        self.toggle(token, username, story_id, true).await
    }

    async fn remove_favorite(
        &self,
        token: &LoginToken,
        username: &str,
        story_id: &StoryId,
    ) -> Result<UserPayload, RemoteError> {
        self.toggle(token, username, story_id, false).await
    }
}

/// Service seeded with alice and bob and a few stories.
///
/// Server order (newest first): `s3` (bob), `s2` (alice), `s1` (alice).
pub fn seeded_api() -> Arc<FakeStoryApi> {
    let api = FakeStoryApi::new();
    api.seed_user("alice", "alice-pw", "Alice");
    api.seed_user("bob", "bob-pw", "Bob");
    api.seed_story("s1", "alice", "First");
    api.seed_story("s2", "alice", "Second");
    api.seed_story("s3", "bob", "Third");
    api
}

pub fn test_config(policy: ConflictPolicy) -> Config {
    Config {
        conflict_policy: policy,
        ..Config::default()
    }
}

/// Create a coordinator over `api` with a fresh in-memory durable store.
pub fn create_test_coordinator(
    api: Arc<FakeStoryApi>,
    policy: ConflictPolicy,
) -> (ViewCoordinator, MemoryStore) {
    let store = MemoryStore::new();
    let coordinator =
        ViewCoordinator::new(&test_config(policy), api, Arc::new(store.clone()));
    (coordinator, store)
}

/// Coordinator that has run its startup sequence and logged in as `username`.
pub async fn logged_in(
    api: Arc<FakeStoryApi>,
    username: &str,
    policy: ConflictPolicy,
) -> (ViewCoordinator, MemoryStore) {
    let (coordinator, store) = create_test_coordinator(api, policy);
    coordinator.start().await.expect("startup should succeed");
    coordinator
        .dispatch(story_session::Intent::Login {
            username: username.to_string(),
            password: format!("{}-pw", username),
        })
        .await
        .expect("login should succeed");
    (coordinator, store)
}
