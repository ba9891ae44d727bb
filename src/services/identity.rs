// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity service: authentication exchanges and favorite toggles.
//!
//! Favorite changes are never optimistic. The remote call completes first and
//! the local favorites view changes only after the service acknowledges it,
//! and only if the identity that made the call is still current.

use crate::error::{AppError, Result};
use crate::models::{Identity, LoginToken, NewAccount, StoryId};
use crate::services::api::{AuthResponse, RemoteError, StoryApi, UserPayload};
use crate::services::{stale_ticket, unexpected};
use crate::session::{Completion, SessionStore, SessionTicket};
use std::sync::Arc;
use validator::Validate;

/// Authentication and per-identity favorite management.
#[derive(Clone)]
pub struct IdentityService {
    api: Arc<dyn StoryApi>,
    session: Arc<SessionStore>,
}

impl IdentityService {
    pub fn new(api: Arc<dyn StoryApi>, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    // ─── Authentication ──────────────────────────────────────────

    /// Exchange credentials for an identity.
    ///
    /// Any failure, including an unreachable service, is an authentication
    /// failure from the user's point of view.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AppError::Authentication(
                "username and password are required".to_string(),
            ));
        }

        let response = self.api.login(username, password).await.map_err(|e| {
            tracing::info!(username, error = %e, "Login rejected");
            match e {
                e if e.is_unreachable() => AppError::Authentication(format!(
                    "story service unavailable: {}",
                    e.message()
                )),
                e => AppError::Authentication(e.message()),
            }
        })?;

        tracing::info!(username, "Logged in");
        Ok(identity_from_auth(response))
    }

    /// Create an account and return its identity.
    pub async fn create_account(&self, account: NewAccount) -> Result<Identity> {
        let account = NewAccount {
            username: account.username.trim().to_string(),
            name: account.name.trim().to_string(),
            password: account.password,
        };
        account
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let response = self.api.signup(&account).await.map_err(|e| match e {
            RemoteError::Rejected { status: 409, .. } => AppError::Validation(format!(
                "username '{}' is already taken",
                account.username
            )),
            RemoteError::Rejected {
                status: 400 | 422,
                message,
            } => AppError::Validation(message),
            RemoteError::Rejected {
                status: 401 | 403,
                message,
            } => AppError::Authentication(message),
            other => unexpected(other),
        })?;

        tracing::info!(username = %account.username, "Account created");
        Ok(identity_from_auth(response))
    }

    /// Rebuild the identity behind a stored token.
    ///
    /// Returns `None` when there is nothing to restore or the token no longer
    /// verifies; a rejected token also clears the durable store. An
    /// unreachable service leaves the stored pair in place for the next start.
    pub async fn restore_from_token(
        &self,
        token: Option<&LoginToken>,
        username: Option<&str>,
    ) -> Option<Identity> {
        let (token, username) = match (token, username) {
            (Some(t), Some(u)) if !t.expose().is_empty() && !u.is_empty() => (t, u),
            _ => return None,
        };

        match self.api.get_user(token, username).await {
            Ok(user) => {
                tracing::info!(username, "Restored identity from stored token");
                Some(identity_from_user(user, token.clone()))
            }
            Err(e) if e.is_unreachable() => {
                tracing::warn!(username, error = %e, "Token verification unavailable, browsing anonymously");
                None
            }
            Err(e) => {
                tracing::info!(username, error = %e, "Stored token rejected, clearing");
                self.session.clear();
                None
            }
        }
    }

    // ─── Favorites ───────────────────────────────────────────────

    /// Mark a story as a favorite of the current identity.
    ///
    /// Already-favorited stories are a no-op without a remote call.
    pub async fn add_favorite(&self, story_id: &StoryId) -> Result<Completion> {
        let ticket = self.require_ticket("favorite stories")?;
        self.add_favorite_as(&ticket, story_id).await
    }

    /// [`add_favorite`](Self::add_favorite) on behalf of a captured ticket.
    ///
    /// Fails with `Authorization` if the ticket's identity is no longer current.
    pub async fn add_favorite_as(
        &self,
        ticket: &SessionTicket,
        story_id: &StoryId,
    ) -> Result<Completion> {
        let (already, story) = self
            .session
            .with_current(ticket, |identity, stories| {
                let story = stories
                    .get(story_id)
                    .or_else(|| identity.favorites().get(story_id))
                    .cloned();
                (identity.is_favorite(story_id), story)
            })
            .ok_or_else(|| stale_ticket(ticket))?;
        if already {
            return Ok(Completion::Unchanged);
        }
        let story = story.ok_or_else(|| AppError::NotFound(format!("story {}", story_id)))?;

        self.api
            .add_favorite(&ticket.token, &ticket.username, story_id)
            .await
            .map_err(|e| favorite_error("add", story_id, e))?;

        // The collection may have been re-fetched while the call was out.
        let outcome = self.session.apply_if_current(ticket, |identity, stories| {
            let shared = stories.get(story_id).cloned().unwrap_or(story);
            identity.insert_favorite(shared)
        });
        tracing::info!(username = %ticket.username, story_id = %story_id, ?outcome, "Favorite added");
        Ok(outcome)
    }

    /// Remove a story from the current identity's favorites.
    ///
    /// Stories that are not favorites are a no-op without a remote call.
    pub async fn remove_favorite(&self, story_id: &StoryId) -> Result<Completion> {
        let ticket = self.require_ticket("unfavorite stories")?;
        self.remove_favorite_as(&ticket, story_id).await
    }

    pub async fn remove_favorite_as(
        &self,
        ticket: &SessionTicket,
        story_id: &StoryId,
    ) -> Result<Completion> {
        let is_favorite = self
            .session
            .with_current(ticket, |identity, _| identity.is_favorite(story_id))
            .ok_or_else(|| stale_ticket(ticket))?;
        if !is_favorite {
            return Ok(Completion::Unchanged);
        }

        self.api
            .remove_favorite(&ticket.token, &ticket.username, story_id)
            .await
            .map_err(|e| favorite_error("remove", story_id, e))?;

        let outcome = self
            .session
            .apply_if_current(ticket, |identity, _| identity.remove_favorite(story_id));
        tracing::info!(username = %ticket.username, story_id = %story_id, ?outcome, "Favorite removed");
        Ok(outcome)
    }

    /// Flip the favorite state of a story, deciding direction from the
    /// current (confirmed) state.
    pub async fn toggle_favorite(&self, story_id: &StoryId) -> Result<Completion> {
        let ticket = self.require_ticket("favorite stories")?;
        self.toggle_favorite_as(&ticket, story_id).await
    }

    pub async fn toggle_favorite_as(
        &self,
        ticket: &SessionTicket,
        story_id: &StoryId,
    ) -> Result<Completion> {
        let is_favorite = self
            .session
            .with_current(ticket, |identity, _| identity.is_favorite(story_id))
            .ok_or_else(|| stale_ticket(ticket))?;
        if is_favorite {
            self.remove_favorite_as(ticket, story_id).await
        } else {
            self.add_favorite_as(ticket, story_id).await
        }
    }

    fn require_ticket(&self, action: &str) -> Result<SessionTicket> {
        self.session
            .ticket()
            .ok_or_else(|| AppError::Authorization(format!("log in to {}", action)))
    }
}

fn favorite_error(action: &str, story_id: &StoryId, err: RemoteError) -> AppError {
    tracing::warn!(story_id = %story_id, action, error = %err, "Favorite toggle failed");
    AppError::FavoriteToggle(format!("{} favorite {}: {}", action, story_id, err.message()))
}

fn identity_from_auth(response: AuthResponse) -> Identity {
    identity_from_user(response.user, LoginToken::new(response.token))
}

fn identity_from_user(user: UserPayload, token: LoginToken) -> Identity {
    Identity::new(
        user.username,
        user.name,
        user.created_at,
        token,
        user.favorites,
        user.stories,
    )
}
