// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Story service API client.
//!
//! Handles:
//! - Login, signup and token verification
//! - Story listing, creation and deletion
//! - Favorite add/remove
//! - Mapping the service's `{error: {...}}` body onto status-aware errors

use crate::models::{LoginToken, NewAccount, NewStory, Story, StoryId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Failure talking to the story service, before any domain interpretation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Well-formed rejection from the service.
    #[error("HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response arrived but could not be decoded.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for transport failures and server-side (5xx) errors.
    pub fn is_unreachable(&self) -> bool {
        match self {
            RemoteError::Transport(_) => true,
            RemoteError::Rejected { status, .. } => *status >= 500,
            RemoteError::Decode(_) => false,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RemoteError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// User snapshot as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub username: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub favorites: Vec<Story>,
    #[serde(default)]
    pub stories: Vec<Story>,
}

/// Login/signup response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserPayload,
}

/// The remote collection service, as consumed by the session core.
#[async_trait]
pub trait StoryApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, RemoteError>;

    async fn signup(&self, account: &NewAccount) -> Result<AuthResponse, RemoteError>;

    /// Fetch the user behind `token`; doubles as token verification.
    async fn get_user(&self, token: &LoginToken, username: &str)
        -> Result<UserPayload, RemoteError>;

    async fn list_stories(&self, limit: u32) -> Result<Vec<Story>, RemoteError>;

    async fn create_story(&self, token: &LoginToken, story: &NewStory)
        -> Result<Story, RemoteError>;

    async fn delete_story(&self, token: &LoginToken, story_id: &StoryId)
        -> Result<(), RemoteError>;

    async fn add_favorite(
        &self,
        token: &LoginToken,
        username: &str,
        story_id: &StoryId,
    ) -> Result<UserPayload, RemoteError>;

    async fn remove_favorite(
        &self,
        token: &LoginToken,
        username: &str,
        story_id: &StoryId,
    ) -> Result<UserPayload, RemoteError>;
}

/// HTTP implementation of [`StoryApi`].
#[derive(Clone)]
pub struct HttpStoryApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStoryApi {
    /// Create a new client for the service rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn user_url(&self, username: &str) -> String {
        format!("{}/users/{}", self.base_url, urlencoding::encode(username))
    }

    fn favorite_url(&self, username: &str, story_id: &StoryId) -> String {
        format!(
            "{}/favorites/{}",
            self.user_url(username),
            urlencoding::encode(story_id.as_str())
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            if status.is_server_error() {
                tracing::warn!(status = status.as_u16(), "Story service error");
            }
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl StoryApi for HttpStoryApi {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, RemoteError> {
        tracing::debug!(username, "POST /login");
        let body = serde_json::json!({
            "user": { "username": username, "password": password }
        });
        let response = self
            .send(self.http.post(format!("{}/login", self.base_url)).json(&body))
            .await?;
        self.check_response_json(response).await
    }

    async fn signup(&self, account: &NewAccount) -> Result<AuthResponse, RemoteError> {
        tracing::debug!(username = %account.username, "POST /signup");
        let body = serde_json::json!({
            "user": {
                "username": account.username,
                "password": account.password,
                "name": account.name,
            }
        });
        let response = self
            .send(self.http.post(format!("{}/signup", self.base_url)).json(&body))
            .await?;
        self.check_response_json(response).await
    }

    async fn get_user(
        &self,
        token: &LoginToken,
        username: &str,
    ) -> Result<UserPayload, RemoteError> {
        tracing::debug!(username, "GET /users/{{username}}");
        let response = self
            .send(
                self.http
                    .get(self.user_url(username))
                    .query(&[("token", token.expose())]),
            )
            .await?;
        let wrapped: UserEnvelope = self.check_response_json(response).await?;
        Ok(wrapped.user)
    }

    async fn list_stories(&self, limit: u32) -> Result<Vec<Story>, RemoteError> {
        tracing::debug!(limit, "GET /stories");
        let response = self
            .send(
                self.http
                    .get(format!("{}/stories", self.base_url))
                    .query(&[("limit", limit.to_string())]),
            )
            .await?;
        let wrapped: StoriesEnvelope = self.check_response_json(response).await?;
        Ok(wrapped.stories)
    }

    async fn create_story(
        &self,
        token: &LoginToken,
        story: &NewStory,
    ) -> Result<Story, RemoteError> {
        tracing::debug!(title = %story.title, "POST /stories");
        let body = serde_json::json!({
            "token": token.expose(),
            "story": story,
        });
        let response = self
            .send(self.http.post(format!("{}/stories", self.base_url)).json(&body))
            .await?;
        let wrapped: StoryEnvelope = self.check_response_json(response).await?;
        Ok(wrapped.story)
    }

    async fn delete_story(
        &self,
        token: &LoginToken,
        story_id: &StoryId,
    ) -> Result<(), RemoteError> {
        tracing::debug!(story_id = %story_id, "DELETE /stories/{{id}}");
        let url = format!(
            "{}/stories/{}",
            self.base_url,
            urlencoding::encode(story_id.as_str())
        );
        let body = serde_json::json!({ "token": token.expose() });
        let response = self.send(self.http.delete(url).json(&body)).await?;
        let _: serde_json::Value = self.check_response_json(response).await?;
        Ok(())
    }

    async fn add_favorite(
        &self,
        token: &LoginToken,
        username: &str,
        story_id: &StoryId,
    ) -> Result<UserPayload, RemoteError> {
        tracing::debug!(username, story_id = %story_id, "POST favorite");
        let body = serde_json::json!({ "token": token.expose() });
        let response = self
            .send(self.http.post(self.favorite_url(username, story_id)).json(&body))
            .await?;
        let wrapped: UserEnvelope = self.check_response_json(response).await?;
        Ok(wrapped.user)
    }

    async fn remove_favorite(
        &self,
        token: &LoginToken,
        username: &str,
        story_id: &StoryId,
    ) -> Result<UserPayload, RemoteError> {
        tracing::debug!(username, story_id = %story_id, "DELETE favorite");
        let body = serde_json::json!({ "token": token.expose() });
        let response = self
            .send(
                self.http
                    .delete(self.favorite_url(username, story_id))
                    .json(&body),
            )
            .await?;
        let wrapped: UserEnvelope = self.check_response_json(response).await?;
        Ok(wrapped.user)
    }
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: UserPayload,
}

#[derive(Deserialize)]
struct StoriesEnvelope {
    stories: Vec<Story>,
}

#[derive(Deserialize)]
struct StoryEnvelope {
    story: Story,
}

/// Error body shape: `{"error": {"status": 401, "title": "...", "message": "..."}}`
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
