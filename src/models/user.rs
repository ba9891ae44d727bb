//! Identity model: the authenticated principal and its story views.

use crate::models::collection::StoryRefs;
use crate::models::story::{Story, StoryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use validator::Validate;

/// Opaque credential token issued by the story service.
///
/// `Debug` is redacted so tokens never reach log output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoginToken(String);

impl LoginToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LoginToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoginToken(***)")
    }
}

/// The (token, username) pair kept in the durable store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub token: LoginToken,
    pub username: String,
}

/// The authenticated user for the current session.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Unique, immutable account name
    pub username: String,
    /// Display name
    pub name: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    pub login_token: LoginToken,
    favorites: StoryRefs,
    own_stories: StoryRefs,
}

impl Identity {
    pub fn new(
        username: String,
        name: String,
        created_at: DateTime<Utc>,
        login_token: LoginToken,
        favorites: Vec<Story>,
        own_stories: Vec<Story>,
    ) -> Self {
        Self {
            username,
            name,
            created_at,
            login_token,
            favorites: StoryRefs::from_stories(favorites.into_iter().map(Arc::new)),
            own_stories: StoryRefs::from_stories(own_stories.into_iter().map(Arc::new)),
        }
    }

    pub fn credentials(&self) -> StoredCredentials {
        StoredCredentials {
            token: self.login_token.clone(),
            username: self.username.clone(),
        }
    }

    pub fn favorites(&self) -> &StoryRefs {
        &self.favorites
    }

    pub fn own_stories(&self) -> &StoryRefs {
        &self.own_stories
    }

    pub fn is_favorite(&self, id: &StoryId) -> bool {
        self.favorites.contains(id)
    }

    pub fn owns(&self, story: &Story) -> bool {
        story.is_owned_by(&self.username)
    }

    /// Record a confirmed favorite. Returns `false` if it was already present.
    pub(crate) fn insert_favorite(&mut self, story: Arc<Story>) -> bool {
        self.favorites.push_back(story)
    }

    /// Drop a confirmed unfavorite. Returns `false` if it was not present.
    pub(crate) fn remove_favorite(&mut self, id: &StoryId) -> bool {
        self.favorites.remove(id).is_some()
    }

    pub(crate) fn push_own_story(&mut self, story: Arc<Story>) {
        self.own_stories.push_back(story);
    }

    /// Remove a deleted story from every view.
    pub(crate) fn forget_story(&mut self, id: &StoryId) {
        self.own_stories.remove(id);
        self.favorites.remove(id);
    }

    /// Point both views at the values held by a freshly fetched collection.
    pub(crate) fn relink(&mut self, collection: &StoryRefs) {
        self.favorites.relink(collection);
        self.own_stories.relink(collection);
    }

    /// Profile view data: name, username, account date and nav label.
    pub fn profile(&self) -> Profile {
        Profile {
            name: self.name.clone(),
            username: self.username.clone(),
            account_created: self.created_at.format("%Y-%m-%d").to_string(),
            nav_label: self.username.clone(),
        }
    }
}

/// Profile section data for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Profile {
    pub name: String,
    pub username: String,
    /// `YYYY-MM-DD`
    pub account_created: String,
    pub nav_label: String,
}

/// Fields entered on the create-account form.
#[derive(Debug, Clone, Validate)]
pub struct NewAccount {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
}
