// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Story model for the shared collection and submission form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Identifier assigned to a story by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(String);

impl StoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A submitted link. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Service-assigned identifier
    pub story_id: StoryId,
    pub title: String,
    pub url: String,
    /// Free-text author credit (not necessarily a user)
    pub author: String,
    /// Username of the owning account
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Story {
    /// Host name of the story URL, without scheme or a leading `www.`.
    pub fn hostname(&self) -> &str {
        hostname_of(&self.url)
    }

    pub fn is_owned_by(&self, username: &str) -> bool {
        self.username == username
    }
}

/// Extract the host portion of a URL-ish string.
///
/// Tolerates missing schemes (`example.com/path`) since submitted links are
/// free text.
pub fn hostname_of(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    host.strip_prefix("www.").unwrap_or(host)
}

/// Fields entered on the submit form.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewStory {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(url(message = "url must be an absolute URL"))]
    pub url: String,
    #[validate(length(min = 1, message = "author must not be empty"))]
    pub author: String,
}

impl NewStory {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into().trim().to_string(),
            url: url.into().trim().to_string(),
            author: author.into().trim().to_string(),
        }
    }
}
