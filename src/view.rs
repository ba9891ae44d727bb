// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only render snapshots for the presentation layer.

use crate::error::{AppError, Result};
use crate::models::{Identity, Profile, Story};
use crate::session::SessionState;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Which region of the page is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum View {
    All,
    Favorites,
    MyStories,
    Profile,
    SubmitForm,
    Login,
}

impl View {
    /// Views that only make sense for a logged-in identity.
    pub fn requires_identity(self) -> bool {
        matches!(
            self,
            View::Favorites | View::MyStories | View::Profile | View::SubmitForm
        )
    }
}

/// One story line as the template needs it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StoryRow {
    pub story_id: String,
    pub title: String,
    pub url: String,
    pub author: String,
    pub username: String,
    pub hostname: String,
    /// `None` when anonymous: no star is shown.
    pub is_favorite: Option<bool>,
    pub is_owner: bool,
    /// Delete affordance (only on the "my stories" view).
    pub deletable: bool,
}

/// Everything needed to re-render after an intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RenderSnapshot {
    pub view: View,
    pub profile: Option<Profile>,
    /// Logout, submit, favorites, my stories and profile links.
    pub show_user_nav: bool,
    pub rows: Vec<StoryRow>,
    /// True for favorites / my stories with nothing to list.
    pub empty: bool,
    /// Failures the intent survived, e.g. credentials that were not saved.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

/// A non-fatal error reported next to a successful result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Notice {
    /// Same values as [`AppError::kind`]
    pub kind: String,
    pub message: String,
}

impl From<&AppError> for Notice {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

impl RenderSnapshot {
    pub fn is_logged_in(&self) -> bool {
        self.profile.is_some()
    }

    /// True if a durable-store write behind this snapshot failed.
    pub fn persistence_failed(&self) -> bool {
        self.notices.iter().any(|n| n.kind == "persistence")
    }
}

fn row(story: &Story, identity: Option<&Identity>, deletable: bool) -> StoryRow {
    StoryRow {
        story_id: story.story_id.to_string(),
        title: story.title.clone(),
        url: story.url.clone(),
        author: story.author.clone(),
        username: story.username.clone(),
        hostname: story.hostname().to_string(),
        is_favorite: identity.map(|id| id.is_favorite(&story.story_id)),
        is_owner: identity.is_some_and(|id| id.owns(story)),
        deletable,
    }
}

/// Build the snapshot for `view` from a consistent session state.
pub fn render(state: &SessionState, view: View) -> Result<RenderSnapshot> {
    let identity = state.identity.as_ref();
    if view.requires_identity() && identity.is_none() {
        return Err(AppError::Authorization(format!(
            "log in to view {:?}",
            view
        )));
    }

    let rows: Vec<StoryRow> = match (view, identity) {
        (View::All | View::SubmitForm, _) => state
            .stories
            .iter()
            .map(|s| row(s, identity, false))
            .collect(),
        (View::Favorites, Some(id)) => id
            .favorites()
            .iter()
            .map(|s| row(s, identity, false))
            .collect(),
        (View::MyStories, Some(id)) => id
            .own_stories()
            .iter()
            .map(|s| row(s, identity, true))
            .collect(),
        _ => Vec::new(),
    };

    let empty = matches!(view, View::Favorites | View::MyStories) && rows.is_empty();

    Ok(RenderSnapshot {
        view,
        profile: identity.map(Identity::profile),
        show_user_nav: identity.is_some(),
        rows,
        empty,
        notices: Vec::new(),
    })
}
