// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Story collection service.
//!
//! Handles the collection workflow:
//! 1. Fetch the shared collection (full replace)
//! 2. Submit new stories (prepended, added to the owner's stories)
//! 3. Delete owned stories (removed from the collection and every view)
//!
//! Mutations run against the story service first; local state changes only
//! after the service acknowledges.

use crate::error::{AppError, Result};
use crate::models::{NewStory, Story, StoryCollection, StoryId};
use crate::services::api::{RemoteError, StoryApi};
use crate::services::{stale_ticket, unexpected};
use crate::session::{Completion, SessionStore, SessionTicket};
use std::sync::Arc;
use validator::Validate;

/// Fetches and mutates the shared story collection.
#[derive(Clone)]
pub struct StoryService {
    api: Arc<dyn StoryApi>,
    session: Arc<SessionStore>,
    limit: u32,
}

impl StoryService {
    pub fn new(api: Arc<dyn StoryApi>, session: Arc<SessionStore>, limit: u32) -> Self {
        Self {
            api,
            session,
            limit,
        }
    }

    /// Replace the held collection with the service's current one.
    pub async fn fetch_all(&self) -> Result<StoryCollection> {
        let stories = self.api.list_stories(self.limit).await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to fetch stories");
            unexpected(e)
        })?;

        let count = self.session.replace_stories(stories);
        tracing::info!(count, "Story collection replaced");
        Ok(self.session.stories())
    }

    /// Submit a new story as the current identity.
    pub async fn submit(&self, new_story: NewStory) -> Result<Arc<Story>> {
        let ticket = self.session.ticket().ok_or_else(|| {
            AppError::Authorization("log in to submit stories".to_string())
        })?;
        self.submit_as(&ticket, new_story).await
    }

    /// [`submit`](Self::submit) on behalf of a captured ticket.
    pub async fn submit_as(&self, ticket: &SessionTicket, new_story: NewStory) -> Result<Arc<Story>> {
        if !self.session.is_current(ticket) {
            return Err(stale_ticket(ticket));
        }

        let new_story = NewStory::new(new_story.title, new_story.url, new_story.author);
        new_story
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let story = self
            .api
            .create_story(&ticket.token, &new_story)
            .await
            .map_err(|e| match e {
                RemoteError::Rejected {
                    status: 400 | 422,
                    message,
                } => AppError::Validation(message),
                RemoteError::Rejected {
                    status: 401 | 403,
                    message,
                } => AppError::Authorization(message),
                other => unexpected(other),
            })?;
        let mut story = Arc::new(story);

        // A re-fetch during the call may already hold this story.
        let outcome = self.session.apply_if_current(ticket, |identity, stories| {
            if !stories.push_front(Arc::clone(&story)) {
                if let Some(held) = stories.get(&story.story_id) {
                    story = Arc::clone(held);
                }
            }
            identity.push_own_story(Arc::clone(&story));
            true
        });
        tracing::info!(
            username = %ticket.username,
            story_id = %story.story_id,
            ?outcome,
            "Story submitted"
        );
        Ok(story)
    }

    /// Delete a story owned by the current identity.
    pub async fn remove(&self, story_id: &StoryId) -> Result<Completion> {
        let ticket = self.session.ticket().ok_or_else(|| {
            AppError::Authorization("log in to delete stories".to_string())
        })?;
        self.remove_as(&ticket, story_id).await
    }

    /// [`remove`](Self::remove) on behalf of a captured ticket.
    pub async fn remove_as(&self, ticket: &SessionTicket, story_id: &StoryId) -> Result<Completion> {
        // Own stories older than the fetched page are only in the identity view.
        let story = self
            .session
            .with_current(ticket, |identity, stories| {
                stories
                    .get(story_id)
                    .or_else(|| identity.own_stories().get(story_id))
                    .cloned()
            })
            .ok_or_else(|| stale_ticket(ticket))?
            .ok_or_else(|| AppError::NotFound(format!("story {}", story_id)))?;
        if !story.is_owned_by(&ticket.username) {
            tracing::warn!(
                username = %ticket.username,
                owner = %story.username,
                story_id = %story_id,
                "Refusing to delete story owned by another user"
            );
            return Err(AppError::Authorization(format!(
                "story {} is owned by {}",
                story_id, story.username
            )));
        }

        self.api
            .delete_story(&ticket.token, story_id)
            .await
            .map_err(|e| match e {
                RemoteError::Rejected { status: 404, .. } => {
                    AppError::NotFound(format!("story {}", story_id))
                }
                RemoteError::Rejected {
                    status: 401 | 403,
                    message,
                } => AppError::Authorization(message),
                other => unexpected(other),
            })?;

        let outcome = self.session.apply_if_current(ticket, |identity, stories| {
            stories.remove(story_id);
            identity.forget_story(story_id);
            true
        });
        tracing::info!(username = %ticket.username, story_id = %story_id, ?outcome, "Story deleted");
        Ok(outcome)
    }

    /// Look up a story in the held collection. Never re-fetches.
    pub fn find_by_id(&self, story_id: &StoryId) -> Option<Arc<Story>> {
        self.session.find_story(story_id)
    }
}
