// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ordered story sequences with id-indexed lookup.
//!
//! Stories are shared as `Arc<Story>` between the collection and the identity
//! views, so a favorite or own-story entry refers to the same value the
//! collection holds rather than a copy.

use crate::models::story::{Story, StoryId};
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered set of stories keyed by id. Insertion order is exposure order.
#[derive(Debug, Clone, Default)]
pub struct StoryRefs {
    order: Vec<Arc<Story>>,
    index: HashMap<StoryId, usize>,
}

impl StoryRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a sequence, keeping the first occurrence of each id.
    pub fn from_stories<I>(stories: I) -> Self
    where
        I: IntoIterator<Item = Arc<Story>>,
    {
        let mut refs = Self::new();
        for story in stories {
            refs.push_back(story);
        }
        refs
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &StoryId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &StoryId) -> Option<&Arc<Story>> {
        self.index.get(id).map(|&i| &self.order[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Story>> {
        self.order.iter()
    }

    pub fn ids(&self) -> Vec<StoryId> {
        self.order.iter().map(|s| s.story_id.clone()).collect()
    }

    /// Append unless already present. Returns `true` if inserted.
    pub fn push_back(&mut self, story: Arc<Story>) -> bool {
        if self.index.contains_key(&story.story_id) {
            return false;
        }
        self.index.insert(story.story_id.clone(), self.order.len());
        self.order.push(story);
        true
    }

    /// Prepend unless already present. Returns `true` if inserted.
    pub fn push_front(&mut self, story: Arc<Story>) -> bool {
        if self.index.contains_key(&story.story_id) {
            return false;
        }
        self.order.insert(0, story);
        self.reindex();
        true
    }

    /// Remove by id, returning the removed story.
    pub fn remove(&mut self, id: &StoryId) -> Option<Arc<Story>> {
        let pos = self.index.remove(id)?;
        let story = self.order.remove(pos);
        self.reindex();
        Some(story)
    }

    /// Swap each entry for the value with the same id in `source`, if any.
    ///
    /// Used after a full re-fetch so views keep pointing at the values the
    /// collection holds.
    pub fn relink(&mut self, source: &StoryRefs) {
        for slot in self.order.iter_mut() {
            if let Some(fresh) = source.get(&slot.story_id) {
                *slot = Arc::clone(fresh);
            }
        }
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, story) in self.order.iter().enumerate() {
            self.index.insert(story.story_id.clone(), i);
        }
    }
}

/// The shared story collection for the session.
pub type StoryCollection = StoryRefs;
