// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the session core.

pub mod collection;
pub mod story;
pub mod user;

pub use collection::{StoryCollection, StoryRefs};
pub use story::{NewStory, Story, StoryId};
pub use user::{Identity, LoginToken, NewAccount, Profile, StoredCredentials};
