// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Story-Session: client session and story-state synchronization
//!
//! This crate keeps one authenticated identity, the shared story collection
//! and the identity's favorites / own-stories views consistent across user
//! intents, restarts and asynchronous round-trips to the story service.

pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod view;

pub use coordinator::{Intent, ViewCoordinator};
pub use error::AppError;
pub use session::{Completion, SessionStore};
pub use view::{Notice, RenderSnapshot, StoryRow, View};
