// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - remote exchanges and the rules around them.

pub mod api;
pub mod identity;
pub mod stories;

pub use api::{AuthResponse, HttpStoryApi, RemoteError, StoryApi, UserPayload};
pub use identity::IdentityService;
pub use stories::StoryService;

use crate::error::AppError;
use crate::session::SessionTicket;

/// Fallback translation for remote failures without operation-specific meaning.
pub(crate) fn unexpected(err: RemoteError) -> AppError {
    match err {
        e if e.is_unreachable() => AppError::Network(e.to_string()),
        RemoteError::Decode(msg) => {
            AppError::Internal(anyhow::anyhow!("Malformed story service response: {}", msg))
        }
        RemoteError::Rejected { status, message } => {
            AppError::Internal(anyhow::anyhow!("Unexpected HTTP {}: {}", status, message))
        }
        RemoteError::Transport(msg) => AppError::Network(msg),
    }
}

/// The identity a request was captured for has since logged out or changed.
pub(crate) fn stale_ticket(ticket: &SessionTicket) -> AppError {
    tracing::info!(
        username = %ticket.username,
        generation = ticket.generation,
        "Session changed before the request ran"
    );
    AppError::Authorization(format!(
        "session for {} ended before the request ran",
        ticket.username
    ))
}
