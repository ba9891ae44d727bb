// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types surfaced to the view coordinator.

/// Application error type.
///
/// Every failure a user intent can produce maps onto exactly one variant, so
/// the presentation layer can decide how to show it without string matching.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Favorite toggle failed: {0}")]
    FavoriteToggle(String),

    #[error("Durable store unavailable: {0}")]
    Persistence(String),

    #[error("Concurrent modification of {0}")]
    ConcurrentModification(String),

    #[error("Story service unreachable: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable kind, used in log fields and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Authentication(_) => "authentication",
            AppError::Validation(_) => "validation",
            AppError::Authorization(_) => "authorization",
            AppError::NotFound(_) => "not_found",
            AppError::FavoriteToggle(_) => "favorite_toggle",
            AppError::Persistence(_) => "persistence",
            AppError::ConcurrentModification(_) => "concurrent_modification",
            AppError::Network(_) => "network",
            AppError::Internal(_) => "internal",
        }
    }

    /// True when the remote service could not be reached at all.
    pub fn is_network(&self) -> bool {
        matches!(self, AppError::Network(_))
    }

    /// Persistence failures are reported but never end the session.
    pub fn is_fatal_to_session(&self) -> bool {
        !matches!(self, AppError::Persistence(_))
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, AppError>;
