// ABOUTME: Crate-wide error type and result alias
// ABOUTME: Classifies failures by origin: storage, remote service, input, internal
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Learnhub Contributors

use thiserror::Error;

/// Convenience alias used by every fallible operation in the crate.
pub type AppResult<T> = Result<T, AppError>;

/// Application error, classified by origin.
///
/// The synchronizer relies on this classification: remote-service failures
/// are caught at its boundary and converted to empty or fallback results,
/// while storage failures propagate unchanged (the crate has no recovery
/// strategy for a broken local store).
#[derive(Debug, Error)]
pub enum AppError {
    /// Local storage fault. Fatal for the operation that hit it.
    #[error("Database error: {0}")]
    Database(String),

    /// A remote collaborator (metadata API, user store) failed.
    #[error("{service}: {message}")]
    ExternalService {
        /// Name of the remote service that failed.
        service: String,
        /// Human-readable failure description.
        message: String,
    },

    /// Caller passed something unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invariant violation inside the crate itself.
    #[error("Internal error: {0}")]
    Internal(String),

    /// JSON serialization failure.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Build a [`AppError::Database`] error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Build an [`AppError::ExternalService`] error.
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Build an [`AppError::InvalidInput`] error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Build an [`AppError::NotFound`] error.
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    /// Build an [`AppError::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Build an [`AppError::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
