//! Error types for the clubhouse ecosystem.

use thiserror::Error;

/// Errors that can occur in clubhouse operations.
#[derive(Error, Debug)]
pub enum ClubError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calendar feed error: {0}")]
    Feed(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Notice not found: {0}")]
    NoticeNotFound(String),

    #[error("Album not found: {0}")]
    AlbumNotFound(String),

    #[error("Push delivery error: {0}")]
    Push(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for clubhouse operations.
pub type ClubResult<T> = Result<T, ClubError>;
