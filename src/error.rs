//! Domain-specific errors for the player state engine.
//!
//! Contains error variants for common failure cases like:
//! - Validation rejections (negative amounts, self-targeted friend requests)
//! - Limit rejections (friend and request caps)
//! - Persistence failures (I/O, CSV and JSON encoding of stored records)
//! - Parse failures (stored identifiers, user-entered amounts)
//!
//! Rejections carry the user-facing message in their `Display` impl so a
//! presentation layer can show them to the instigating player verbatim.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Text that is not a canonical player identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid player id: {0:?}")]
pub struct PlayerIdError(pub String);

/// User-entered amount text that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount: {0:?}")]
    Invalid(String),
    #[error("amount is too large")]
    Overflow,
}

/// Failure to read or write durable storage.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("csv error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("json error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Rejections of the friend request protocol.
#[derive(Debug, Error)]
pub enum FriendError {
    #[error("You cannot add yourself as a friend.")]
    SelfRequest,
    #[error("You are already friends.")]
    AlreadyFriends,
    #[error("You reached max friend limit ({limit}).")]
    FriendLimitReached { limit: usize },
    #[error("That player reached max friend limit.")]
    OtherFriendLimitReached,
    #[error("That player's request list is full.")]
    RequestsFull,
    #[error("You already sent a friend request.")]
    RequestAlreadySent,
    #[error("No friend request from that player.")]
    NoPendingRequest,
    #[error("You are not friends.")]
    NotFriends,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Errors surfaced by the [`Engine`](crate::Engine) when applying an operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("amount must not be negative")]
    NegativeAmount,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("operation requires a target player")]
    MissingTarget,
    #[error("operation requires an amount")]
    MissingAmount,
    #[error(transparent)]
    InvalidAmount(#[from] AmountParseError),
    #[error(transparent)]
    Friend(#[from] FriendError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
