//! Top-level error type for `wacli`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced at every layer of `wacli`, from `Store` queries up to the
/// CLI command boundary. The CLI maps these to exit codes (see `wacli::exit_code`).
#[derive(Debug, Error)]
pub enum WacliError {
    /// Missing or malformed flags, or an empty required query.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Row-level miss: no such chat, message, contact, or group.
    #[error("not found: {0}")]
    NotFound(String),

    /// Another process already holds the store's writer lock.
    #[error("another wacli is running (lock held at {path})")]
    LockHeld { path: PathBuf },

    /// A write or network operation was attempted before pairing completed.
    #[error("not authenticated — pair WhatsApp first")]
    NotAuthenticated,

    /// Connect timeout, network hiccup, or other retryable failure.
    #[error("transient error: {0}")]
    Transient(String),

    /// SQLite open or integrity failure.
    #[error("storage corruption: {0}")]
    StorageCorruption(String),

    /// A permanent failure reported by the WhatsApp Web protocol library.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),
}

impl WacliError {
    /// Exit code this error maps to at the CLI boundary (spec section 6-7).
    pub fn exit_code(&self) -> i32 {
        match self {
            WacliError::InvalidArgument(_) => 2,
            WacliError::LockHeld { .. } => 3,
            _ => 1,
        }
    }
}
