//! # wacli-core
//!
//! Shared entities, error kinds, configuration, and output helpers used by
//! every other `wacli` crate.

pub mod config;
pub mod entities;
pub mod error;
pub mod output;

pub use entities::{ChatKind, GroupRole, Jid, MediaType};
pub use error::WacliError;
