//! # wacli-store
//!
//! SQLite-backed schema, migrations, queries, and optional full-text index
//! over a `wacli` mirror (spec section 3, 4.1).

mod store;
pub mod types;

pub use store::Store;
pub use types::*;
