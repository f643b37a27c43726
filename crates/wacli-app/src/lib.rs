//! # wacli-app
//!
//! The orchestrator (spec section 4.4): sync loop, on-demand backfill loop,
//! background media worker, contact/group refresh, and the session state
//! machine. Depends on [`wacli_protocol::ProtocolClient`] only through its
//! trait object, so it is fully testable against
//! [`wacli_protocol::FakeProtocolClient`] (spec section 4.3, section 8).

mod app;
mod backfill;
mod doctor;
mod media;
mod refresh;
mod sync;

pub use app::{App, SessionState};
pub use backfill::{BackfillOpts, BackfillResult};
pub use doctor::{doctor, DoctorReport};
pub use sync::{SyncOpts, SyncResult};
