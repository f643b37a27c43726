//! # wacli-protocol
//!
//! The capability interface over the WhatsApp Web protocol library (spec
//! section 4.3): a `ProtocolClient` trait the App depends on, a real
//! implementation wrapping `whatsapp-rust`, a `FakeProtocolClient` for
//! testing `wacli-app` without a live session, and QR pairing rendering.

mod client;
mod event;
pub mod qr;
mod real;
pub mod session_store;

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

pub use client::{ContactInfo, GroupInfo, HandlerFn, HandlerId, ProtocolClient};
pub use event::{ConversationSync, Event, GroupInfoUpdate, HistorySyncBatch, IncomingMessage};
pub use real::WhatsmeowClient;

#[cfg(any(test, feature = "test-utils"))]
pub use fake::FakeProtocolClient;
