//! The `ProtocolClient` capability trait (spec section 4.3): the seam the
//! App depends on, following `omega_core::traits::Channel`'s object-safe
//! `async_trait` shape so `wacli-app` never names a concrete protocol type.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use wacli_core::entities::{GroupRole, MediaType, ParticipantAction};
use wacli_core::error::WacliError;

use crate::event::Event;

/// Opaque id returned by `add_event_handler`, used to `remove_event_handler`
/// later. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

impl HandlerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn raw(&self) -> u64 {
        self.0
    }
}

/// A boxed async event handler. Handlers run on whatever task dispatches the
/// event and must not block; long work should hand off to a channel.
pub type HandlerFn = Box<dyn Fn(Event) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct GroupInfo {
    pub jid: String,
    pub name: String,
    pub owner_jid: String,
    pub created_at: i64,
    pub participants: Vec<(String, GroupRole)>,
}

#[derive(Debug, Clone)]
pub struct ContactInfo {
    pub jid: String,
    pub phone: String,
    pub push_name: String,
    pub full_name: String,
    pub first_name: String,
    pub business_name: String,
}

/// A capability interface over the WhatsApp Web protocol library, so the App
/// layer can be tested against [`crate::FakeProtocolClient`] instead of a
/// live session (spec section 4.3).
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Whether a device is currently paired and persisted.
    async fn is_authed(&self) -> Result<bool, WacliError>;

    /// Establish the session. `allow_qr` gates whether a fresh pairing QR
    /// may be displayed — `sync` must always pass `false`. Returns once the
    /// socket is ready or `wait_for_ready` elapses.
    async fn connect(&self, allow_qr: bool, wait_for_ready: Duration) -> Result<(), WacliError>;

    /// Register a handler invoked for every fanned-out event. Handlers run
    /// on library-owned tasks; callers must not hold their own bookkeeping
    /// mutex while calling this (spec section 4.3/4.4).
    async fn add_event_handler(&self, handler: HandlerFn) -> HandlerId;

    async fn remove_event_handler(&self, id: HandlerId);

    async fn get_all_contacts(&self) -> Result<Vec<ContactInfo>, WacliError>;

    async fn get_joined_groups(&self) -> Result<Vec<GroupInfo>, WacliError>;

    async fn get_group_info(&self, jid: &str) -> Result<GroupInfo, WacliError>;

    async fn set_group_name(&self, jid: &str, name: &str) -> Result<(), WacliError>;

    async fn update_group_participants(
        &self,
        group_jid: &str,
        users: &[String],
        action: ParticipantAction,
    ) -> Result<(), WacliError>;

    async fn leave_group(&self, jid: &str) -> Result<(), WacliError>;

    async fn get_group_invite_link(&self, jid: &str, revoke: bool) -> Result<String, WacliError>;

    async fn join_group_with_link(&self, code: &str) -> Result<String, WacliError>;

    /// Download and decrypt a message's media blob to `target_path`,
    /// returning the number of bytes written.
    #[allow(clippy::too_many_arguments)]
    async fn download_media_to_file(
        &self,
        direct_path: &str,
        file_enc_sha256: &[u8],
        file_sha256: &[u8],
        media_key: &[u8],
        file_length: i64,
        media_type: MediaType,
        mime_type: &str,
        target_path: &std::path::Path,
    ) -> Result<u64, WacliError>;

    /// Build an opaque history-sync request anchored at `last_known_ts`,
    /// requesting up to `count` older messages for `chat_jid`.
    async fn build_history_sync_request(
        &self,
        chat_jid: &str,
        last_known_ts: i64,
        count: u32,
    ) -> Result<Vec<u8>, WacliError>;

    /// Send a previously built history-sync request. The response surfaces
    /// asynchronously as `Event::HistorySync` with `on_demand_for` set.
    async fn send_history_sync_request(&self, blob: &[u8]) -> Result<(), WacliError>;
}
