//! `FakeProtocolClient`: a [`ProtocolClient`] test double so `wacli-app`'s
//! sync/backfill/refresh logic can be tested without a live WhatsApp
//! session (spec section 4.3, section 8 end-to-end scenarios).
//!
//! Grounded on `omega_memory::store`'s test style (in-memory fixtures,
//! `#[tokio::test]`) generalized to a full fake implementation of an
//! `async_trait` capability interface, the way `omega_core::traits::Channel`
//! implementers are faked in that crate's own tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use wacli_core::entities::{MediaType, ParticipantAction};
use wacli_core::error::WacliError;

use crate::client::{ContactInfo, GroupInfo, HandlerFn, HandlerId, ProtocolClient};
use crate::event::{Event, HistorySyncBatch};

/// Canned media bytes returned by `download_media_to_file`, keyed by
/// `direct_path` so a test can configure per-message payloads.
type MediaFixtures = HashMap<String, Vec<u8>>;

/// A controllable stand-in for a live `whatsapp-rust` session.
pub struct FakeProtocolClient {
    authed: AtomicBool,
    handlers: Arc<Mutex<HashMap<u64, HandlerFn>>>,
    contacts: Mutex<Vec<ContactInfo>>,
    groups: Mutex<Vec<GroupInfo>>,
    media: Mutex<MediaFixtures>,
    /// Responses popped in order as `send_history_sync_request` is called,
    /// and fanned out to registered handlers as `Event::HistorySync`.
    history_responses: Mutex<VecDeque<HistorySyncBatch>>,
    /// Requests passed to `build_history_sync_request`, for assertions.
    pub built_requests: Mutex<Vec<(String, i64, u32)>>,
    pub sent_requests: Mutex<Vec<Vec<u8>>>,
    pub connect_calls: Mutex<Vec<bool>>,
}

impl Default for FakeProtocolClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProtocolClient {
    pub fn new() -> Self {
        Self {
            authed: AtomicBool::new(true),
            handlers: Arc::new(Mutex::new(HashMap::new())),
            contacts: Mutex::new(Vec::new()),
            groups: Mutex::new(Vec::new()),
            media: Mutex::new(HashMap::new()),
            history_responses: Mutex::new(VecDeque::new()),
            built_requests: Mutex::new(Vec::new()),
            sent_requests: Mutex::new(Vec::new()),
            connect_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_authed(&self, authed: bool) {
        self.authed.store(authed, Ordering::SeqCst);
    }

    pub async fn set_contacts(&self, contacts: Vec<ContactInfo>) {
        *self.contacts.lock().await = contacts;
    }

    pub async fn set_groups(&self, groups: Vec<GroupInfo>) {
        *self.groups.lock().await = groups;
    }

    pub async fn set_media(&self, direct_path: &str, bytes: Vec<u8>) {
        self.media.lock().await.insert(direct_path.to_string(), bytes);
    }

    /// Queue a `HistorySyncBatch` to be delivered on the next
    /// `send_history_sync_request` call.
    pub async fn push_history_response(&self, batch: HistorySyncBatch) {
        self.history_responses.lock().await.push_back(batch);
    }

    /// Directly fan an event out to every registered handler — used by tests
    /// to simulate an inbound `Message`/`Contact`/`GroupInfo` event arriving
    /// outside of the request/response backfill dance.
    pub async fn inject_event(&self, event: Event) {
        let handlers = self.handlers.lock().await;
        for handler in handlers.values() {
            handler(event.clone()).await;
        }
    }

    pub async fn handler_count(&self) -> usize {
        self.handlers.lock().await.len()
    }
}

#[async_trait]
impl ProtocolClient for FakeProtocolClient {
    async fn is_authed(&self) -> Result<bool, WacliError> {
        Ok(self.authed.load(Ordering::SeqCst))
    }

    async fn connect(&self, allow_qr: bool, _wait_for_ready: Duration) -> Result<(), WacliError> {
        self.connect_calls.lock().await.push(allow_qr);
        if !allow_qr && !self.authed.load(Ordering::SeqCst) {
            return Err(WacliError::NotAuthenticated);
        }
        Ok(())
    }

    async fn add_event_handler(&self, handler: HandlerFn) -> HandlerId {
        let id = HandlerId::next();
        self.handlers.lock().await.insert(id.raw(), handler);
        id
    }

    async fn remove_event_handler(&self, id: HandlerId) {
        self.handlers.lock().await.remove(&id.raw());
    }

    async fn get_all_contacts(&self) -> Result<Vec<ContactInfo>, WacliError> {
        Ok(self.contacts.lock().await.clone())
    }

    async fn get_joined_groups(&self) -> Result<Vec<GroupInfo>, WacliError> {
        Ok(self.groups.lock().await.clone())
    }

    async fn get_group_info(&self, jid: &str) -> Result<GroupInfo, WacliError> {
        self.groups
            .lock()
            .await
            .iter()
            .find(|g| g.jid == jid)
            .cloned()
            .ok_or_else(|| WacliError::NotFound(format!("group {jid}")))
    }

    async fn set_group_name(&self, jid: &str, name: &str) -> Result<(), WacliError> {
        let mut groups = self.groups.lock().await;
        let group = groups
            .iter_mut()
            .find(|g| g.jid == jid)
            .ok_or_else(|| WacliError::NotFound(format!("group {jid}")))?;
        group.name = name.to_string();
        Ok(())
    }

    async fn update_group_participants(
        &self,
        group_jid: &str,
        users: &[String],
        action: ParticipantAction,
    ) -> Result<(), WacliError> {
        let mut groups = self.groups.lock().await;
        let group = groups
            .iter_mut()
            .find(|g| g.jid == group_jid)
            .ok_or_else(|| WacliError::NotFound(format!("group {group_jid}")))?;

        match action {
            ParticipantAction::Add => {
                for u in users {
                    if !group.participants.iter().any(|(j, _)| j == u) {
                        group
                            .participants
                            .push((u.clone(), wacli_core::entities::GroupRole::Member));
                    }
                }
            }
            ParticipantAction::Remove => {
                group.participants.retain(|(j, _)| !users.contains(j));
            }
            ParticipantAction::Promote => {
                for (j, role) in group.participants.iter_mut() {
                    if users.contains(j) {
                        *role = wacli_core::entities::GroupRole::Admin;
                    }
                }
            }
            ParticipantAction::Demote => {
                for (j, role) in group.participants.iter_mut() {
                    if users.contains(j) {
                        *role = wacli_core::entities::GroupRole::Member;
                    }
                }
            }
        }
        Ok(())
    }

    async fn leave_group(&self, jid: &str) -> Result<(), WacliError> {
        self.groups.lock().await.retain(|g| g.jid != jid);
        Ok(())
    }

    async fn get_group_invite_link(&self, jid: &str, _revoke: bool) -> Result<String, WacliError> {
        Ok(format!("https://chat.whatsapp.com/fake-{jid}"))
    }

    async fn join_group_with_link(&self, code: &str) -> Result<String, WacliError> {
        Ok(format!("{code}@g.us"))
    }

    async fn download_media_to_file(
        &self,
        direct_path: &str,
        _file_enc_sha256: &[u8],
        _file_sha256: &[u8],
        media_key: &[u8],
        _file_length: i64,
        _media_type: MediaType,
        _mime_type: &str,
        target_path: &Path,
    ) -> Result<u64, WacliError> {
        if direct_path.is_empty() || media_key.is_empty() {
            return Err(WacliError::InvalidArgument(
                "message has no media metadata".into(),
            ));
        }

        let bytes = self
            .media
            .lock()
            .await
            .get(direct_path)
            .cloned()
            .unwrap_or_else(|| b"fake".to_vec());

        if let Some(parent) = target_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target_path, &bytes)?;
        Ok(bytes.len() as u64)
    }

    async fn build_history_sync_request(
        &self,
        chat_jid: &str,
        last_known_ts: i64,
        count: u32,
    ) -> Result<Vec<u8>, WacliError> {
        self.built_requests
            .lock()
            .await
            .push((chat_jid.to_string(), last_known_ts, count));
        Ok(format!("{chat_jid}:{last_known_ts}:{count}").into_bytes())
    }

    async fn send_history_sync_request(&self, blob: &[u8]) -> Result<(), WacliError> {
        self.sent_requests.lock().await.push(blob.to_vec());

        if let Some(batch) = self.history_responses.lock().await.pop_front() {
            self.inject_event(Event::HistorySync(batch)).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_and_remove_handler_is_tracked() {
        let fake = FakeProtocolClient::new();
        let id = fake
            .add_event_handler(Box::new(|_| Box::pin(async {})))
            .await;
        assert_eq!(fake.handler_count().await, 1);
        fake.remove_event_handler(id).await;
        assert_eq!(fake.handler_count().await, 0);
    }

    #[tokio::test]
    async fn connect_without_qr_requires_auth() {
        let fake = FakeProtocolClient::new();
        fake.set_authed(false);
        let err = fake.connect(false, Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, WacliError::NotAuthenticated));

        fake.set_authed(true);
        fake.connect(false, Duration::from_millis(10)).await.unwrap();
    }

    #[tokio::test]
    async fn download_requires_media_metadata() {
        let fake = FakeProtocolClient::new();
        let dir = tempfile::tempdir().unwrap();
        let err = fake
            .download_media_to_file(
                "",
                &[],
                &[],
                &[],
                0,
                MediaType::Image,
                "image/jpeg",
                &dir.path().join("out"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WacliError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn send_history_sync_request_delivers_queued_response() {
        let fake = FakeProtocolClient::new();
        fake.push_history_response(HistorySyncBatch {
            reached_end: true,
            ..Default::default()
        })
        .await;

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        fake.add_event_handler(Box::new(move |event| {
            let received = received_clone.clone();
            Box::pin(async move {
                received.lock().await.push(event);
            })
        }))
        .await;

        fake.send_history_sync_request(b"req").await.unwrap();
        assert_eq!(received.lock().await.len(), 1);
    }
}
