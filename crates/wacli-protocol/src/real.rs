//! Real `ProtocolClient` backed by a live `whatsapp-rust` session (spec
//! section 4.3), grounded on `omega-channels::whatsapp::bot`'s `Bot::builder`
//! + `on_event` dispatch pattern and `channel.rs`'s client-call shape.
//!
//! The library registers exactly one `on_event` closure at build time (see
//! `build_and_run_bot`); `wacli` needs many independent, addable/removable
//! handlers (spec section 4.3 "AddEventHandler/RemoveEventHandler"). The
//! bridge: the single library closure translates every `wacore` event into
//! our own [`Event`] and fans it out to whatever handlers are currently
//! registered in `self.handlers`, which is the only thing `add_event_handler`
//! / `remove_event_handler` ever touch.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, info, warn};

use wacore::types::events::Event as WaEvent;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::client::Client;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

use wacli_core::entities::{GroupRole, MediaType, ParticipantAction};
use wacli_core::error::WacliError;

use crate::client::{ContactInfo, GroupInfo, HandlerFn, HandlerId, ProtocolClient};
use crate::event::{ContactUpdate, ConversationSync, Event, GroupInfoUpdate, HistorySyncBatch, IncomingMessage};
use crate::session_store::SqliteSessionBackend;

type HandlerMap = Arc<RwLock<HashMap<u64, HandlerFn>>>;

/// `ProtocolClient` implementation wrapping `whatsapp-rust`. One instance per
/// `wacli` process; the underlying `Client` handle is populated once the bot
/// connects and cleared on disconnect/logout.
pub struct WhatsmeowClient {
    session_dir: std::path::PathBuf,
    client: Arc<Mutex<Option<Arc<Client>>>>,
    handlers: HandlerMap,
    bot_started: Mutex<bool>,
    ready: Arc<Notify>,
}

impl WhatsmeowClient {
    /// `session_dir` holds `session.db` (spec section 6) — distinct from the
    /// `wacli-store` mirror directory.
    pub fn new(session_dir: &Path) -> Self {
        Self {
            session_dir: session_dir.to_path_buf(),
            client: Arc::new(Mutex::new(None)),
            handlers: Arc::new(RwLock::new(HashMap::new())),
            bot_started: Mutex::new(false),
            ready: Arc::new(Notify::new()),
        }
    }

    async fn client_handle(&self) -> Result<Arc<Client>, WacliError> {
        self.client
            .lock()
            .await
            .clone()
            .ok_or(WacliError::NotAuthenticated)
    }

    async fn fan_out(handlers: &HandlerMap, event: Event) {
        let handlers = handlers.read().await;
        for handler in handlers.values() {
            handler(event.clone()).await;
        }
    }

    /// Build and run the bot exactly once per process. Safe to call
    /// repeatedly — a second call is a no-op once the first has started.
    async fn ensure_started(&self) -> Result<(), WacliError> {
        let mut started = self.bot_started.lock().await;
        if *started {
            return Ok(());
        }

        let backend = Arc::new(
            SqliteSessionBackend::open(&self.session_dir)
                .await
                .map_err(|e| WacliError::ProtocolError(format!("session store init: {e}")))?,
        );

        let client_handle = self.client.clone();
        let handlers = self.handlers.clone();
        let ready = self.ready.clone();

        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_device_props(
                Some("wacli".to_string()),
                None,
                Some(waproto::whatsapp::device_props::PlatformType::Desktop),
            )
            .on_event(move |event, client| {
                let client_handle = client_handle.clone();
                let handlers = handlers.clone();
                let ready = ready.clone();
                async move {
                    dispatch(event, client, &client_handle, &handlers, &ready).await;
                }
            })
            .build()
            .await
            .map_err(|e| WacliError::ProtocolError(format!("bot build failed: {e}")))?;

        *self.client.lock().await = Some(bot.client());

        bot.run()
            .await
            .map_err(|e| WacliError::ProtocolError(format!("bot run failed: {e}")))?;

        *started = true;
        info!("whatsapp-rust bot started");
        Ok(())
    }
}

/// Translate a library event into our [`Event`] and fan it out. Events the
/// core doesn't model (app-state sync progress, receipts, presence, ...) are
/// dropped silently — they have no counterpart in the data model (spec
/// section 3).
async fn dispatch(
    event: WaEvent,
    client: Arc<Client>,
    client_handle: &Arc<Mutex<Option<Arc<Client>>>>,
    handlers: &HandlerMap,
    ready: &Arc<Notify>,
) {
    match event {
        WaEvent::PairingQrCode { code, .. } => {
            debug!("pairing QR code emitted");
            WhatsmeowClient::fan_out(handlers, Event::PairingQrCode(code)).await;
        }
        WaEvent::PairSuccess(_) => {
            info!("pairing succeeded");
            WhatsmeowClient::fan_out(handlers, Event::PairSuccess).await;
        }
        WaEvent::Connected(_) => {
            info!("connected");
            *client_handle.lock().await = Some(client);
            ready.notify_waiters();
            WhatsmeowClient::fan_out(handlers, Event::Connected).await;
        }
        WaEvent::Disconnected(_) => {
            warn!("disconnected");
            WhatsmeowClient::fan_out(handlers, Event::Disconnected).await;
        }
        WaEvent::LoggedOut(_) => {
            warn!("logged out — session invalidated");
            *client_handle.lock().await = None;
            WhatsmeowClient::fan_out(handlers, Event::LoggedOut).await;
        }
        WaEvent::Message(msg, info) => {
            if let Some(incoming) = unwrap_message(*msg, info) {
                WhatsmeowClient::fan_out(handlers, Event::Message(incoming)).await;
            }
        }
        WaEvent::HistorySync(payload) => {
            let batch = translate_history_sync(payload);
            WhatsmeowClient::fan_out(handlers, Event::HistorySync(batch)).await;
        }
        WaEvent::Contact(update) => {
            WhatsmeowClient::fan_out(
                handlers,
                Event::Contact(ContactUpdate {
                    jid: update.jid.to_string(),
                    push_name: update.push_name.unwrap_or_default(),
                    full_name: update.full_name.unwrap_or_default(),
                    first_name: update.first_name.unwrap_or_default(),
                    business_name: update.business_name.unwrap_or_default(),
                    updated_at: chrono::Utc::now().timestamp(),
                    ..Default::default()
                }),
            )
            .await;
        }
        WaEvent::GroupInfo(update) => {
            WhatsmeowClient::fan_out(
                handlers,
                Event::GroupInfo(GroupInfoUpdate {
                    jid: update.jid.to_string(),
                }),
            )
            .await;
        }
        _ => {}
    }
}

/// Unwrap device-sent/ephemeral/view-once nesting and extract the fields the
/// store needs, the same shape as `omega-channels::whatsapp::events`'s
/// unwrap chain but without the self-chat-only filtering (wacli mirrors all
/// chats).
fn unwrap_message(
    msg: waproto::whatsapp::Message,
    info: wacore::types::message::MessageInfo,
) -> Option<IncomingMessage> {
    let inner = msg
        .device_sent_message
        .as_ref()
        .and_then(|d| d.message.as_deref())
        .or_else(|| msg.ephemeral_message.as_ref().and_then(|e| e.message.as_deref()))
        .or_else(|| msg.view_once_message.as_ref().and_then(|v| v.message.as_deref()))
        .unwrap_or(&msg);

    let text = inner
        .conversation
        .clone()
        .or_else(|| inner.extended_text_message.as_ref().and_then(|e| e.text.clone()))
        .unwrap_or_default();

    let mut out = IncomingMessage {
        chat_jid: info.source.chat.to_string(),
        chat_name: String::new(),
        msg_id: info.id.clone(),
        sender_jid: info.source.sender.to_string(),
        sender_name: info.push_name.clone(),
        timestamp: info.timestamp.timestamp(),
        from_me: info.source.is_from_me,
        text,
        ..Default::default()
    };

    if let Some(img) = &inner.image_message {
        out.media_type = Some(MediaType::Image);
        out.media_caption = img.caption.clone().unwrap_or_default();
        out.mime_type = img.mimetype.clone().unwrap_or_default();
        out.direct_path = img.direct_path.clone().unwrap_or_default();
        out.media_key = img.media_key.clone();
        out.file_sha256 = img.file_sha256.clone();
        out.file_enc_sha256 = img.file_enc_sha256.clone();
        out.file_length = img.file_length.map(|l| l as i64);
    } else if let Some(doc) = &inner.document_message {
        out.media_type = Some(MediaType::Document);
        out.media_caption = doc.caption.clone().unwrap_or_default();
        out.filename = doc.file_name.clone().unwrap_or_default();
        out.mime_type = doc.mimetype.clone().unwrap_or_default();
        out.direct_path = doc.direct_path.clone().unwrap_or_default();
        out.media_key = doc.media_key.clone();
        out.file_sha256 = doc.file_sha256.clone();
        out.file_enc_sha256 = doc.file_enc_sha256.clone();
        out.file_length = doc.file_length.map(|l| l as i64);
    } else if let Some(aud) = &inner.audio_message {
        out.media_type = Some(MediaType::Audio);
        out.mime_type = aud.mimetype.clone().unwrap_or_default();
        out.direct_path = aud.direct_path.clone().unwrap_or_default();
        out.media_key = aud.media_key.clone();
        out.file_sha256 = aud.file_sha256.clone();
        out.file_enc_sha256 = aud.file_enc_sha256.clone();
        out.file_length = aud.file_length.map(|l| l as i64);
    } else if let Some(vid) = &inner.video_message {
        out.media_type = Some(MediaType::Video);
        out.media_caption = vid.caption.clone().unwrap_or_default();
        out.mime_type = vid.mimetype.clone().unwrap_or_default();
        out.direct_path = vid.direct_path.clone().unwrap_or_default();
        out.media_key = vid.media_key.clone();
        out.file_sha256 = vid.file_sha256.clone();
        out.file_enc_sha256 = vid.file_enc_sha256.clone();
        out.file_length = vid.file_length.map(|l| l as i64);
    } else if let Some(sticker) = &inner.sticker_message {
        out.media_type = Some(MediaType::Sticker);
        out.mime_type = sticker.mimetype.clone().unwrap_or_default();
        out.direct_path = sticker.direct_path.clone().unwrap_or_default();
        out.media_key = sticker.media_key.clone();
        out.file_sha256 = sticker.file_sha256.clone();
        out.file_enc_sha256 = sticker.file_enc_sha256.clone();
        out.file_length = sticker.file_length.map(|l| l as i64);
    } else if out.text.is_empty() {
        return None;
    }

    Some(out)
}

fn translate_history_sync(payload: wacore::types::events::HistorySyncPayload) -> HistorySyncBatch {
    HistorySyncBatch {
        conversations: payload
            .conversations
            .into_iter()
            .map(|c| ConversationSync {
                chat_jid: c.jid,
                chat_name: c.name,
                messages: c
                    .messages
                    .into_iter()
                    .filter_map(|(msg, info)| unwrap_message(msg, info))
                    .collect(),
            })
            .collect(),
        on_demand_for: payload.on_demand_for,
        reached_end: payload.reached_end,
    }
}

/// Adapter exposing the opaque `(direct_path, media_key, file_sha256,
/// file_enc_sha256, file_length)` tuple the store hands back as a
/// `whatsapp_rust::download::Downloadable`, so arbitrary stored media can be
/// re-downloaded without the library's concrete per-message-type wrappers.
struct OpaqueMedia<'a> {
    direct_path: &'a str,
    media_key: &'a [u8],
    file_sha256: &'a [u8],
    file_enc_sha256: &'a [u8],
    file_length: i64,
    media_type: MediaType,
    mime_type: &'a str,
}

impl<'a> whatsapp_rust::download::Downloadable for OpaqueMedia<'a> {
    fn direct_path(&self) -> Option<&str> {
        Some(self.direct_path)
    }
    fn media_key(&self) -> Option<&[u8]> {
        Some(self.media_key)
    }
    fn file_enc_sha256(&self) -> Option<&[u8]> {
        Some(self.file_enc_sha256)
    }
    fn file_sha256(&self) -> Option<&[u8]> {
        Some(self.file_sha256)
    }
    fn file_length(&self) -> Option<u64> {
        Some(self.file_length as u64)
    }
    fn media_type(&self) -> whatsapp_rust::download::MediaType {
        match self.media_type {
            MediaType::Image => whatsapp_rust::download::MediaType::Image,
            MediaType::Video => whatsapp_rust::download::MediaType::Video,
            MediaType::Audio => whatsapp_rust::download::MediaType::Audio,
            MediaType::Sticker => whatsapp_rust::download::MediaType::Image,
            _ => whatsapp_rust::download::MediaType::Document,
        }
    }
    fn mime_type(&self) -> Option<&str> {
        Some(self.mime_type)
    }
}

#[async_trait]
impl ProtocolClient for WhatsmeowClient {
    async fn is_authed(&self) -> Result<bool, WacliError> {
        let backend = SqliteSessionBackend::open(&self.session_dir)
            .await
            .map_err(|e| WacliError::ProtocolError(format!("session store init: {e}")))?;
        use wacore::store::traits::DeviceStore;
        backend
            .exists()
            .await
            .map_err(|e| WacliError::ProtocolError(format!("device store probe: {e}")))
    }

    async fn connect(&self, allow_qr: bool, wait_for_ready: Duration) -> Result<(), WacliError> {
        if !allow_qr && !self.is_authed().await? {
            return Err(WacliError::NotAuthenticated);
        }

        self.ensure_started().await?;

        if self.client.lock().await.is_some() {
            return Ok(());
        }

        match tokio::time::timeout(wait_for_ready, self.ready.notified()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(WacliError::Transient("connect timed out".into())),
        }
    }

    async fn add_event_handler(&self, handler: HandlerFn) -> HandlerId {
        let id = HandlerId::next();
        self.handlers.write().await.insert(id.raw(), handler);
        id
    }

    async fn remove_event_handler(&self, id: HandlerId) {
        self.handlers.write().await.remove(&id.raw());
    }

    async fn get_all_contacts(&self) -> Result<Vec<ContactInfo>, WacliError> {
        let client = self.client_handle().await?;
        let contacts = client
            .store()
            .contacts()
            .get_all_contacts()
            .await
            .map_err(|e| WacliError::ProtocolError(format!("get_all_contacts: {e}")))?;

        Ok(contacts
            .into_iter()
            .map(|c| ContactInfo {
                jid: c.jid.to_string(),
                phone: c.jid.user.clone(),
                push_name: c.push_name.unwrap_or_default(),
                full_name: c.full_name.unwrap_or_default(),
                first_name: c.first_name.unwrap_or_default(),
                business_name: c.business_name.unwrap_or_default(),
            })
            .collect())
    }

    async fn get_joined_groups(&self) -> Result<Vec<GroupInfo>, WacliError> {
        let client = self.client_handle().await?;
        let groups = client
            .groups()
            .get_joined_groups()
            .await
            .map_err(|e| WacliError::ProtocolError(format!("get_joined_groups: {e}")))?;

        Ok(groups.into_iter().map(translate_group_info).collect())
    }

    async fn get_group_info(&self, jid: &str) -> Result<GroupInfo, WacliError> {
        let client = self.client_handle().await?;
        let parsed: wacore_binary::jid::Jid = jid
            .parse()
            .map_err(|e| WacliError::InvalidArgument(format!("invalid group jid: {e}")))?;
        let info = client
            .groups()
            .get_group_info(&parsed)
            .await
            .map_err(|e| WacliError::ProtocolError(format!("get_group_info: {e}")))?;
        Ok(translate_group_info(info))
    }

    async fn set_group_name(&self, jid: &str, name: &str) -> Result<(), WacliError> {
        let client = self.client_handle().await?;
        let parsed: wacore_binary::jid::Jid = jid
            .parse()
            .map_err(|e| WacliError::InvalidArgument(format!("invalid group jid: {e}")))?;
        client
            .groups()
            .set_group_name(&parsed, name)
            .await
            .map_err(|e| WacliError::ProtocolError(format!("set_group_name: {e}")))
    }

    async fn update_group_participants(
        &self,
        group_jid: &str,
        users: &[String],
        action: ParticipantAction,
    ) -> Result<(), WacliError> {
        let client = self.client_handle().await?;
        let group: wacore_binary::jid::Jid = group_jid
            .parse()
            .map_err(|e| WacliError::InvalidArgument(format!("invalid group jid: {e}")))?;
        let parsed_users: Result<Vec<wacore_binary::jid::Jid>, _> =
            users.iter().map(|u| u.parse()).collect();
        let parsed_users =
            parsed_users.map_err(|e| WacliError::InvalidArgument(format!("invalid user jid: {e}")))?;

        let wa_action = match action {
            ParticipantAction::Add => whatsapp_rust::types::group::ParticipantAction::Add,
            ParticipantAction::Remove => whatsapp_rust::types::group::ParticipantAction::Remove,
            ParticipantAction::Promote => whatsapp_rust::types::group::ParticipantAction::Promote,
            ParticipantAction::Demote => whatsapp_rust::types::group::ParticipantAction::Demote,
        };

        client
            .groups()
            .update_participants(&group, &parsed_users, wa_action)
            .await
            .map_err(|e| WacliError::ProtocolError(format!("update_group_participants: {e}")))
    }

    async fn leave_group(&self, jid: &str) -> Result<(), WacliError> {
        let client = self.client_handle().await?;
        let parsed: wacore_binary::jid::Jid = jid
            .parse()
            .map_err(|e| WacliError::InvalidArgument(format!("invalid group jid: {e}")))?;
        client
            .groups()
            .leave_group(&parsed)
            .await
            .map_err(|e| WacliError::ProtocolError(format!("leave_group: {e}")))
    }

    async fn get_group_invite_link(&self, jid: &str, revoke: bool) -> Result<String, WacliError> {
        let client = self.client_handle().await?;
        let parsed: wacore_binary::jid::Jid = jid
            .parse()
            .map_err(|e| WacliError::InvalidArgument(format!("invalid group jid: {e}")))?;
        client
            .groups()
            .get_group_invite_link(&parsed, revoke)
            .await
            .map_err(|e| WacliError::ProtocolError(format!("get_group_invite_link: {e}")))
    }

    async fn join_group_with_link(&self, code: &str) -> Result<String, WacliError> {
        let client = self.client_handle().await?;
        let jid = client
            .groups()
            .join_group_with_link(code)
            .await
            .map_err(|e| WacliError::ProtocolError(format!("join_group_with_link: {e}")))?;
        Ok(jid.to_string())
    }

    async fn download_media_to_file(
        &self,
        direct_path: &str,
        file_enc_sha256: &[u8],
        file_sha256: &[u8],
        media_key: &[u8],
        file_length: i64,
        media_type: MediaType,
        mime_type: &str,
        target_path: &Path,
    ) -> Result<u64, WacliError> {
        if direct_path.is_empty() || media_key.is_empty() {
            return Err(WacliError::InvalidArgument(
                "message has no media metadata".into(),
            ));
        }

        let client = self.client_handle().await?;
        if let Some(parent) = target_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(target_path)?;

        let media = OpaqueMedia {
            direct_path,
            media_key,
            file_sha256,
            file_enc_sha256,
            file_length,
            media_type,
            mime_type,
        };

        client
            .download_to_file(&media, file)
            .await
            .map_err(|e| WacliError::ProtocolError(format!("media download failed: {e}")))?;

        Ok(std::fs::metadata(target_path)?.len())
    }

    async fn build_history_sync_request(
        &self,
        chat_jid: &str,
        last_known_ts: i64,
        count: u32,
    ) -> Result<Vec<u8>, WacliError> {
        let client = self.client_handle().await?;
        let parsed: wacore_binary::jid::Jid = chat_jid
            .parse()
            .map_err(|e| WacliError::InvalidArgument(format!("invalid chat jid: {e}")))?;
        client
            .history_sync()
            .build_request(&parsed, last_known_ts, count)
            .await
            .map_err(|e| WacliError::ProtocolError(format!("build_history_sync_request: {e}")))
    }

    async fn send_history_sync_request(&self, blob: &[u8]) -> Result<(), WacliError> {
        let client = self.client_handle().await?;
        client
            .history_sync()
            .send_request(blob)
            .await
            .map_err(|e| WacliError::ProtocolError(format!("send_history_sync_request: {e}")))
    }
}

fn translate_group_info(info: whatsapp_rust::types::group::GroupInfo) -> GroupInfo {
    GroupInfo {
        jid: info.jid.to_string(),
        name: info.name,
        owner_jid: info.owner.map(|j| j.to_string()).unwrap_or_default(),
        created_at: info.created_at,
        participants: info
            .participants
            .into_iter()
            .map(|p| {
                let role = if p.is_super_admin {
                    GroupRole::SuperAdmin
                } else if p.is_admin {
                    GroupRole::Admin
                } else {
                    GroupRole::Member
                };
                (p.jid.to_string(), role)
            })
            .collect(),
    }
}
