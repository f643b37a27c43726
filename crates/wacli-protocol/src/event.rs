//! Domain events republished from the protocol library, decoupled from
//! `wacore`'s event types so `wacli-app` and `FakeProtocolClient` never name
//! a library type directly (spec section 4.3/4.4).

use wacli_core::entities::MediaType;

/// A single inbound or historical message, already unwrapped of
/// device-sent/ephemeral/view-once nesting.
#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub chat_jid: String,
    pub chat_name: String,
    pub msg_id: String,
    pub sender_jid: String,
    pub sender_name: String,
    pub timestamp: i64,
    pub from_me: bool,
    pub text: String,
    pub media_type: Option<MediaType>,
    pub media_caption: String,
    pub filename: String,
    pub mime_type: String,
    pub direct_path: String,
    pub media_key: Option<Vec<u8>>,
    pub file_sha256: Option<Vec<u8>>,
    pub file_enc_sha256: Option<Vec<u8>>,
    pub file_length: Option<i64>,
}

/// One conversation's worth of messages embedded in a history-sync payload.
#[derive(Debug, Clone, Default)]
pub struct ConversationSync {
    pub chat_jid: String,
    pub chat_name: String,
    pub messages: Vec<IncomingMessage>,
}

/// A history-sync batch: either part of the initial bulk sync (`on_demand_for
/// == None`) or the response to a `SendHistorySyncRequest` for a specific
/// chat (spec section 4.4 backfill loop).
#[derive(Debug, Clone, Default)]
pub struct HistorySyncBatch {
    pub conversations: Vec<ConversationSync>,
    pub on_demand_for: Option<String>,
    pub reached_end: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ContactUpdate {
    pub jid: String,
    pub phone: String,
    pub push_name: String,
    pub full_name: String,
    pub first_name: String,
    pub business_name: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct GroupInfoUpdate {
    pub jid: String,
}

/// Events fanned out to every handler registered via
/// [`crate::ProtocolClient::add_event_handler`].
#[derive(Debug, Clone)]
pub enum Event {
    PairingQrCode(String),
    PairSuccess,
    Connected,
    Disconnected,
    LoggedOut,
    Message(IncomingMessage),
    HistorySync(HistorySyncBatch),
    Contact(ContactUpdate),
    GroupInfo(GroupInfoUpdate),
}
