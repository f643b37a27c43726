//! Row and parameter types shared across `Store` operations.

use wacli_core::entities::{ChatKind, GroupRole, MediaType};

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRow {
    pub jid: String,
    pub kind: ChatKind,
    pub name: String,
    pub last_message_ts: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContactRow {
    pub jid: String,
    pub phone: String,
    pub push_name: String,
    pub full_name: String,
    pub first_name: String,
    pub business_name: String,
    pub updated_at: i64,
    pub alias: Option<String>,
    pub tags: Vec<String>,
}

impl ContactRow {
    /// First non-empty of (alias, full_name, push_name, business_name,
    /// first_name), per spec section 4.1.
    pub fn display_name(&self) -> &str {
        for candidate in [
            self.alias.as_deref(),
            Some(self.full_name.as_str()),
            Some(self.push_name.as_str()),
            Some(self.business_name.as_str()),
            Some(self.first_name.as_str()),
        ]
        .into_iter()
        .flatten()
        {
            if !candidate.is_empty() {
                return candidate;
            }
        }
        ""
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub jid: String,
    pub name: String,
    pub owner_jid: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupParticipant {
    pub group_jid: String,
    pub user_jid: String,
    pub role: GroupRole,
    pub updated_at: i64,
}

/// Widening-upsert parameters for a single message (spec section 3
/// invariant 1, section 9).
#[derive(Debug, Clone, Default)]
pub struct MessageUpsert {
    pub chat_jid: String,
    pub msg_id: String,
    pub sender_jid: Option<String>,
    pub sender_name: Option<String>,
    pub timestamp: Option<i64>,
    pub from_me: Option<bool>,
    pub text: Option<String>,
    pub display_text: Option<String>,
    pub media_type: Option<MediaType>,
    pub media_caption: Option<String>,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub direct_path: Option<String>,
    pub media_key: Option<Vec<u8>>,
    pub file_sha256: Option<Vec<u8>>,
    pub file_enc_sha256: Option<Vec<u8>>,
    pub file_length: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub chat_jid: String,
    pub msg_id: String,
    pub sender_jid: String,
    pub sender_name: String,
    pub timestamp: i64,
    pub from_me: bool,
    pub text: String,
    pub display_text: String,
    pub media_type: Option<MediaType>,
    pub media_caption: String,
    pub filename: String,
    pub mime_type: String,
    pub direct_path: String,
    pub media_key: Option<Vec<u8>>,
    pub file_sha256: Option<Vec<u8>>,
    pub file_enc_sha256: Option<Vec<u8>>,
    pub file_length: Option<i64>,
    pub local_path: Option<String>,
    pub downloaded_at: Option<i64>,
}

/// The opaque decryption tuple needed to fetch and decrypt a media blob
/// (spec GLOSSARY).
#[derive(Debug, Clone, PartialEq)]
pub struct MediaDownloadInfo {
    pub direct_path: String,
    pub media_key: Vec<u8>,
    pub file_sha256: Vec<u8>,
    pub file_enc_sha256: Vec<u8>,
    pub file_length: i64,
    pub media_type: MediaType,
    pub mime_type: String,
    pub filename: String,
}

/// The oldest known message for a chat, used as the backfill cursor (spec
/// section 4.3 "oldest known message per chat", section 8 scenario 1).
#[derive(Debug, Clone, PartialEq)]
pub struct OldestMessageInfo {
    pub msg_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default)]
pub struct SearchMessagesParams {
    pub query: String,
    pub chat: Option<String>,
    pub from: Option<String>,
    pub media_type: Option<MediaType>,
    pub before: Option<i64>,
    pub after: Option<i64>,
    pub limit: i64,
}
