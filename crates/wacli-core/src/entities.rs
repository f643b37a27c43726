//! Typed representations of the data model in spec section 3.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A WhatsApp identifier: `<phone>@s.whatsapp.net`, `<id>@g.us`, or
/// `<id>@broadcast`. `kind()` derives the chat kind from the server part
/// rather than storing it redundantly alongside the jid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Jid(String);

impl Jid {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the chat kind from the server part of the jid.
    pub fn kind(&self) -> ChatKind {
        if self.0.ends_with("@g.us") {
            ChatKind::Group
        } else if self.0.ends_with("@s.whatsapp.net") {
            ChatKind::Dm
        } else if self.0.ends_with("@broadcast") {
            ChatKind::Broadcast
        } else {
            ChatKind::Unknown
        }
    }

    /// The user/id part before the `@`.
    pub fn user(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Jid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Jid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Jid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Chat kind, derived from the jid's server part — never stored redundantly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Dm,
    Group,
    Broadcast,
    Unknown,
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChatKind::Dm => "dm",
            ChatKind::Group => "group",
            ChatKind::Broadcast => "broadcast",
            ChatKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Dm => "dm",
            ChatKind::Group => "group",
            ChatKind::Broadcast => "broadcast",
            ChatKind::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "dm" => ChatKind::Dm,
            "group" => ChatKind::Group,
            "broadcast" => ChatKind::Broadcast,
            _ => ChatKind::Unknown,
        }
    }
}

/// A group participant's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    Member,
    Admin,
    SuperAdmin,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Member => "member",
            GroupRole::Admin => "admin",
            GroupRole::SuperAdmin => "superadmin",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => GroupRole::Admin,
            "superadmin" => GroupRole::SuperAdmin,
            _ => GroupRole::Member,
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The action side of `UpdateGroupParticipants`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantAction {
    Add,
    Remove,
    Promote,
    Demote,
}

impl ParticipantAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantAction::Add => "add",
            ParticipantAction::Remove => "remove",
            ParticipantAction::Promote => "promote",
            ParticipantAction::Demote => "demote",
        }
    }
}

/// Media attached to a message. `Other` preserves an unrecognized type tag
/// verbatim rather than collapsing it to `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
    Sticker,
    Other(String),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Document => "document",
            MediaType::Sticker => "sticker",
            MediaType::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "image" => MediaType::Image,
            "video" => MediaType::Video,
            "audio" => MediaType::Audio,
            "document" => MediaType::Document,
            "sticker" => MediaType::Sticker,
            other => MediaType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jid_kind_from_server_part() {
        assert_eq!(Jid::new("123@s.whatsapp.net").kind(), ChatKind::Dm);
        assert_eq!(Jid::new("123@g.us").kind(), ChatKind::Group);
        assert_eq!(Jid::new("123@broadcast").kind(), ChatKind::Broadcast);
        assert_eq!(Jid::new("123@weird.net").kind(), ChatKind::Unknown);
    }

    #[test]
    fn jid_user_part() {
        assert_eq!(Jid::new("5511999887766@s.whatsapp.net").user(), "5511999887766");
    }

    #[test]
    fn media_type_roundtrip() {
        assert_eq!(MediaType::parse("image"), MediaType::Image);
        assert_eq!(MediaType::parse("vcard"), MediaType::Other("vcard".into()));
        assert_eq!(MediaType::Other("vcard".into()).as_str(), "vcard");
    }

    #[test]
    fn group_role_roundtrip() {
        assert_eq!(GroupRole::parse("admin"), GroupRole::Admin);
        assert_eq!(GroupRole::parse("superadmin"), GroupRole::SuperAdmin);
        assert_eq!(GroupRole::parse("member"), GroupRole::Member);
        assert_eq!(GroupRole::parse("bogus"), GroupRole::Member);
    }
}
