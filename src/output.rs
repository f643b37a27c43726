//! Human/JSON rendering (spec section 4.5 "Output contract"): JSON is
//! stable snake_case with RFC 3339 timestamps and byte-blobs omitted; human
//! output is tab-aligned columns built from `wacli_core::output::truncate`.

use serde::Serialize;
use serde_json::Value;

use wacli_core::output::{format_timestamp, truncate};
use wacli_lock::OwnerInfo;
use wacli_store::{ChatRow, ContactRow, GroupParticipant, GroupRow, MessageRow};

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to encode JSON output: {e}"),
    }
}

/// Print a simple tab-aligned table: `headers` on the first line, each row
/// below with the same column order. Columns are padded to the widest cell
/// in that column plus one space, the way a fixed-width terminal report
/// reads without needing a table-drawing dependency.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.len());
            }
        }
    }

    let print_row = |cells: &[String]| {
        let line: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:<width$}", c, width = widths.get(i).copied().unwrap_or(0)))
            .collect();
        println!("{}", line.join("  ").trim_end());
    };

    print_row(&headers.iter().map(|h| h.to_string()).collect::<Vec<_>>());
    for row in rows {
        print_row(row);
    }
}

const COL_TEXT_WIDTH: usize = 40;
const COL_NAME_WIDTH: usize = 24;

#[derive(Debug, Serialize)]
pub struct ChatJson {
    pub jid: String,
    pub kind: String,
    pub name: String,
    pub last_message_ts: String,
}

impl From<&ChatRow> for ChatJson {
    fn from(c: &ChatRow) -> Self {
        Self {
            jid: c.jid.clone(),
            kind: c.kind.as_str().to_string(),
            name: c.name.clone(),
            last_message_ts: format_timestamp(c.last_message_ts),
        }
    }
}

pub fn print_chats(chats: &[ChatRow], json: bool) {
    if json {
        let out: Vec<ChatJson> = chats.iter().map(ChatJson::from).collect();
        print_json(&out);
        return;
    }
    let rows = chats
        .iter()
        .map(|c| {
            vec![
                c.jid.clone(),
                c.kind.as_str().to_string(),
                truncate(&c.name, COL_NAME_WIDTH),
                format_timestamp(c.last_message_ts),
            ]
        })
        .collect::<Vec<_>>();
    print_table(&["JID", "KIND", "NAME", "LAST_MESSAGE"], &rows);
}

pub fn print_chat(chat: &ChatRow, json: bool) {
    if json {
        print_json(&ChatJson::from(chat));
    } else {
        print_table(
            &["JID", "KIND", "NAME", "LAST_MESSAGE"],
            &[vec![
                chat.jid.clone(),
                chat.kind.as_str().to_string(),
                chat.name.clone(),
                format_timestamp(chat.last_message_ts),
            ]],
        );
    }
}

#[derive(Debug, Serialize)]
pub struct ContactJson {
    pub jid: String,
    pub phone: String,
    pub push_name: String,
    pub full_name: String,
    pub first_name: String,
    pub business_name: String,
    pub display_name: String,
    pub alias: Option<String>,
    pub tags: Vec<String>,
    pub updated_at: String,
}

impl From<&ContactRow> for ContactJson {
    fn from(c: &ContactRow) -> Self {
        Self {
            jid: c.jid.clone(),
            phone: c.phone.clone(),
            push_name: c.push_name.clone(),
            full_name: c.full_name.clone(),
            first_name: c.first_name.clone(),
            business_name: c.business_name.clone(),
            display_name: c.display_name().to_string(),
            alias: c.alias.clone(),
            tags: c.tags.clone(),
            updated_at: format_timestamp(c.updated_at),
        }
    }
}

pub fn print_contacts(contacts: &[ContactRow], json: bool) {
    if json {
        let out: Vec<ContactJson> = contacts.iter().map(ContactJson::from).collect();
        print_json(&out);
        return;
    }
    let rows = contacts
        .iter()
        .map(|c| {
            vec![
                c.jid.clone(),
                truncate(c.display_name(), COL_NAME_WIDTH),
                c.phone.clone(),
                c.tags.join(","),
            ]
        })
        .collect::<Vec<_>>();
    print_table(&["JID", "NAME", "PHONE", "TAGS"], &rows);
}

pub fn print_contact(contact: &ContactRow, json: bool) {
    if json {
        print_json(&ContactJson::from(contact));
    } else {
        print_table(
            &["JID", "NAME", "PHONE", "ALIAS", "TAGS", "UPDATED"],
            &[vec![
                contact.jid.clone(),
                contact.display_name().to_string(),
                contact.phone.clone(),
                contact.alias.clone().unwrap_or_default(),
                contact.tags.join(","),
                format_timestamp(contact.updated_at),
            ]],
        );
    }
}

#[derive(Debug, Serialize)]
pub struct GroupJson {
    pub jid: String,
    pub name: String,
    pub owner_jid: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&GroupRow> for GroupJson {
    fn from(g: &GroupRow) -> Self {
        Self {
            jid: g.jid.clone(),
            name: g.name.clone(),
            owner_jid: g.owner_jid.clone(),
            created_at: format_timestamp(g.created_at),
            updated_at: format_timestamp(g.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupParticipantJson {
    pub user_jid: String,
    pub role: String,
}

impl From<&GroupParticipant> for GroupParticipantJson {
    fn from(p: &GroupParticipant) -> Self {
        Self {
            user_jid: p.user_jid.clone(),
            role: p.role.as_str().to_string(),
        }
    }
}

pub fn print_groups(groups: &[GroupRow], json: bool) {
    if json {
        let out: Vec<GroupJson> = groups.iter().map(GroupJson::from).collect();
        print_json(&out);
        return;
    }
    let rows = groups
        .iter()
        .map(|g| {
            vec![
                g.jid.clone(),
                truncate(&g.name, COL_NAME_WIDTH),
                g.owner_jid.clone(),
                format_timestamp(g.updated_at),
            ]
        })
        .collect::<Vec<_>>();
    print_table(&["JID", "NAME", "OWNER", "UPDATED"], &rows);
}

pub fn print_group_info(group: &GroupRow, participants: &[GroupParticipant], json: bool) {
    if json {
        let value = serde_json::json!({
            "group": GroupJson::from(group),
            "participants": participants.iter().map(GroupParticipantJson::from).collect::<Vec<_>>(),
        });
        print_json(&value);
        return;
    }
    print_table(
        &["JID", "NAME", "OWNER", "CREATED", "UPDATED"],
        &[vec![
            group.jid.clone(),
            group.name.clone(),
            group.owner_jid.clone(),
            format_timestamp(group.created_at),
            format_timestamp(group.updated_at),
        ]],
    );
    println!();
    let rows = participants
        .iter()
        .map(|p| vec![p.user_jid.clone(), p.role.as_str().to_string()])
        .collect::<Vec<_>>();
    print_table(&["USER", "ROLE"], &rows);
}

#[derive(Debug, Serialize)]
pub struct MessageJson {
    pub chat_jid: String,
    pub msg_id: String,
    pub sender_jid: String,
    pub sender_name: String,
    pub timestamp: String,
    pub from_me: bool,
    pub text: String,
    pub display_text: String,
    pub media_type: Option<String>,
    pub media_caption: String,
    pub filename: String,
    pub mime_type: String,
    pub file_length: Option<i64>,
    pub local_path: Option<String>,
    pub downloaded_at: Option<String>,
}

impl From<&MessageRow> for MessageJson {
    fn from(m: &MessageRow) -> Self {
        Self {
            chat_jid: m.chat_jid.clone(),
            msg_id: m.msg_id.clone(),
            sender_jid: m.sender_jid.clone(),
            sender_name: m.sender_name.clone(),
            timestamp: format_timestamp(m.timestamp),
            from_me: m.from_me,
            text: m.text.clone(),
            display_text: m.display_text.clone(),
            media_type: m.media_type.as_ref().map(|t| t.as_str().to_string()),
            media_caption: m.media_caption.clone(),
            filename: m.filename.clone(),
            mime_type: m.mime_type.clone(),
            file_length: m.file_length,
            local_path: m.local_path.clone(),
            downloaded_at: m.downloaded_at.map(format_timestamp),
        }
    }
}

pub fn print_messages(messages: &[MessageRow], json: bool) {
    if json {
        let out: Vec<MessageJson> = messages.iter().map(MessageJson::from).collect();
        print_json(&out);
        return;
    }
    let rows = messages
        .iter()
        .map(|m| {
            vec![
                format_timestamp(m.timestamp),
                m.msg_id.clone(),
                truncate(&m.sender_name, COL_NAME_WIDTH),
                truncate(&m.display_text, COL_TEXT_WIDTH),
                m.media_type.as_ref().map(|t| t.as_str()).unwrap_or("-").to_string(),
            ]
        })
        .collect::<Vec<_>>();
    print_table(&["TIMESTAMP", "ID", "SENDER", "TEXT", "MEDIA"], &rows);
}

pub fn print_message(message: &MessageRow, json: bool) {
    if json {
        print_json(&MessageJson::from(message));
    } else {
        print_table(
            &["TIMESTAMP", "ID", "SENDER", "TEXT", "MEDIA"],
            &[vec![
                format_timestamp(message.timestamp),
                message.msg_id.clone(),
                message.sender_name.clone(),
                message.display_text.clone(),
                message.media_type.as_ref().map(|t| t.as_str()).unwrap_or("-").to_string(),
            ]],
        );
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorJson {
    pub store_dir: String,
    pub lock_held: bool,
    pub lock_info: Option<Value>,
    pub authenticated: bool,
    pub connected: bool,
    pub fts_enabled: bool,
}

pub fn print_doctor(report: &wacli_app::DoctorReport, json: bool) {
    if json {
        let lock_info = report.lock_info.as_ref().map(owner_info_json);
        let out = DoctorJson {
            store_dir: report.store_dir.clone(),
            lock_held: report.lock_held,
            lock_info,
            authenticated: report.authenticated,
            connected: report.connected,
            fts_enabled: report.fts_enabled,
        };
        print_json(&out);
        return;
    }

    println!("store_dir     {}", report.store_dir);
    println!("lock_held     {}", report.lock_held);
    if let Some(owner) = &report.lock_info {
        println!("lock_owner    pid {} — {}", owner.pid, owner.command);
    }
    println!("authenticated {}", report.authenticated);
    println!("connected     {}", report.connected);
    println!("fts_enabled   {}", report.fts_enabled);
}

fn owner_info_json(owner: &OwnerInfo) -> Value {
    serde_json::json!({
        "pid": owner.pid,
        "command": owner.command,
        "acquired_at": owner.acquired_at.to_rfc3339(),
    })
}
