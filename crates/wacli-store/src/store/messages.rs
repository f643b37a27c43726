//! Message upsert and search, branching on FTS availability (spec section
//! 3 invariant 1, section 4.1, section 9).

use super::Store;
use crate::types::{MessageRow, MessageUpsert, SearchMessagesParams};
use wacli_core::entities::MediaType;
use wacli_core::error::WacliError;

impl Store {
    /// Widening upsert: every field only ever replaces an existing value
    /// when the incoming value is present and the existing column is
    /// empty/unset, so a later partial view of a message (e.g. a history
    /// sync echo) can never regress an earlier, richer one.
    pub async fn upsert_message(&self, msg: &MessageUpsert) -> Result<(), WacliError> {
        let media_type = msg.media_type.as_ref().map(|t| t.as_str().to_string());

        sqlx::query(
            "INSERT INTO messages (
                chat_jid, msg_id, sender_jid, sender_name, timestamp, from_me,
                text, display_text, media_type, media_caption, filename, mime_type,
                direct_path, media_key, file_sha256, file_enc_sha256, file_length
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(chat_jid, msg_id) DO UPDATE SET
                sender_jid = CASE WHEN messages.sender_jid != '' THEN messages.sender_jid ELSE excluded.sender_jid END,
                sender_name = CASE WHEN messages.sender_name != '' THEN messages.sender_name ELSE excluded.sender_name END,
                timestamp = CASE WHEN messages.timestamp = 0 THEN excluded.timestamp ELSE messages.timestamp END,
                from_me = CASE WHEN excluded.from_me != 0 THEN excluded.from_me ELSE messages.from_me END,
                text = CASE WHEN messages.text != '' THEN messages.text ELSE excluded.text END,
                display_text = CASE WHEN messages.display_text != '' THEN messages.display_text ELSE excluded.display_text END,
                media_type = CASE WHEN messages.media_type != '' THEN messages.media_type ELSE excluded.media_type END,
                media_caption = CASE WHEN messages.media_caption != '' THEN messages.media_caption ELSE excluded.media_caption END,
                filename = CASE WHEN messages.filename != '' THEN messages.filename ELSE excluded.filename END,
                mime_type = CASE WHEN messages.mime_type != '' THEN messages.mime_type ELSE excluded.mime_type END,
                direct_path = CASE WHEN messages.direct_path != '' THEN messages.direct_path ELSE excluded.direct_path END,
                media_key = CASE WHEN messages.media_key IS NULL THEN excluded.media_key ELSE messages.media_key END,
                file_sha256 = CASE WHEN messages.file_sha256 IS NULL THEN excluded.file_sha256 ELSE messages.file_sha256 END,
                file_enc_sha256 = CASE WHEN messages.file_enc_sha256 IS NULL THEN excluded.file_enc_sha256 ELSE messages.file_enc_sha256 END,
                file_length = CASE WHEN messages.file_length IS NULL THEN excluded.file_length ELSE messages.file_length END",
        )
        .bind(&msg.chat_jid)
        .bind(&msg.msg_id)
        .bind(msg.sender_jid.as_deref().unwrap_or(""))
        .bind(msg.sender_name.as_deref().unwrap_or(""))
        .bind(msg.timestamp.unwrap_or(0))
        .bind(msg.from_me.unwrap_or(false))
        .bind(msg.text.as_deref().unwrap_or(""))
        .bind(msg.display_text.as_deref().unwrap_or(""))
        .bind(media_type.as_deref().unwrap_or(""))
        .bind(msg.media_caption.as_deref().unwrap_or(""))
        .bind(msg.filename.as_deref().unwrap_or(""))
        .bind(msg.mime_type.as_deref().unwrap_or(""))
        .bind(msg.direct_path.as_deref().unwrap_or(""))
        .bind(msg.media_key.as_deref())
        .bind(msg.file_sha256.as_deref())
        .bind(msg.file_enc_sha256.as_deref())
        .bind(msg.file_length)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List messages, optionally scoped to one chat and/or bounded by an
    /// exclusive `(after, before)` timestamp window (spec section 4.5
    /// `messages list`). Ordered newest-first, tie-broken by `msg_id`.
    pub async fn list_messages(
        &self,
        chat_jid: Option<&str>,
        after: Option<i64>,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<MessageRow>, WacliError> {
        let rows: Vec<MessageRowTuple> = sqlx::query_as(
            "SELECT chat_jid, msg_id, sender_jid, sender_name, timestamp, from_me,
                    text, display_text, media_type, media_caption, filename, mime_type,
                    direct_path, media_key, file_sha256, file_enc_sha256, file_length,
                    NULLIF(local_path, ''), downloaded_at
             FROM messages
             WHERE (?1 IS NULL OR chat_jid = ?1)
               AND (?2 IS NULL OR timestamp > ?2)
               AND (?3 IS NULL OR timestamp < ?3)
             ORDER BY timestamp DESC, msg_id ASC LIMIT ?4",
        )
        .bind(chat_jid)
        .bind(after)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Context window around a single message: `before` messages older and
    /// `after` messages newer than the target, inclusive of the target,
    /// ordered chronologically (spec section 4.5 `messages context`).
    pub async fn get_message_context(
        &self,
        chat_jid: &str,
        msg_id: &str,
        before: i64,
        after: i64,
    ) -> Result<Vec<MessageRow>, WacliError> {
        let target: Option<(i64,)> = sqlx::query_as(
            "SELECT timestamp FROM messages WHERE chat_jid = ? AND msg_id = ?",
        )
        .bind(chat_jid)
        .bind(msg_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((ts,)) = target else {
            return Err(WacliError::NotFound(format!("message {chat_jid}/{msg_id}")));
        };

        let older: Vec<MessageRowTuple> = sqlx::query_as(
            "SELECT chat_jid, msg_id, sender_jid, sender_name, timestamp, from_me,
                    text, display_text, media_type, media_caption, filename, mime_type,
                    direct_path, media_key, file_sha256, file_enc_sha256, file_length,
                    NULLIF(local_path, ''), downloaded_at
             FROM messages WHERE chat_jid = ? AND timestamp <= ?
             ORDER BY timestamp DESC, msg_id ASC LIMIT ?",
        )
        .bind(chat_jid)
        .bind(ts)
        .bind(before + 1)
        .fetch_all(&self.pool)
        .await?;

        let newer: Vec<MessageRowTuple> = sqlx::query_as(
            "SELECT chat_jid, msg_id, sender_jid, sender_name, timestamp, from_me,
                    text, display_text, media_type, media_caption, filename, mime_type,
                    direct_path, media_key, file_sha256, file_enc_sha256, file_length,
                    NULLIF(local_path, ''), downloaded_at
             FROM messages WHERE chat_jid = ? AND timestamp > ?
             ORDER BY timestamp ASC, msg_id ASC LIMIT ?",
        )
        .bind(chat_jid)
        .bind(ts)
        .bind(after)
        .fetch_all(&self.pool)
        .await?;

        let mut rows: Vec<MessageRow> = older.into_iter().map(Into::into).collect();
        rows.reverse();
        rows.extend(newer.into_iter().map(MessageRow::from));
        Ok(rows)
    }

    /// Ranked by `bm25()` when FTS is enabled, else by `timestamp DESC`;
    /// tie-break `(timestamp DESC, msg_id ASC)` either way. Empty query is
    /// `InvalidArgument`, not an empty result set (spec invariant 5).
    pub async fn search_messages(
        &self,
        params: &SearchMessagesParams,
    ) -> Result<Vec<MessageRow>, WacliError> {
        if params.query.is_empty() {
            return Err(WacliError::InvalidArgument("query must not be empty".into()));
        }

        if self.has_fts() {
            self.search_messages_fts(params).await
        } else {
            self.search_messages_like(params).await
        }
    }

    async fn search_messages_fts(
        &self,
        params: &SearchMessagesParams,
    ) -> Result<Vec<MessageRow>, WacliError> {
        let media_type = params.media_type.as_ref().map(|t| t.as_str().to_string());

        let rows: Vec<MessageRowTuple> = sqlx::query_as(
            "SELECT m.chat_jid, m.msg_id, m.sender_jid, m.sender_name, m.timestamp, m.from_me,
                    m.text, m.display_text, m.media_type, m.media_caption, m.filename, m.mime_type,
                    m.direct_path, m.media_key, m.file_sha256, m.file_enc_sha256, m.file_length,
                    NULLIF(m.local_path, ''), m.downloaded_at
             FROM messages_fts f
             JOIN messages m ON m.rowid = f.rowid
             WHERE f.messages_fts MATCH ?1
               AND (?2 IS NULL OR m.chat_jid = ?2)
               AND (?3 IS NULL OR m.sender_jid = ?3)
               AND (?4 IS NULL OR m.media_type = ?4)
               AND (?5 IS NULL OR m.timestamp < ?5)
               AND (?6 IS NULL OR m.timestamp > ?6)
             ORDER BY bm25(f), m.timestamp DESC, m.msg_id ASC
             LIMIT ?7",
        )
        .bind(&params.query)
        .bind(params.chat.as_deref())
        .bind(params.from.as_deref())
        .bind(media_type.as_deref())
        .bind(params.before)
        .bind(params.after)
        .bind(params.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn search_messages_like(
        &self,
        params: &SearchMessagesParams,
    ) -> Result<Vec<MessageRow>, WacliError> {
        let pattern = format!("%{}%", params.query.to_lowercase());
        let media_type = params.media_type.as_ref().map(|t| t.as_str().to_string());

        let rows: Vec<MessageRowTuple> = sqlx::query_as(
            "SELECT chat_jid, msg_id, sender_jid, sender_name, timestamp, from_me,
                    text, display_text, media_type, media_caption, filename, mime_type,
                    direct_path, media_key, file_sha256, file_enc_sha256, file_length,
                    NULLIF(local_path, ''), downloaded_at
             FROM messages
             WHERE (LOWER(text) LIKE ?1 OR LOWER(display_text) LIKE ?1
                    OR LOWER(media_caption) LIKE ?1 OR LOWER(filename) LIKE ?1
                    OR LOWER(sender_name) LIKE ?1)
               AND (?2 IS NULL OR chat_jid = ?2)
               AND (?3 IS NULL OR sender_jid = ?3)
               AND (?4 IS NULL OR media_type = ?4)
               AND (?5 IS NULL OR timestamp < ?5)
               AND (?6 IS NULL OR timestamp > ?6)
             ORDER BY timestamp DESC, msg_id ASC
             LIMIT ?7",
        )
        .bind(&pattern)
        .bind(params.chat.as_deref())
        .bind(params.from.as_deref())
        .bind(media_type.as_deref())
        .bind(params.before)
        .bind(params.after)
        .bind(params.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

type MessageRowTuple = (
    String,
    String,
    String,
    String,
    i64,
    bool,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<Vec<u8>>,
    Option<Vec<u8>>,
    Option<Vec<u8>>,
    Option<i64>,
    Option<String>,
    Option<i64>,
);

impl From<MessageRowTuple> for MessageRow {
    fn from(t: MessageRowTuple) -> Self {
        let media_type = if t.8.is_empty() {
            None
        } else {
            Some(MediaType::parse(&t.8))
        };

        MessageRow {
            chat_jid: t.0,
            msg_id: t.1,
            sender_jid: t.2,
            sender_name: t.3,
            timestamp: t.4,
            from_me: t.5,
            text: t.6,
            display_text: t.7,
            media_type,
            media_caption: t.9,
            filename: t.10,
            mime_type: t.11,
            direct_path: t.12,
            media_key: t.13,
            file_sha256: t.14,
            file_enc_sha256: t.15,
            file_length: t.16,
            local_path: t.17,
            downloaded_at: t.18,
        }
    }
}
