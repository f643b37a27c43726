//! Chat upsert, list, and get (spec section 4.1).

use super::Store;
use crate::types::ChatRow;
use wacli_core::entities::ChatKind;
use wacli_core::error::WacliError;

impl Store {
    /// Insert or update a chat. `name` only overwrites when non-empty;
    /// `last_ts` only ever advances forward (spec invariant 2).
    pub async fn upsert_chat(
        &self,
        jid: &str,
        kind: ChatKind,
        name: &str,
        last_ts: i64,
    ) -> Result<(), WacliError> {
        sqlx::query(
            "INSERT INTO chats (jid, kind, name, last_message_ts) VALUES (?, ?, ?, ?)
             ON CONFLICT(jid) DO UPDATE SET
                kind = excluded.kind,
                name = CASE WHEN excluded.name != '' THEN excluded.name ELSE chats.name END,
                last_message_ts = MAX(chats.last_message_ts, excluded.last_message_ts)",
        )
        .bind(jid)
        .bind(kind.as_str())
        .bind(name)
        .bind(last_ts)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_chat(&self, jid: &str) -> Result<ChatRow, WacliError> {
        let row: Option<(String, String, String, i64)> = sqlx::query_as(
            "SELECT jid, kind, name, last_message_ts FROM chats WHERE jid = ?",
        )
        .bind(jid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(jid, kind, name, last_message_ts)| ChatRow {
            jid,
            kind: ChatKind::parse(&kind),
            name,
            last_message_ts,
        })
        .ok_or_else(|| WacliError::NotFound(format!("chat {jid}")))
    }

    /// Case-insensitive substring match on name or jid, ordered by
    /// `last_message_ts DESC`.
    pub async fn list_chats(
        &self,
        query: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ChatRow>, WacliError> {
        let pattern = query.map(|q| format!("%{}%", q.to_lowercase()));

        let rows: Vec<(String, String, String, i64)> = match pattern {
            Some(p) => {
                sqlx::query_as(
                    "SELECT jid, kind, name, last_message_ts FROM chats
                     WHERE LOWER(name) LIKE ? OR LOWER(jid) LIKE ?
                     ORDER BY last_message_ts DESC LIMIT ?",
                )
                .bind(&p)
                .bind(&p)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT jid, kind, name, last_message_ts FROM chats
                     ORDER BY last_message_ts DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|(jid, kind, name, last_message_ts)| ChatRow {
                jid,
                kind: ChatKind::parse(&kind),
                name,
                last_message_ts,
            })
            .collect())
    }
}
