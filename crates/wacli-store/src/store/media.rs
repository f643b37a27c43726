//! Media download metadata and completion marking (spec section 4.1, 4.3).

use super::Store;
use crate::types::{MediaDownloadInfo, OldestMessageInfo};
use wacli_core::entities::MediaType;
use wacli_core::error::WacliError;

impl Store {
    /// Fetch the opaque decrypt tuple needed to download and decrypt a
    /// message's media blob. `NotFound` if the message doesn't exist or
    /// carries no media.
    pub async fn get_media_download_info(
        &self,
        chat_jid: &str,
        msg_id: &str,
    ) -> Result<MediaDownloadInfo, WacliError> {
        let row: Option<(
            String,
            Option<Vec<u8>>,
            Option<Vec<u8>>,
            Option<Vec<u8>>,
            Option<i64>,
            String,
            String,
            String,
        )> = sqlx::query_as(
            "SELECT direct_path, media_key, file_sha256, file_enc_sha256, file_length,
                    media_type, mime_type, filename
             FROM messages WHERE chat_jid = ? AND msg_id = ?",
        )
        .bind(chat_jid)
        .bind(msg_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((
            direct_path,
            media_key,
            file_sha256,
            file_enc_sha256,
            file_length,
            media_type,
            mime_type,
            filename,
        )) = row
        else {
            return Err(WacliError::NotFound(format!("message {chat_jid}/{msg_id}")));
        };

        let (media_key, file_sha256, file_enc_sha256, file_length) =
            match (media_key, file_sha256, file_enc_sha256, file_length) {
                (Some(k), Some(s), Some(e), Some(l)) => (k, s, e, l),
                _ => {
                    return Err(WacliError::NotFound(format!(
                        "message {chat_jid}/{msg_id} has no media"
                    )))
                }
            };

        Ok(MediaDownloadInfo {
            direct_path,
            media_key,
            file_sha256,
            file_enc_sha256,
            file_length,
            media_type: MediaType::parse(&media_type),
            mime_type,
            filename,
        })
    }

    /// Record the local path of a successfully downloaded media blob.
    pub async fn mark_media_downloaded(
        &self,
        chat_jid: &str,
        msg_id: &str,
        local_path: &str,
        downloaded_at: i64,
    ) -> Result<(), WacliError> {
        sqlx::query(
            "UPDATE messages SET local_path = ?, downloaded_at = ?
             WHERE chat_jid = ? AND msg_id = ?",
        )
        .bind(local_path)
        .bind(downloaded_at)
        .bind(chat_jid)
        .bind(msg_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The oldest message recorded for a chat, used as the backfill cursor
    /// (spec section 4.3 "oldest known message per chat", section 8
    /// scenario 1). Ties broken by `msg_id` so the result is deterministic.
    pub async fn get_oldest_message_info(
        &self,
        chat_jid: &str,
    ) -> Result<Option<OldestMessageInfo>, WacliError> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT msg_id, timestamp FROM messages WHERE chat_jid = ?
             ORDER BY timestamp ASC, msg_id ASC LIMIT 1",
        )
        .bind(chat_jid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(msg_id, timestamp)| OldestMessageInfo { msg_id, timestamp }))
    }
}
