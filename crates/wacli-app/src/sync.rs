//! Sync loop (spec section 4.4 "Sync loop"): connects, optionally
//! bootstraps contacts/groups, registers a single dispatching event
//! handler, and runs until idle (`once`) or cancellation (`follow`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wacli_core::entities::Jid;
use wacli_core::error::WacliError;
use wacli_protocol::{Event, HistorySyncBatch, IncomingMessage};
use wacli_store::MessageUpsert;

use crate::app::{App, SessionState};
use crate::media::MediaJob;

#[derive(Debug, Clone)]
pub struct SyncOpts {
    /// `false` (default) is "once" mode: run until quiescent for
    /// `idle_exit`, then return. `true` is "follow": run until
    /// cancellation (Ctrl-C).
    pub follow: bool,
    pub idle_exit: Duration,
    pub connect_timeout: Duration,
    pub download_media: bool,
    pub refresh_contacts: bool,
    pub refresh_groups: bool,
}

impl Default for SyncOpts {
    fn default() -> Self {
        Self {
            follow: false,
            idle_exit: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            download_media: false,
            refresh_contacts: false,
            refresh_groups: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub messages_stored: u64,
}

impl App {
    /// Run the sync loop (spec section 4.4). Refuses to start unless
    /// already authenticated — `sync` never shows a pairing QR.
    pub async fn sync(self: &Arc<Self>, opts: SyncOpts) -> Result<SyncResult, WacliError> {
        let proto = self.protocol()?;

        if !proto.is_authed().await? {
            return Err(WacliError::NotAuthenticated);
        }

        self.set_state(SessionState::Connecting);
        proto.connect(false, opts.connect_timeout).await?;
        self.set_state(SessionState::Authenticated);

        if opts.refresh_contacts {
            self.refresh_contacts().await?;
        }
        if opts.refresh_groups {
            self.refresh_groups().await?;
        }

        let messages_stored = Arc::new(AtomicU64::new(0));
        let app = self.clone();
        let counter = messages_stored.clone();
        let download_media = opts.download_media;

        let handler_id = proto
            .add_event_handler(Box::new(move |event| {
                let app = app.clone();
                let counter = counter.clone();
                Box::pin(async move {
                    let added = app.handle_event(event, download_media).await;
                    counter.fetch_add(added, Ordering::Relaxed);
                })
            }))
            .await;

        {
            let mut inner = self.inner.lock().await;
            inner.handler_ids.push(handler_id);
        }

        self.bump_activity().await;

        let run_result = if opts.follow {
            self.run_follow().await
        } else {
            self.run_once(opts.idle_exit).await
        };

        let registered_id = {
            let mut inner = self.inner.lock().await;
            inner.handler_ids.pop()
        };
        if let Some(id) = registered_id {
            proto.remove_event_handler(id).await;
        }

        run_result?;

        Ok(SyncResult {
            messages_stored: messages_stored.load(Ordering::Relaxed),
        })
    }

    async fn run_follow(&self) -> Result<(), WacliError> {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("sync --follow cancelled");
        Ok(())
    }

    async fn run_once(&self, idle_exit: Duration) -> Result<(), WacliError> {
        let poll_interval = Duration::from_millis(200).min(idle_exit);
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("sync --once cancelled");
                    return Ok(());
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }

            let idle_for = self.last_activity.lock().await.elapsed();
            let no_pending_media = self.pending_media.load(Ordering::SeqCst) == 0;
            if idle_for >= idle_exit && no_pending_media {
                tracing::info!(idle_secs = idle_for.as_secs(), "sync --once idle, exiting");
                return Ok(());
            }
        }
    }

    /// Upsert the chat, sender contact, and message for a single inbound or
    /// historical message (spec section 4.4 "On Message", invariants 1-2).
    pub(crate) async fn ingest_message(&self, msg: &IncomingMessage) -> Result<(), WacliError> {
        let kind = Jid::new(msg.chat_jid.clone()).kind();
        self.store
            .upsert_chat(&msg.chat_jid, kind, &msg.chat_name, msg.timestamp)
            .await?;

        if !msg.sender_jid.is_empty() {
            self.store
                .upsert_contact(
                    &msg.sender_jid,
                    "",
                    &msg.sender_name,
                    "",
                    "",
                    "",
                    msg.timestamp,
                )
                .await?;
        }

        let upsert = MessageUpsert {
            chat_jid: msg.chat_jid.clone(),
            msg_id: msg.msg_id.clone(),
            sender_jid: Some(msg.sender_jid.clone()),
            sender_name: Some(msg.sender_name.clone()),
            timestamp: Some(msg.timestamp),
            from_me: Some(msg.from_me),
            text: Some(msg.text.clone()),
            display_text: Some(msg.text.clone()),
            media_type: msg.media_type.clone(),
            media_caption: Some(msg.media_caption.clone()),
            filename: Some(msg.filename.clone()),
            mime_type: Some(msg.mime_type.clone()),
            direct_path: Some(msg.direct_path.clone()),
            media_key: msg.media_key.clone(),
            file_sha256: msg.file_sha256.clone(),
            file_enc_sha256: msg.file_enc_sha256.clone(),
            file_length: msg.file_length,
        };
        self.store.upsert_message(&upsert).await?;
        Ok(())
    }

    /// Ingest every conversation's messages in a history-sync batch,
    /// optionally enqueueing media jobs. Returns the number of messages
    /// successfully upserted (spec section 4.4 "On HistorySync").
    pub(crate) async fn ingest_history_batch(
        self: &Arc<Self>,
        batch: &HistorySyncBatch,
        download_media: bool,
    ) -> u64 {
        let mut count = 0u64;
        for conv in &batch.conversations {
            for msg in &conv.messages {
                match self.ingest_message(msg).await {
                    Ok(()) => {
                        count += 1;
                        if download_media && msg.media_type.is_some() {
                            self.enqueue_media_job(MediaJob {
                                chat_jid: msg.chat_jid.clone(),
                                msg_id: msg.msg_id.clone(),
                            });
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            chat = %msg.chat_jid, msg_id = %msg.msg_id, error = %e,
                            "failed to ingest history message"
                        );
                    }
                }
            }
        }
        count
    }
}
