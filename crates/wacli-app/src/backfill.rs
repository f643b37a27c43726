//! On-demand backfill loop (spec section 4.4 "Backfill loop", section 9
//! "on-demand history backfill as an RPC over an event bus"): anchors at the
//! oldest known message for a chat, sends correlated history-sync requests,
//! and waits for the matching response via a per-chat pending future.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use wacli_core::error::WacliError;

use crate::app::App;

#[derive(Debug, Clone)]
pub struct BackfillOpts {
    pub chat: String,
    pub count: u32,
    pub requests: u32,
    pub wait_per_request: Duration,
    pub idle_exit: Duration,
    pub connect_timeout: Duration,
}

impl BackfillOpts {
    pub fn new(chat: impl Into<String>) -> Self {
        Self {
            chat: chat.into(),
            count: 50,
            requests: 5,
            wait_per_request: Duration::from_secs(10),
            idle_exit: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillResult {
    pub requests_sent: u32,
    pub messages_added: u64,
    pub reached_end: bool,
}

impl App {
    /// Run up to `opts.requests` request/response hops against the Protocol
    /// Client, anchored at the oldest known message for `opts.chat` (or
    /// "now" if the chat has none yet). Returns with whatever progress was
    /// made if the server signals end-of-history or the overall idle cap
    /// elapses.
    pub async fn backfill_history(
        self: &Arc<Self>,
        opts: BackfillOpts,
    ) -> Result<BackfillResult, WacliError> {
        let proto = self.protocol()?;

        if !proto.is_authed().await? {
            return Err(WacliError::NotAuthenticated);
        }
        proto.connect(false, opts.connect_timeout).await?;

        let mut cursor_ts = match self.store.get_oldest_message_info(&opts.chat).await? {
            Some(info) => info.timestamp,
            None => chrono::Utc::now().timestamp(),
        };

        let messages_added_counter = Arc::new(AtomicU64::new(0));

        let app = self.clone();
        let counter = messages_added_counter.clone();
        let handler_id = proto
            .add_event_handler(Box::new(move |event| {
                let app = app.clone();
                let counter = counter.clone();
                Box::pin(async move {
                    let added = app.handle_event(event, false).await;
                    counter.fetch_add(added, Ordering::Relaxed);
                })
            }))
            .await;

        self.bump_activity().await;

        let mut requests_sent = 0u32;
        let mut reached_end = false;

        for _ in 0..opts.requests {
            let (tx, rx) = oneshot::channel();
            {
                let mut inner = self.inner.lock().await;
                inner.pending_backfill.insert(opts.chat.clone(), tx);
            }

            let blob = proto
                .build_history_sync_request(&opts.chat, cursor_ts, opts.count)
                .await?;
            proto.send_history_sync_request(&blob).await?;
            requests_sent += 1;

            match tokio::time::timeout(opts.wait_per_request, rx).await {
                Ok(Ok(batch)) => {
                    reached_end = batch.reached_end;

                    if let Some(info) = self.store.get_oldest_message_info(&opts.chat).await? {
                        cursor_ts = info.timestamp;
                    }

                    if reached_end {
                        break;
                    }
                }
                Ok(Err(_)) | Err(_) => {
                    let mut inner = self.inner.lock().await;
                    inner.pending_backfill.remove(&opts.chat);
                }
            }

            let idle_for = self.last_activity.lock().await.elapsed();
            if idle_for >= opts.idle_exit {
                tracing::info!(chat = %opts.chat, "backfill idle cap reached");
                break;
            }
        }

        proto.remove_event_handler(handler_id).await;

        Ok(BackfillResult {
            requests_sent,
            messages_added: messages_added_counter.load(Ordering::Relaxed),
            reached_end,
        })
    }
}
