//! The `App` orchestrator (spec section 4.4): owns the Store, an optional
//! Protocol Client, the media job queue, and the bookkeeping mutex that is
//! never held across a Protocol Client call or a Store write.
//!
//! Uses independent `Arc<Mutex<_>>` fields rather than one coarse lock over
//! everything, so that no single lock acquisition spans both bookkeeping
//! and an `.await` into the protocol client.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, watch, Mutex};

use wacli_protocol::{Event, HistorySyncBatch, HandlerId, ProtocolClient};
use wacli_store::Store;

use crate::media::{media_worker, MediaJob};

/// Session lifecycle (spec section 4.4 "State machine"). Transitions are
/// driven entirely by Protocol Client events; `Sync` refuses to start from
/// `Idle` unless already authed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Authenticated,
    Connected,
    Disconnected,
    LoggedOut,
}

/// Plain-data bookkeeping behind `App`'s single mutex. Never touched while
/// an `.await` into the Protocol Client or Store is outstanding — every
/// method that needs this data takes the lock, copies/moves what it needs,
/// and drops the guard before the next `.await` (spec section 5 "Lock
/// discipline", section 8 mutex-discipline property).
#[derive(Default)]
pub(crate) struct AppInner {
    pub(crate) handler_ids: Vec<HandlerId>,
    /// Per-chat pending on-demand backfill response, resolved by the
    /// `HistorySync` handler when a correlated reply lands (spec section
    /// 4.4 backfill loop, section 9 "on-demand history backfill as an RPC
    /// over an event bus").
    pub(crate) pending_backfill: HashMap<String, oneshot::Sender<HistorySyncBatch>>,
}

/// The lifecycle orchestrator. One instance per `wacli` process; shared
/// behind an `Arc` between the foreground command, event-handler callbacks,
/// and the media worker task.
pub struct App {
    pub(crate) store: Arc<Store>,
    pub(crate) protocol: Option<Arc<dyn ProtocolClient>>,
    pub(crate) inner: Mutex<AppInner>,
    pub(crate) media_tx: mpsc::Sender<MediaJob>,
    /// Bumped by both inbound protocol events and the media worker's
    /// completion path; gates `sync --once`'s idle-exit check together with
    /// `pending_media` (spec section 4.4, `DESIGN.md` Open Question
    /// decision).
    pub(crate) last_activity: Arc<Mutex<Instant>>,
    pub(crate) pending_media: Arc<AtomicUsize>,
    pub(crate) dropped_media_jobs: Arc<AtomicU64>,
    pub(crate) media_dir: PathBuf,
    pub(crate) state_tx: watch::Sender<SessionState>,
}

impl App {
    /// Build an `App` over `store` and an optional live `protocol` client,
    /// spawning the media worker task. `store_dir` is the root under which
    /// `media/<yyyy>/<mm>/<file>` targets are resolved (spec section 4.4
    /// "Media worker").
    pub fn new(
        store: Arc<Store>,
        protocol: Option<Arc<dyn ProtocolClient>>,
        store_dir: PathBuf,
        media_queue_capacity: usize,
    ) -> Self {
        let (media_tx, media_rx) = mpsc::channel(media_queue_capacity);
        let (state_tx, _state_rx) = watch::channel(SessionState::Idle);

        let media_dir = store_dir.join("media");
        let pending_media = Arc::new(AtomicUsize::new(0));
        let last_activity = Arc::new(Mutex::new(Instant::now()));

        if let Some(proto) = protocol.clone() {
            tokio::spawn(media_worker(
                media_rx,
                store.clone(),
                proto,
                media_dir.clone(),
                pending_media.clone(),
                last_activity.clone(),
            ));
        }

        Self {
            store,
            protocol,
            inner: Mutex::new(AppInner::default()),
            media_tx,
            last_activity,
            pending_media,
            dropped_media_jobs: Arc::new(AtomicU64::new(0)),
            media_dir,
            state_tx,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Number of media jobs dropped because the bounded queue was full
    /// (spec section 5 "Backpressure").
    pub fn dropped_media_jobs(&self) -> u64 {
        self.dropped_media_jobs.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub(crate) fn protocol(&self) -> Result<Arc<dyn ProtocolClient>, wacli_core::error::WacliError> {
        self.protocol
            .clone()
            .ok_or(wacli_core::error::WacliError::NotAuthenticated)
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        let _ = self.state_tx.send(state);
    }

    /// Enqueue a media job for background download. Non-blocking: if the
    /// bounded queue is full the job is dropped and the counter bumped
    /// (spec section 5 "Backpressure" — drop the job, never the message).
    pub(crate) fn enqueue_media_job(&self, job: MediaJob) {
        if self.media_tx.try_send(job).is_err() {
            self.dropped_media_jobs
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            tracing::warn!("media job queue full, dropping job");
        } else {
            self.pending_media
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    pub(crate) async fn bump_activity(&self) {
        *self.last_activity.lock().await = Instant::now();
    }

    /// Translate a fanned-out [`Event`] into Store writes. Registered as the
    /// single event handler for `Sync` (spec section 4.4 "On Message" /
    /// "On HistorySync" / "On Contact" / "On GroupInfo"). Returns the number
    /// of messages upserted, for the `{messages_stored}` tally.
    pub(crate) async fn handle_event(self: &Arc<Self>, event: Event, opts_download_media: bool) -> u64 {
        self.bump_activity().await;

        match event {
            Event::Connected => {
                self.set_state(SessionState::Connected);
                0
            }
            Event::Disconnected => {
                self.set_state(SessionState::Disconnected);
                0
            }
            Event::LoggedOut => {
                self.set_state(SessionState::LoggedOut);
                0
            }
            Event::PairSuccess => {
                self.set_state(SessionState::Authenticated);
                0
            }
            Event::PairingQrCode(_) => 0,
            Event::Message(msg) => {
                if let Err(e) = self.ingest_message(&msg).await {
                    tracing::warn!(chat = %msg.chat_jid, error = %e, "failed to ingest message");
                    return 0;
                }
                if opts_download_media && msg.media_type.is_some() {
                    self.enqueue_media_job(MediaJob {
                        chat_jid: msg.chat_jid.clone(),
                        msg_id: msg.msg_id.clone(),
                    });
                }
                1
            }
            Event::HistorySync(batch) => {
                let on_demand_for = batch.on_demand_for.clone();
                let added = self.ingest_history_batch(&batch, opts_download_media).await;
                if let Some(chat_jid) = on_demand_for {
                    let waiter = {
                        let mut inner = self.inner.lock().await;
                        inner.pending_backfill.remove(&chat_jid)
                    };
                    if let Some(tx) = waiter {
                        let _ = tx.send(batch);
                    }
                }
                tracing::debug!(messages = added, "history sync batch ingested");
                added
            }
            Event::Contact(update) => {
                if let Err(e) = self
                    .store
                    .upsert_contact(
                        &update.jid,
                        "",
                        &update.push_name,
                        &update.full_name,
                        &update.first_name,
                        &update.business_name,
                        update.updated_at,
                    )
                    .await
                {
                    tracing::warn!(jid = %update.jid, error = %e, "failed to upsert contact");
                }
                0
            }
            Event::GroupInfo(update) => {
                if let Some(proto) = self.protocol.clone() {
                    if let Err(e) = self.refresh_single_group(&proto, &update.jid).await {
                        tracing::warn!(jid = %update.jid, error = %e, "failed to refresh group info");
                    }
                }
                0
            }
        }
    }
}
