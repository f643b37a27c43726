//! Background media worker (spec section 4.4 "Media worker"): drains the
//! bounded job queue, downloads and decrypts via the Protocol Client, and
//! records completion in the Store. Failures are logged and the job is
//! **not** retried (`DESIGN.md` Open Question decision) — a later `sync`
//! re-observes the message (its `local_path`/`downloaded_at` are still
//! null) and re-enqueues it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex};

use wacli_protocol::ProtocolClient;
use wacli_store::Store;

#[derive(Debug, Clone)]
pub(crate) struct MediaJob {
    pub(crate) chat_jid: String,
    pub(crate) msg_id: String,
}

pub(crate) async fn media_worker(
    mut rx: mpsc::Receiver<MediaJob>,
    store: Arc<Store>,
    protocol: Arc<dyn ProtocolClient>,
    media_dir: PathBuf,
    pending_media: Arc<AtomicUsize>,
    last_activity: Arc<Mutex<Instant>>,
) {
    while let Some(job) = rx.recv().await {
        if let Err(e) = download_one(&store, &protocol, &media_dir, &job).await {
            tracing::warn!(
                chat = %job.chat_jid, msg_id = %job.msg_id, error = %e,
                "media download failed, not retrying"
            );
        }
        pending_media.fetch_sub(1, Ordering::SeqCst);
        *last_activity.lock().await = Instant::now();
    }
}

async fn download_one(
    store: &Arc<Store>,
    protocol: &Arc<dyn ProtocolClient>,
    media_dir: &Path,
    job: &MediaJob,
) -> Result<(), wacli_core::error::WacliError> {
    let info = store
        .get_media_download_info(&job.chat_jid, &job.msg_id)
        .await?;

    let now = chrono::Utc::now();
    let target_dir = media_dir
        .join(format!("{:04}", now.format("%Y")))
        .join(format!("{:02}", now.format("%m")));
    std::fs::create_dir_all(&target_dir)?;

    let file_name = if !info.filename.is_empty() {
        info.filename.clone()
    } else if !info.file_sha256.is_empty() {
        hex_encode(&info.file_sha256)
    } else {
        job.msg_id.clone()
    };
    let target_path = target_dir.join(file_name);

    protocol
        .download_media_to_file(
            &info.direct_path,
            &info.file_enc_sha256,
            &info.file_sha256,
            &info.media_key,
            info.file_length,
            info.media_type,
            &info.mime_type,
            &target_path,
        )
        .await?;

    store
        .mark_media_downloaded(
            &job.chat_jid,
            &job.msg_id,
            &target_path.to_string_lossy(),
            now.timestamp(),
        )
        .await?;

    Ok(())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
