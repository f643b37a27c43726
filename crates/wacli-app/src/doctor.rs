//! Diagnostics (spec section 4.7): lock contention, auth state, optional
//! connectivity probe, and FTS availability. A free function rather than an
//! `App` method — `doctor` must run even when no `App` has been built yet
//! (e.g. the store directory is corrupt).

use std::sync::Arc;

use wacli_core::config::Config;
use wacli_core::error::WacliError;
use wacli_lock::{Lock, OwnerInfo};
use wacli_protocol::ProtocolClient;
use wacli_store::Store;

/// `{store_dir, lock_held, lock_info?, authenticated, connected, fts_enabled}`
/// (spec section 4.7).
#[derive(Debug, Clone)]
pub struct DoctorReport {
    pub store_dir: String,
    pub lock_held: bool,
    pub lock_info: Option<OwnerInfo>,
    pub authenticated: bool,
    pub connected: bool,
    pub fts_enabled: bool,
}

/// Open the store read-only, probe (without holding) the lock, probe auth
/// via the Protocol Client, and optionally connect. `protocol` is `None`
/// when no session has ever been paired.
pub async fn doctor(
    cfg: &Config,
    protocol: Option<Arc<dyn ProtocolClient>>,
    connect: bool,
) -> Result<DoctorReport, WacliError> {
    let store_dir = cfg.store_dir_path();
    let store = Store::open_read_only(&store_dir).await?;

    let (held, owner) = Lock::probe(&store_dir);

    let mut authenticated = false;
    let mut connected = false;

    if let Some(proto) = protocol {
        authenticated = proto.is_authed().await.unwrap_or(false);
        if connect && authenticated {
            connected = proto.connect(false, cfg.timeout()).await.is_ok();
        }
    }

    Ok(DoctorReport {
        store_dir: store_dir.to_string_lossy().into_owned(),
        lock_held: held,
        lock_info: owner,
        authenticated,
        connected,
        fts_enabled: store.has_fts(),
    })
}
