//! One module per command group from spec section 4.5, each owning its own
//! `clap::Subcommand` enum and a `run` entry point.

pub mod chats;
pub mod contacts;
pub mod doctor;
pub mod groups;
pub mod media;
pub mod messages;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use wacli_core::config::Config;
use wacli_core::error::WacliError;
use wacli_protocol::{ProtocolClient, WhatsmeowClient};

/// Resolved global flags, threaded into every command handler instead of
/// re-reading `std::env`/clap matches per subcommand (spec section 4.5 "A
/// top-level `--json` flag and a `--store-dir` / `--timeout` pair are
/// lifted onto a shared struct parsed once in main").
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub json: bool,
    pub config: Config,
}

impl GlobalArgs {
    pub fn store_dir(&self) -> PathBuf {
        self.config.store_dir_path()
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout()
    }
}

/// Build a protocol client over this store directory. Cheap and does not
/// connect — every write/network command still calls `connect_authed`
/// before issuing RPCs.
pub(crate) fn open_protocol(globals: &GlobalArgs) -> Arc<dyn ProtocolClient> {
    Arc::new(WhatsmeowClient::new(&globals.store_dir()))
}

/// Require an existing pairing and establish the session, refusing to show
/// a QR code (only the admin UI pairing flow does that — spec section 7
/// `NotAuthenticated`).
pub(crate) async fn connect_authed(
    proto: &Arc<dyn ProtocolClient>,
    timeout: Duration,
) -> Result<(), WacliError> {
    if !proto.is_authed().await? {
        return Err(WacliError::NotAuthenticated);
    }
    proto.connect(false, timeout).await
}
