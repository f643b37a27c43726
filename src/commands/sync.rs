//! `sync` (spec section 4.4/4.5): connect, optionally bootstrap
//! contacts/groups, then drain events until idle (default) or forever
//! (`--follow`). Holds the lock for the whole run.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use wacli_app::{App, SyncOpts};
use wacli_core::error::WacliError;
use wacli_lock::Lock;
use wacli_store::Store;

use super::GlobalArgs;
use crate::output;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Run until quiescent for `--idle-exit`, then return. The default;
    /// spelled out for symmetry with `--follow`.
    #[arg(long, conflicts_with = "follow")]
    once: bool,
    /// Keep running and processing events until interrupted, instead of
    /// returning once the stream goes quiet.
    #[arg(long)]
    follow: bool,
    /// Seconds of inbound silence (with no media jobs pending) before a
    /// non-`--follow` run returns. Defaults to the configured `idle_exit`.
    #[arg(long)]
    idle_exit: Option<u64>,
    /// Download media for incoming messages as they arrive.
    #[arg(long)]
    download_media: bool,
    /// Re-fetch the full contact list before draining events.
    #[arg(long)]
    refresh_contacts: bool,
    /// Re-fetch joined groups before draining events.
    #[arg(long)]
    refresh_groups: bool,
}

pub async fn run(globals: &GlobalArgs, args: SyncArgs) -> Result<(), WacliError> {
    let _ = args.once; // mutually exclusive with --follow; quiescent-exit is the default either way
    let _lock = Lock::acquire(&globals.store_dir())?;
    let store = Arc::new(Store::open(&globals.store_dir()).await?);
    let proto = super::open_protocol(globals);

    let app = Arc::new(App::new(
        store,
        Some(proto),
        globals.store_dir(),
        globals.config.sync.media_queue_capacity,
    ));

    let opts = SyncOpts {
        follow: args.follow,
        idle_exit: args
            .idle_exit
            .map(Duration::from_secs)
            .unwrap_or_else(|| globals.config.idle_exit()),
        connect_timeout: globals.timeout(),
        download_media: args.download_media,
        refresh_contacts: args.refresh_contacts,
        refresh_groups: args.refresh_groups,
    };

    let result = app.sync(opts).await?;

    if globals.json {
        output::print_json(&serde_json::json!({ "messages_stored": result.messages_stored }));
    } else {
        println!("stored {} messages", result.messages_stored);
    }
    Ok(())
}
