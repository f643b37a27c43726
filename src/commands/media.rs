//! `media download` (spec section 4.5). Downloads and decrypts a message's
//! media blob the same way the background media worker does
//! (`wacli_app::media::download_one`), but synchronously and on demand.

use clap::Subcommand;

use wacli_core::error::WacliError;
use wacli_lock::Lock;
use wacli_store::Store;

use super::GlobalArgs;
use crate::output;

#[derive(Debug, Subcommand)]
pub enum MediaCommand {
    /// Download and decrypt a message's media blob to the local media
    /// directory (or `--output`, if given).
    Download {
        #[arg(long)]
        chat: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        output: Option<String>,
    },
}

pub async fn run(globals: &GlobalArgs, cmd: MediaCommand) -> Result<(), WacliError> {
    match cmd {
        MediaCommand::Download { chat, id, output } => {
            let _lock = Lock::acquire(&globals.store_dir())?;
            let store = Store::open(&globals.store_dir()).await?;
            let proto = super::open_protocol(globals);
            super::connect_authed(&proto, globals.timeout()).await?;

            let info = store.get_media_download_info(&chat, &id).await?;

            let target_path = match output {
                Some(path) => std::path::PathBuf::from(path),
                None => {
                    let media_dir = globals.store_dir().join("media");
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
                        id.clone()
                    };
                    target_dir.join(file_name)
                }
            };

            proto
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

            let downloaded_at = chrono::Utc::now().timestamp();
            store
                .mark_media_downloaded(&chat, &id, &target_path.to_string_lossy(), downloaded_at)
                .await?;

            if globals.json {
                output::print_json(&serde_json::json!({
                    "chat_jid": chat,
                    "msg_id": id,
                    "local_path": target_path.to_string_lossy(),
                    "downloaded_at": downloaded_at,
                }));
            } else {
                println!("{}", target_path.display());
            }
        }
    }
    Ok(())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
