//! `chats list` / `chats show` (spec section 4.5). Read-only: opens the
//! store without the writer lock.

use clap::Subcommand;

use wacli_core::error::WacliError;
use wacli_store::Store;

use super::GlobalArgs;
use crate::output;

#[derive(Debug, Subcommand)]
pub enum ChatsCommand {
    /// List chats, most recently active first.
    List {
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Show a single chat by jid.
    Show {
        #[arg(long)]
        jid: String,
    },
}

pub async fn run(globals: &GlobalArgs, cmd: ChatsCommand) -> Result<(), WacliError> {
    let store = Store::open_read_only(&globals.store_dir()).await?;

    match cmd {
        ChatsCommand::List { query, limit } => {
            let chats = store.list_chats(query.as_deref(), limit).await?;
            output::print_chats(&chats, globals.json);
        }
        ChatsCommand::Show { jid } => {
            let chat = store.get_chat(&jid).await?;
            output::print_chat(&chat, globals.json);
        }
    }
    Ok(())
}
