//! `messages list|search|show|context` (spec section 4.5). Read-only: opens
//! the store without the writer lock.

use clap::Subcommand;

use wacli_core::entities::MediaType;
use wacli_core::error::WacliError;
use wacli_store::{SearchMessagesParams, Store};

use super::GlobalArgs;
use crate::output;

#[derive(Debug, Subcommand)]
pub enum MessagesCommand {
    /// List messages, optionally scoped to one chat and bounded by a
    /// timestamp window.
    List {
        #[arg(long)]
        chat: Option<String>,
        #[arg(long)]
        after: Option<i64>,
        #[arg(long)]
        before: Option<i64>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Full-text (or substring-fallback) search over message content.
    Search {
        query: String,
        #[arg(long)]
        chat: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long = "type")]
        media_type: Option<String>,
        #[arg(long)]
        before: Option<i64>,
        #[arg(long)]
        after: Option<i64>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Show a single message by (chat, id).
    Show {
        #[arg(long)]
        chat: String,
        #[arg(long)]
        id: String,
    },
    /// Show a message with surrounding context.
    Context {
        #[arg(long)]
        chat: String,
        #[arg(long)]
        id: String,
        #[arg(long, default_value_t = 5)]
        before: i64,
        #[arg(long, default_value_t = 5)]
        after: i64,
    },
}

pub async fn run(globals: &GlobalArgs, cmd: MessagesCommand) -> Result<(), WacliError> {
    let store = Store::open_read_only(&globals.store_dir()).await?;

    match cmd {
        MessagesCommand::List { chat, after, before, limit } => {
            let messages = store.list_messages(chat.as_deref(), after, before, limit).await?;
            output::print_messages(&messages, globals.json);
        }
        MessagesCommand::Search { query, chat, from, media_type, before, after, limit } => {
            let params = SearchMessagesParams {
                query,
                chat,
                from,
                media_type: media_type.map(|t| MediaType::parse(&t)),
                before,
                after,
                limit,
            };
            let messages = store.search_messages(&params).await?;
            output::print_messages(&messages, globals.json);
        }
        MessagesCommand::Show { chat, id } => {
            let mut rows = store.get_message_context(&chat, &id, 0, 0).await?;
            let message = rows
                .pop()
                .ok_or_else(|| WacliError::NotFound(format!("message {chat}/{id}")))?;
            output::print_message(&message, globals.json);
        }
        MessagesCommand::Context { chat, id, before, after } => {
            let messages = store.get_message_context(&chat, &id, before, after).await?;
            output::print_messages(&messages, globals.json);
        }
    }
    Ok(())
}
