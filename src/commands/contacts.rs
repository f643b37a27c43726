//! `contacts search|show|refresh|alias|tags` (spec section 4.5). `refresh`
//! talks to the network and writes the store, so it holds the lock; every
//! other subcommand is a plain store read or write against the local
//! mirror.

use std::sync::Arc;

use clap::Subcommand;

use wacli_app::App;
use wacli_core::error::WacliError;
use wacli_lock::Lock;
use wacli_store::Store;

use super::GlobalArgs;
use crate::output;

#[derive(Debug, Subcommand)]
pub enum ContactsCommand {
    /// Search contacts by name, phone, alias, or jid.
    Search {
        query: String,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Show a single contact by jid.
    Show {
        #[arg(long)]
        jid: String,
    },
    /// Re-fetch the full contact list from WhatsApp.
    Refresh,
    /// Manage a contact's local display alias.
    Alias {
        #[command(subcommand)]
        action: AliasCommand,
    },
    /// Manage a contact's tags.
    Tags {
        #[command(subcommand)]
        action: TagsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum AliasCommand {
    /// Set a local display alias for a contact.
    Set {
        #[arg(long)]
        jid: String,
        #[arg(long)]
        alias: String,
    },
    /// Remove a contact's local alias.
    Rm {
        #[arg(long)]
        jid: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum TagsCommand {
    /// Attach a tag to a contact.
    Add {
        #[arg(long)]
        jid: String,
        #[arg(long)]
        tag: String,
    },
    /// Remove a tag from a contact.
    Rm {
        #[arg(long)]
        jid: String,
        #[arg(long)]
        tag: String,
    },
}

pub async fn run(globals: &GlobalArgs, cmd: ContactsCommand) -> Result<(), WacliError> {
    match cmd {
        ContactsCommand::Search { query, limit } => {
            let store = Store::open_read_only(&globals.store_dir()).await?;
            let contacts = store.search_contacts(&query, limit).await?;
            output::print_contacts(&contacts, globals.json);
        }
        ContactsCommand::Show { jid } => {
            let store = Store::open_read_only(&globals.store_dir()).await?;
            let contact = store.get_contact(&jid).await?;
            output::print_contact(&contact, globals.json);
        }
        ContactsCommand::Refresh => {
            let _lock = Lock::acquire(&globals.store_dir())?;
            let store = Arc::new(Store::open(&globals.store_dir()).await?);
            let proto = super::open_protocol(globals);
            super::connect_authed(&proto, globals.timeout()).await?;

            let app = App::new(store, Some(proto), globals.store_dir(), globals.config.sync.media_queue_capacity);
            let count = app.refresh_contacts().await?;
            if globals.json {
                output::print_json(&serde_json::json!({ "refreshed": count }));
            } else {
                println!("refreshed {count} contacts");
            }
        }
        ContactsCommand::Alias { action } => {
            let _lock = Lock::acquire(&globals.store_dir())?;
            let store = Store::open(&globals.store_dir()).await?;
            match action {
                AliasCommand::Set { jid, alias } => store.set_alias(&jid, &alias).await?,
                AliasCommand::Rm { jid } => store.remove_alias(&jid).await?,
            }
        }
        ContactsCommand::Tags { action } => {
            let _lock = Lock::acquire(&globals.store_dir())?;
            let store = Store::open(&globals.store_dir()).await?;
            match action {
                TagsCommand::Add { jid, tag } => store.add_tag(&jid, &tag).await?,
                TagsCommand::Rm { jid, tag } => store.remove_tag(&jid, &tag).await?,
            }
        }
    }
    Ok(())
}
