//! `groups list|refresh|info|rename|leave|participants|invite|join` (spec
//! section 4.5). Everything past `list`/`info` writes to the store and/or
//! talks to the network, so it holds the lock for its entire run (spec
//! section 4.2).

use std::sync::Arc;

use clap::Subcommand;

use wacli_app::App;
use wacli_core::entities::{GroupRole, ParticipantAction};
use wacli_core::error::WacliError;
use wacli_lock::Lock;
use wacli_store::{GroupParticipant, Store};

use super::GlobalArgs;
use crate::output;

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List groups, most recently updated first.
    List {
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Re-fetch all joined groups and their participant sets.
    Refresh,
    /// Show a group and its participants from the local mirror.
    Info {
        #[arg(long)]
        jid: String,
    },
    /// Rename a group.
    Rename {
        #[arg(long)]
        jid: String,
        #[arg(long)]
        name: String,
    },
    /// Leave a group.
    Leave {
        #[arg(long)]
        jid: String,
    },
    /// Add, remove, promote, or demote group participants.
    Participants {
        #[command(subcommand)]
        action: ParticipantsCommand,
    },
    /// Fetch or revoke a group's invite link.
    Invite {
        #[command(subcommand)]
        action: InviteCommand,
    },
    /// Join a group via an invite code.
    Join {
        #[arg(long)]
        code: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ParticipantsCommand {
    Add {
        #[arg(long)]
        jid: String,
        #[arg(long = "user", required = true)]
        users: Vec<String>,
    },
    Remove {
        #[arg(long)]
        jid: String,
        #[arg(long = "user", required = true)]
        users: Vec<String>,
    },
    Promote {
        #[arg(long)]
        jid: String,
        #[arg(long = "user", required = true)]
        users: Vec<String>,
    },
    Demote {
        #[arg(long)]
        jid: String,
        #[arg(long = "user", required = true)]
        users: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum InviteCommand {
    /// `groups invite link get|revoke --jid J`.
    Link {
        #[command(subcommand)]
        action: InviteLinkCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum InviteLinkCommand {
    Get {
        #[arg(long)]
        jid: String,
    },
    Revoke {
        #[arg(long)]
        jid: String,
    },
}

pub async fn run(globals: &GlobalArgs, cmd: GroupsCommand) -> Result<(), WacliError> {
    match cmd {
        GroupsCommand::List { query, limit } => {
            let store = Store::open_read_only(&globals.store_dir()).await?;
            let groups = store.list_groups(query.as_deref(), limit).await?;
            output::print_groups(&groups, globals.json);
        }
        GroupsCommand::Info { jid } => {
            let store = Store::open_read_only(&globals.store_dir()).await?;
            let group = store.get_group(&jid).await?;
            let participants = store.get_group_participants(&jid).await?;
            output::print_group_info(&group, &participants, globals.json);
        }
        GroupsCommand::Refresh => {
            let _lock = Lock::acquire(&globals.store_dir())?;
            let store = Arc::new(Store::open(&globals.store_dir()).await?);
            let proto = super::open_protocol(globals);
            super::connect_authed(&proto, globals.timeout()).await?;

            let app = App::new(store, Some(proto), globals.store_dir(), globals.config.sync.media_queue_capacity);
            let count = app.refresh_groups().await?;
            if globals.json {
                output::print_json(&serde_json::json!({ "refreshed": count }));
            } else {
                println!("refreshed {count} groups");
            }
        }
        GroupsCommand::Rename { jid, name } => {
            let _lock = Lock::acquire(&globals.store_dir())?;
            let proto = super::open_protocol(globals);
            super::connect_authed(&proto, globals.timeout()).await?;
            proto.set_group_name(&jid, &name).await?;
            refresh_one_group(globals, &proto, &jid).await?;
        }
        GroupsCommand::Leave { jid } => {
            let _lock = Lock::acquire(&globals.store_dir())?;
            let proto = super::open_protocol(globals);
            super::connect_authed(&proto, globals.timeout()).await?;
            proto.leave_group(&jid).await?;
        }
        GroupsCommand::Participants { action } => {
            let _lock = Lock::acquire(&globals.store_dir())?;
            let proto = super::open_protocol(globals);
            super::connect_authed(&proto, globals.timeout()).await?;

            let (jid, users, participant_action) = match action {
                ParticipantsCommand::Add { jid, users } => (jid, users, ParticipantAction::Add),
                ParticipantsCommand::Remove { jid, users } => (jid, users, ParticipantAction::Remove),
                ParticipantsCommand::Promote { jid, users } => (jid, users, ParticipantAction::Promote),
                ParticipantsCommand::Demote { jid, users } => (jid, users, ParticipantAction::Demote),
            };
            proto.update_group_participants(&jid, &users, participant_action).await?;
            refresh_one_group(globals, &proto, &jid).await?;
        }
        GroupsCommand::Invite { action } => {
            let _lock = Lock::acquire(&globals.store_dir())?;
            let proto = super::open_protocol(globals);
            super::connect_authed(&proto, globals.timeout()).await?;

            let InviteCommand::Link { action } = action;
            let (jid, revoke) = match action {
                InviteLinkCommand::Get { jid } => (jid, false),
                InviteLinkCommand::Revoke { jid } => (jid, true),
            };
            let link = proto.get_group_invite_link(&jid, revoke).await?;
            if globals.json {
                output::print_json(&serde_json::json!({ "jid": jid, "link": link }));
            } else {
                println!("{link}");
            }
        }
        GroupsCommand::Join { code } => {
            let _lock = Lock::acquire(&globals.store_dir())?;
            let proto = super::open_protocol(globals);
            super::connect_authed(&proto, globals.timeout()).await?;
            let jid = proto.join_group_with_link(&code).await?;
            refresh_one_group(globals, &proto, &jid).await?;
            if globals.json {
                output::print_json(&serde_json::json!({ "jid": jid }));
            } else {
                println!("joined {jid}");
            }
        }
    }
    Ok(())
}

/// Re-fetch and persist a single group after a mutating RPC, the way
/// `wacli_app::App`'s `GroupInfo` event handler does for server-pushed
/// changes — these commands trigger the same refresh synchronously instead
/// of waiting for the event to arrive.
async fn refresh_one_group(
    globals: &GlobalArgs,
    proto: &Arc<dyn wacli_protocol::ProtocolClient>,
    jid: &str,
) -> Result<(), WacliError> {
    let store = Store::open(&globals.store_dir()).await?;
    let info = proto.get_group_info(jid).await?;
    let now = chrono::Utc::now().timestamp();

    store
        .upsert_group(&info.jid, &info.name, &info.owner_jid, info.created_at, now)
        .await?;

    let participants: Vec<GroupParticipant> = info
        .participants
        .iter()
        .map(|(user_jid, role): &(String, GroupRole)| GroupParticipant {
            group_jid: info.jid.clone(),
            user_jid: user_jid.clone(),
            role: *role,
            updated_at: now,
        })
        .collect();
    store.replace_group_participants(&info.jid, &participants).await?;

    store
        .upsert_chat(&info.jid, wacli_core::entities::ChatKind::Group, &info.name, now)
        .await?;

    Ok(())
}
