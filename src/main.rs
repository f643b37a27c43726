//! `wacli`: a local-first command-line client over a WhatsApp Web session
//! (spec section 4.5). Parses global flags into a `Config`, dispatches to
//! one command module per group, and maps the result to a process exit
//! code (spec section 6-7).

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use wacli_core::config::Config;
use wacli_core::error::WacliError;

use commands::chats::ChatsCommand;
use commands::contacts::ContactsCommand;
use commands::doctor::DoctorArgs;
use commands::groups::GroupsCommand;
use commands::media::MediaCommand;
use commands::messages::MessagesCommand;
use commands::sync::SyncArgs;
use commands::GlobalArgs;

#[derive(Parser)]
#[command(name = "wacli", version, about = "A local-first WhatsApp command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit machine-readable JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Override the store directory (default: per-OS data dir / `wacli`).
    #[arg(long, global = true, env = "WACLI_STORE_DIR")]
    store_dir: Option<String>,

    /// Override the root timeout, in seconds, for bounded commands.
    #[arg(long, global = true, env = "WACLI_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Path to a TOML config file.
    #[arg(long, global = true, default_value = "wacli.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and drain the event stream into the local store.
    Sync(SyncArgs),
    /// Inspect stored messages.
    Messages {
        #[command(subcommand)]
        action: MessagesCommand,
    },
    /// Inspect chats.
    Chats {
        #[command(subcommand)]
        action: ChatsCommand,
    },
    /// Inspect and manage contacts.
    Contacts {
        #[command(subcommand)]
        action: ContactsCommand,
    },
    /// Inspect and manage groups.
    Groups {
        #[command(subcommand)]
        action: GroupsCommand,
    },
    /// Download message media.
    Media {
        #[command(subcommand)]
        action: MediaCommand,
    },
    /// Run diagnostics.
    Doctor(DoctorArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _guard = init_logging();

    let globals = match build_globals(&cli) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let result = dispatch(&globals, cli.command).await;

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn build_globals(cli: &Cli) -> Result<GlobalArgs, WacliError> {
    let config_path = PathBuf::from(&cli.config);
    let mut config = Config::load(config_path.exists().then_some(config_path.as_path()))?;

    if let Some(dir) = &cli.store_dir {
        config.store_dir = dir.clone();
    }
    if let Some(secs) = cli.timeout {
        config.timeout_secs = secs;
    }

    Ok(GlobalArgs { json: cli.json, config })
}

async fn dispatch(globals: &GlobalArgs, command: Commands) -> Result<(), WacliError> {
    match command {
        Commands::Sync(args) => commands::sync::run(globals, args).await,
        Commands::Messages { action } => commands::messages::run(globals, action).await,
        Commands::Chats { action } => commands::chats::run(globals, action).await,
        Commands::Contacts { action } => commands::contacts::run(globals, action).await,
        Commands::Groups { action } => commands::groups::run(globals, action).await,
        Commands::Media { action } => commands::media::run(globals, action).await,
        Commands::Doctor(args) => commands::doctor::run(globals, args).await,
    }
}

/// stderr + rolling log file under `~/.local/share/wacli/logs` (platform
/// default). Console output stays on stderr so stdout carries only command
/// output.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = dirs::data_dir()
        .map(|d| d.join("wacli").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".wacli/logs"));
    let _ = std::fs::create_dir_all(&log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, "wacli.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .try_init();

    match result {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}
