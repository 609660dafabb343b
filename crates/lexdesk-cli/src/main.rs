mod ai_call;
mod cmd_analyze;
mod cmd_docs;
mod cmd_events;
mod cmd_profile;
mod cmd_serve;
mod cmd_tasks;
mod cmd_watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use lexdesk_store::{FileBackend, StateStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lexdesk", version, about = "Legal document desk")]
struct Cli {
    /// Data directory (overrides LEXDESK_HOME)
    #[arg(long, global = true)]
    home: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Overview: user, counters, open tasks and today's events
    Dashboard,
    /// Manage documents
    Docs {
        #[command(subcommand)]
        cmd: cmd_docs::DocsCmd,
    },
    /// Manage tasks
    Tasks {
        #[command(subcommand)]
        cmd: cmd_tasks::TasksCmd,
    },
    /// Manage calendar events
    Events {
        #[command(subcommand)]
        cmd: cmd_events::EventsCmd,
    },
    /// Analyze ad hoc text without saving anything
    Analyze {
        /// Text to analyze (reads --file or stdin when omitted)
        text: Option<String>,
        /// Read the text from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the display name
    Rename {
        /// New name
        name: String,
    },
    /// Discard all data and restore the demo state
    Reset {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
    /// Print state changes made by other processes as they happen
    Watch {
        /// Polling interval in milliseconds
        #[arg(long, default_value = "500")]
        interval_ms: u64,
    },
    /// Start the HTTP server for the AI routes
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(matches!(cli.cmd, Command::Serve { .. }));
    let home = cli.home.unwrap_or_else(lexdesk_store::store_root);

    match cli.cmd {
        Command::Dashboard => cmd_profile::dashboard(&open_store(&home)?),
        Command::Docs { cmd } => cmd_docs::run(cmd, &open_store(&home)?),
        Command::Tasks { cmd } => cmd_tasks::run(cmd, &open_store(&home)?),
        Command::Events { cmd } => cmd_events::run(cmd, &open_store(&home)?),
        Command::Analyze { text, file, json } => {
            cmd_analyze::execute(text.as_deref(), file.as_deref(), json)
        }
        Command::Rename { name } => cmd_profile::rename(&open_store(&home)?, &name),
        Command::Reset { yes } => cmd_profile::reset(&open_store(&home)?, yes),
        Command::Watch { interval_ms } => cmd_watch::execute(&home, interval_ms),
        Command::Serve { bind, port } => cmd_serve::execute(&bind, port),
    }
}

/// Log to stderr, filtered by `RUST_LOG`.
fn init_tracing(serving: bool) {
    let default = if serving { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(home: &Path) -> anyhow::Result<StateStore> {
    let backend = FileBackend::open(home)?;
    Ok(StateStore::new(Arc::new(backend)))
}
