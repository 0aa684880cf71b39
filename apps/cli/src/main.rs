mod clipboard;
mod report;
mod storage;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use rolld::RosterSession;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::clipboard::TerminalClipboard;

#[derive(Debug, Parser)]
#[command(name = "rollcall", version)]
#[command(about = "Find who reacted to a message by scrolling its virtualized reaction list")]
struct Cli {
    /// Reaction dialog snapshot to scan (JSON)
    #[arg(long, global = true, default_value = "demos/reactions.json")]
    fixture: PathBuf,

    /// Scan settings (JSON); defaults to the per-user settings file when present
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Switch to this reaction tab (0-based) before scanning
    #[arg(long, global = true)]
    tab: Option<usize>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Look a user up by nickname, handle or numeric id
    Find {
        query: String,
        /// Load the full roster first so the lookup is answered from it
        #[arg(long)]
        preload: bool,
    },
    /// Scroll through the whole list and print every user
    Load {
        /// Copy the roster to the clipboard afterwards
        #[arg(long)]
        copy: bool,
        /// Also write the roster to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the effective scan settings
    Settings,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("ROLLCALL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let settings = storage::load_settings(cli.settings.as_deref())?;

    if let Command::Settings = cli.command {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(ExitCode::SUCCESS);
    }

    let fixture = storage::load_fixture(&cli.fixture)?;
    let built = fixture.build();
    if let Some(tab) = cli.tab {
        ensure!(
            tab < built.tabs.len(),
            "tab {tab} out of range; the dialog has {} tabs",
            built.tabs.len()
        );
        built.select_tab(tab);
    }

    let session = RosterSession::attach(built.host.clone(), &built.root, settings)
        .context("no reaction dialog is open; open a message's reactions first")?;
    info!(fixture = %cli.fixture.display(), "attached to reaction dialog");

    match cli.command {
        Command::Find { query, preload } => {
            if preload {
                report::with_progress(session.subscribe(), session.run_load_all()).await?;
            }
            let result =
                report::with_progress(session.subscribe(), session.run_find(&query)).await?;
            report::print_find(&query, &result, cli.json)?;
            Ok(if result.found {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Load { copy, out } => {
            let result =
                report::with_progress(session.subscribe(), session.run_load_all()).await?;
            report::print_load(&result, cli.json)?;
            if let Some(path) = out {
                storage::persist_roster(&path, &result.list)?;
            }
            if copy {
                let copied = session.run_copy(&TerminalClipboard).await?;
                eprintln!("copied {copied} users");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Settings => Ok(ExitCode::SUCCESS),
    }
}
