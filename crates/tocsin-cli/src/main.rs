//! Tocsin command-line client.
//!
//! # Usage
//!
//! ```bash
//! tocsin --server ws://127.0.0.1:8080 --state ~/.tocsin.redb
//! ```
//!
//! Then type `help` for the command list. Logs go to stderr.

use std::path::PathBuf;

use clap::Parser;
use tocsin_cli::{
    Command, View,
    commands::{HELP, parse},
};
use tocsin_client::{
    RedbStore,
    runtime::{ClientConfig, Runtime},
};
use tocsin_core::SystemEnv;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout},
    sync::mpsc,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Tocsin emergency room client
#[derive(Parser, Debug)]
#[command(name = "tocsin")]
#[command(about = "Line-oriented client for Tocsin emergency rooms")]
#[command(version)]
struct Args {
    /// WebSocket URL of the server
    #[arg(short, long, default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Session database (display name, last room, bookmarks)
    #[arg(long, default_value = "tocsin-session.redb")]
    state: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

async fn print(out: &mut Stdout, text: &str) -> std::io::Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let store = RedbStore::open(&args.state)?;
    tracing::info!("session state at {}", args.state.display());

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let (intent_tx, intent_rx) = mpsc::unbounded_channel();

    let config = ClientConfig { server_url: args.server };
    let runtime = Runtime::start(SystemEnv::new(), store, config, ui_tx)?;
    let runtime = tokio::spawn(runtime.run(intent_rx));

    let mut out = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut view = View::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = parse(&line);
                match command {
                    Command::Quit => break,
                    Command::Help => print(&mut out, HELP).await?,
                    Command::Status => print(&mut out, &view.status()).await?,
                    Command::Bookmarks => print(&mut out, &view.bookmarks()).await?,
                    Command::Unknown { input } => {
                        print(&mut out, &format!("unknown command {input:?}, try help")).await?;
                    },
                    Command::InvalidArgs { command, error } => {
                        print(&mut out, &format!("{command}: {error}")).await?;
                    },
                    command => {
                        if let Some(intent) = command.into_intent() {
                            intent_tx.send(intent)?;
                        }
                    },
                }
            },
            Some(event) = ui_rx.recv() => {
                if let Some(text) = view.apply(event) {
                    print(&mut out, &text).await?;
                }
            },
        }
    }

    drop(intent_tx);
    runtime.await?;
    Ok(())
}
