use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use trello_sync::config::Config;
use trello_sync::queue::SqliteRequestStore;
use trello_sync::{Entity, TrelloService};

/// How long dispatched requests get to finish before pending work is saved.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "trello-sync")]
#[command(about = "Inspect and edit Trello boards through a synchronized cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/trello-sync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the member owning the token
  Me,
  /// Print a board and its lists
  Board { id: String },
  /// Print a card
  Card { id: String },
  /// Rename a card
  RenameCard { id: String, name: String },
  /// Replay requests left over from earlier runs, then exit
  Flush,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = setup_logging(&state_dir());

  let config = Config::load(args.config.as_deref())?;

  let client = config.client(Config::get_api_token())?;
  let read_only = client.is_read_only();
  if read_only {
    warn!("no token found, starting a read-only session");
  }
  let service = TrelloService::new(Arc::new(client), config.sync_settings(read_only));

  let store = match config.queue_path() {
    Some(path) => Some(SqliteRequestStore::open(&path)?),
    None => None,
  };
  if let Some(store) = &store {
    service.restore_pending(store)?;
  }

  let outcome = tokio::select! {
    result = run(&service, args.command) => result,
    _ = tokio::signal::ctrl_c() => Err(eyre!("interrupted")),
  };

  // Whatever did not reach the server is kept for the next run
  service.hold_requests();
  if tokio::time::timeout(SHUTDOWN_GRACE, service.wait_in_flight())
    .await
    .is_err()
  {
    warn!(
      in_flight = service.handler().in_flight(),
      "requests still running at shutdown were not saved"
    );
  }
  if let Some(store) = &store {
    let saved = service.persist_pending(store)?;
    if saved > 0 {
      eprintln!("{} pending request(s) saved for the next run", saved);
    }
  }

  outcome
}

async fn run(service: &TrelloService, command: Command) -> Result<()> {
  match command {
    Command::Me => {
      let me = service.me().await?;
      println!(
        "{} (@{})",
        me.full_name().await?.unwrap_or_default(),
        me.username().await?.unwrap_or_default()
      );
    }
    Command::Board { id } => {
      let board = service.board(&id);
      let name = board
        .name()
        .await?
        .ok_or_else(|| eyre!("Board {} not found", id))?;
      println!("{}", name);
      if let Some(url) = board.url().await? {
        println!("{}", url);
      }
      for list in board.lists().await? {
        let cards = list.cards().await?;
        println!(
          "  {} [{}] ({} cards)",
          list.name().await?.unwrap_or_default(),
          list.id(),
          cards.len()
        );
      }
    }
    Command::Card { id } => {
      let card = service.card(&id);
      let name = card
        .name()
        .await?
        .ok_or_else(|| eyre!("Card {} not found", id))?;
      println!("{}", name);
      if let Some(list) = card.list().await? {
        println!("  list: {}", list.name().await?.unwrap_or_else(|| list.id().to_string()));
      }
      if let Some(due) = card.due().await? {
        println!("  due: {}", due.format("%Y-%m-%d %H:%M"));
      }
      if card.is_closed().await?.unwrap_or(false) {
        println!("  archived");
      }
      if let Some(description) = card.description().await?.filter(|d| !d.is_empty()) {
        println!();
        println!("{}", description);
      }
    }
    Command::RenameCard { id, name } => {
      let card = service.card(&id);
      card.set_name(&name).await?;
      info!(card = %id, "renamed");
      println!("{}", card.name().await?.unwrap_or_default());
    }
    Command::Flush => {
      let pending = service.queue().len();
      service.wait_idle().await;
      println!("flushed {} request(s)", pending);
    }
  }

  Ok(())
}

fn state_dir() -> PathBuf {
  dirs::data_dir()
    .map(|d| d.join("trello-sync"))
    .unwrap_or_else(|| PathBuf::from(".local/share/trello-sync"))
}

fn setup_logging(log_dir: &Path) -> Option<WorkerGuard> {
  use tracing_subscriber::EnvFilter;

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  // Try to log to a file, fall back to stderr
  if std::fs::create_dir_all(log_dir).is_ok() {
    let appender = tracing_appender::rolling::never(log_dir, "trello-sync.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(writer)
      .with_ansi(false)
      .init();
    Some(guard)
  } else {
    tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(std::io::stderr)
      .init();
    None
  }
}
