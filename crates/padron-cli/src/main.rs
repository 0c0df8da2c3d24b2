//! `padron`: terminal admin panel for personnel and zones.
//!
//! # Usage
//!
//! ```
//! padron --url http://localhost:8787 --project demo --api-key secret
//! padron --config ~/.config/padron/panel.toml
//! padron --local padron.db
//! ```
//!
//! With `--local` the panel opens the SQLite store directly and signs in
//! against its accounts table; otherwise it talks to `padron-server`.

mod app;
mod client;
mod form;
mod routes;
mod session;
mod ui;

#[cfg(test)]
mod tests;

use std::{
  fs::OpenOptions,
  io,
  path::{Path, PathBuf},
  sync::{Arc, Mutex},
  time::Duration,
};

use anyhow::{Context as _, bail};
use app::App;
use clap::Parser;
use client::{ApiClient, RemoteConfig, RemoteIdentity, RemoteStore};
use crossterm::{
  event::{self, Event, KeyEventKind},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use padron_core::{identity::IdentityProvider, store::DocumentStore};
use padron_gateway::Gateways;
use padron_store_sqlite::{LocalIdentity, SqliteStore};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use session::{AuthState, SessionHolder};
use tokio::sync::watch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "padron", version, about = "Terminal admin panel for Padrón")]
struct Args {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", default_value = "panel.toml")]
  config: PathBuf,

  /// Base URL of padron-server.
  #[arg(long)]
  url: Option<String>,

  /// Project identifier.
  #[arg(long)]
  project: Option<String>,

  /// Project API key.
  #[arg(long)]
  api_key: Option<String>,

  /// Open a local SQLite store instead of connecting to a server.
  #[arg(long, value_name = "DB")]
  local: Option<PathBuf>,

  /// Where to write the log.
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,

  /// How many of the newest personnel records the list fetches.
  #[arg(long)]
  list_window: Option<usize>,
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PanelConfig {
  url:         String,
  #[serde(default)]
  project_id:  String,
  #[serde(default)]
  api_key:     String,
  #[serde(default)]
  local:       Option<PathBuf>,
  log_file:    PathBuf,
  list_window: usize,
}

fn load_config(args: &Args) -> anyhow::Result<PanelConfig> {
  let mut builder = config::Config::builder()
    .set_default("url", "http://127.0.0.1:8787")?
    .set_default("log_file", "padron.log")?
    .set_default("list_window", padron_gateway::personnel::DEFAULT_LIST_WINDOW as u64)?
    .add_source(config::File::from(args.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("PADRON"));

  let path = |p: &Path| p.to_string_lossy().into_owned();
  if let Some(url) = &args.url {
    builder = builder.set_override("url", url.as_str())?;
  }
  if let Some(project) = &args.project {
    builder = builder.set_override("project_id", project.as_str())?;
  }
  if let Some(key) = &args.api_key {
    builder = builder.set_override("api_key", key.as_str())?;
  }
  if let Some(local) = &args.local {
    builder = builder.set_override("local", path(local))?;
  }
  if let Some(log_file) = &args.log_file {
    builder = builder.set_override("log_file", path(log_file))?;
  }
  if let Some(window) = args.list_window {
    builder = builder.set_override("list_window", window as u64)?;
  }

  builder
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise panel config")
}

/// Remote settings, or an error naming whatever is missing.
fn remote_config(cfg: &PanelConfig) -> anyhow::Result<RemoteConfig> {
  if cfg.project_id.trim().is_empty() {
    bail!("missing project id: set project_id in the config file, PADRON_PROJECT_ID or --project");
  }
  if cfg.api_key.trim().is_empty() {
    bail!("missing API key: set api_key in the config file, PADRON_API_KEY or --api-key");
  }
  Ok(RemoteConfig {
    base_url:   cfg.url.clone(),
    project_id: cfg.project_id.clone(),
    api_key:    cfg.api_key.clone(),
  })
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
  let file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("failed to open log file {}", path.display()))?;
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(Mutex::new(file))
    .with_ansi(false)
    .init();
  Ok(())
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let args = Args::parse();
  let cfg = load_config(&args)?;
  init_logging(&cfg.log_file)?;

  match &cfg.local {
    Some(db) => {
      let store = SqliteStore::open(db)
        .await
        .with_context(|| format!("failed to open store at {}", db.display()))?;
      tracing::info!(store = %db.display(), "starting in local mode");
      let identity = LocalIdentity::new(store.clone());
      run(Arc::new(store), Arc::new(identity), cfg.list_window).await
    }
    None => {
      let remote = remote_config(&cfg)?;
      tracing::info!(url = %remote.base_url, project = %remote.project_id, "starting");
      let api = ApiClient::new(remote)?;
      let store = RemoteStore::new(api.clone());
      let identity = RemoteIdentity::new(api);
      run(Arc::new(store), Arc::new(identity), cfg.list_window).await
    }
  }
}

async fn run<S, I>(store: Arc<S>, identity: Arc<I>, list_window: usize) -> anyhow::Result<()>
where
  S: DocumentStore + 'static,
  I: IdentityProvider + 'static,
{
  let gateways = Gateways::new(store, identity.clone()).with_list_window(list_window);
  let holder = SessionHolder::start(identity);
  let mut auth = holder.watch();
  let mut app = App::new(gateways, holder);

  // Put the terminal back before a panic message is printed.
  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    disable_raw_mode().ok();
    execute!(io::stdout(), LeaveAlternateScreen).ok();
    default_hook(info);
  }));

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  let result = run_event_loop(&mut terminal, &mut app, &mut auth).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  app.into_holder().close().await;
  result
}

// ─── Event loop ──────────────────────────────────────────────────────────────

async fn run_event_loop<S, I>(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App<S, I>,
  auth: &mut watch::Receiver<AuthState>,
) -> anyhow::Result<()>
where
  S: DocumentStore + 'static,
  I: IdentityProvider + 'static,
{
  loop {
    if auth.has_changed().unwrap_or(false) {
      let state = auth.borrow_and_update().clone();
      app.on_auth(state);
    }
    while let Some(result) = app.next_result() {
      app.apply(result);
    }

    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && key.kind == KeyEventKind::Press
      && !app.handle_key(key).await
    {
      break;
    }
  }

  Ok(())
}
