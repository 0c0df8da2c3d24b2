//! padron-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `PADRON_*`
//! environment variables, opens the SQLite store and serves the JSON API.
//! The account subcommands manage admin users directly in the store file:
//!
//! ```
//! padron-server create-user admin@example.com --name "Admin"
//! padron-server set-password admin@example.com
//! padron-server disable-user admin@example.com
//! ```

use std::{
  io::{self, BufRead as _, Write as _},
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use padron_core::validate::{self, FieldErrors};
use padron_server::{AppState, ServerConfig};
use padron_store_sqlite::{NewAccount, SqliteStore};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Padrón API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Override the configured store path.
  #[arg(long)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the API (the default).
  Serve,
  /// Create an admin account; the password is read from stdin.
  CreateUser {
    email: String,
    #[arg(long)]
    name:  String,
  },
  /// Replace an account's password; read from stdin.
  SetPassword { email: String },
  /// Block an account from signing in. Its tokens stop working too.
  DisableUser { email: String },
  /// Allow a disabled account to sign in again.
  EnableUser { email: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut builder = config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8787)?
    .set_default("store_path", "padron.db")?
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PADRON"));
  if let Some(store) = &cli.store {
    builder = builder.set_override("store_path", store.to_string_lossy().into_owned())?;
  }
  let server_cfg: ServerConfig = builder
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let token_ttl = chrono::Duration::try_hours(server_cfg.token_ttl_hours)
    .context("token_ttl_hours is out of range")?;
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_token_ttl(token_ttl);

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, server_cfg).await,
    Command::CreateUser { email, name } => {
      let password = read_password("Password: ")?;
      let confirm = read_password("Confirm password: ")?;
      let data = validate::string_map([
        ("displayName", name.as_str()),
        ("email", email.as_str()),
        ("password", password.as_str()),
        ("confirmPassword", confirm.as_str()),
      ]);
      validate::REGISTRATION.validate(&data).map_err(report)?;
      let account = store
        .create_account(NewAccount { email, password, display_name: Some(name) })
        .await?;
      println!("created {} ({})", account.email, account.uid);
      Ok(())
    }
    Command::SetPassword { email } => {
      let password = read_password("New password: ")?;
      let confirm = read_password("Confirm password: ")?;
      check_new_password(&password, &confirm)?;
      store.set_password(&email, &password).await?;
      println!("password replaced for {email}");
      Ok(())
    }
    Command::DisableUser { email } => {
      store.set_disabled(&email, true).await?;
      println!("disabled {email}");
      Ok(())
    }
    Command::EnableUser { email } => {
      store.set_disabled(&email, false).await?;
      println!("enabled {email}");
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  if let Err(problem) = server_cfg.validate() {
    bail!("invalid configuration: {problem}");
  }

  let state = AppState {
    store:  Arc::new(store),
    config: Arc::new(server_cfg.clone()),
  };

  let app = padron_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(project = %server_cfg.project_id, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Check a replacement password with the registration rules, ignoring the
/// fields that do not apply.
fn check_new_password(password: &str, confirm: &str) -> anyhow::Result<()> {
  let data = validate::string_map([
    ("password", password),
    ("confirmPassword", confirm),
  ]);
  let errors: FieldErrors = match validate::REGISTRATION.validate(&data) {
    Ok(()) => return Ok(()),
    Err(errors) => errors
      .into_iter()
      .filter(|(field, _)| field == "password" || field == "confirmPassword")
      .collect(),
  };
  if errors.is_empty() { Ok(()) } else { Err(report(errors)) }
}

fn report(errors: FieldErrors) -> anyhow::Error {
  let lines: Vec<String> = errors
    .into_iter()
    .map(|(field, message)| format!("  {field}: {message}"))
    .collect();
  anyhow::anyhow!("invalid input:\n{}", lines.join("\n"))
}

/// Read one line from stdin after printing `prompt`.
fn read_password(prompt: &str) -> anyhow::Result<String> {
  print!("{prompt}");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
