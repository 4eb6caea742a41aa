//! aula-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, creates the first superuser if no staff exist yet, and
//! serves the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `admin_password_hash`:
//!
//! ```text
//! cargo run -p aula-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use aula_api::password::hash_password;
use aula_core::{
  staff::{NewStaff, Role},
  store::SchoolStore,
};
use aula_server::{AppState, ServerConfig};
use aula_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "AulaClass grade and attendance server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
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

  if cli.hash_password {
    let password = read_password()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("AULA"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  bootstrap_admin(&store, &server_cfg).await?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState { store: Arc::new(store), config: Arc::new(server_cfg) };
  let app = aula_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Create the configured superuser when the staff table is empty.
async fn bootstrap_admin(store: &SqliteStore, cfg: &ServerConfig) -> anyhow::Result<()> {
  if !store.list_staff().await?.is_empty() {
    return Ok(());
  }
  let Some(password_hash) = cfg.admin_password_hash.clone() else {
    tracing::warn!(
      "no staff accounts exist and admin_password_hash is not set; nobody can log in"
    );
    return Ok(());
  };

  let admin = store
    .add_staff(NewStaff {
      username: cfg.admin_username.clone(),
      full_name: String::new(),
      national_id: None,
      role: Role::Admin,
      is_superuser: true,
      password_hash,
    })
    .await
    .context("failed to create the initial superuser")?;
  tracing::info!(username = %admin.username, "created initial superuser");
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(line.trim_end_matches('\n').trim_end_matches('\r').to_string())
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
