//! CRM admin API server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `CRM_*`
//! environment variables, opens the SQLite store, and serves the JSON API
//! under `/api/v1`.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash`:
//!
//! ```text
//! cargo run -p crm-server --bin server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use crm_api::{
  ApiConfig, ApiState,
  auth::{AdminUser, AuthConfig},
  events::EventBus,
  storage::LocalStorage,
};
use crm_server::{ServerConfig, mailer::Mailer};
use crm_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "CRM admin API server")]
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
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let mailer = Mailer::from_config(cfg.mail.smtp.as_ref()).context("invalid SMTP settings")?;
  if matches!(mailer, Mailer::Log) {
    tracing::warn!("no [mail.smtp] section; outgoing email will only be logged");
  }

  let events = EventBus::default();
  let _audit = crm_server::spawn_audit(&events);

  let state = ApiState {
    store:   Arc::new(store),
    mailer:  Arc::new(mailer),
    events,
    auth:    Arc::new(AuthConfig {
      username:      cfg.auth_username.clone(),
      password_hash: cfg.auth_password_hash.clone(),
      admin:         AdminUser { id: cfg.admin_id, name: cfg.admin_name.clone() },
    }),
    storage: Arc::new(LocalStorage::new(expand_tilde(&cfg.storage_dir))),
    config:  Arc::new(ApiConfig {
      mail_domain:  cfg.mail.domain.clone(),
      from_address: cfg.mail.from_address.clone(),
      page_size:    cfg.page_size,
    }),
  };

  let app = crm_server::app(state);
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}/api/v1");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
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
