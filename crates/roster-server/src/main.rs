//! roster server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus `ROSTER_*`
//! environment variables, opens the SQLite store, and serves the JSON API.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash`:
//!
//! ```text
//! cargo run -p roster-server --bin server -- hash-password
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rand_core::OsRng;
use roster_core::store::StudentStore;
use roster_server::{AppState, ServerConfig, seed};
use roster_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Roster student registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
  /// Create random sample students.
  Seed {
    /// Number of students to create.
    #[arg(long, default_value_t = 20)]
    count: usize,
    /// Delete every existing student first.
    #[arg(long)]
    replace: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  let command = cli.command.unwrap_or(Command::Serve);

  // Helper mode: hash a password and exit.
  if let Command::HashPassword = command {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let mut server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  // Initialise tracing.
  let default_level = if server_cfg.debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy(),
    )
    .init();

  // Expand `~` in the store path.
  server_cfg.store_path = expand_tilde(&server_cfg.store_path);
  let store_path = server_cfg.store_path.clone();

  let catalog = server_cfg.catalog().context("invalid choice configuration")?;
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_catalog(catalog);

  match command {
    Command::Seed { count, replace } => {
      let report = seed::seed(&store, count, replace, &mut OsRng, Utc::now().date_naive())
        .await
        .context("failed to seed students")?;
      if report.removed > 0 {
        println!("Deleted {} existing students", report.removed);
      }
      println!("Created {} sample students ({} skipped)", report.created, report.skipped);

      let stats = store.stats(0).await.context("failed to read statistics")?;
      print!("\n{}", seed::summary(&stats));
      Ok(())
    }
    _ => serve(store, server_cfg).await,
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  tokio::fs::create_dir_all(&server_cfg.media_root)
    .await
    .with_context(|| format!("failed to create media root {:?}", server_cfg.media_root))?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(store, server_cfg).context("invalid server configuration")?;
  let app = roster_server::router(state);

  tracing::info!("Listening on http://{address}");
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
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
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
