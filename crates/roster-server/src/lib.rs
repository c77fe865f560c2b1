//! HTTP server for Roster.
//!
//! Mounts the JSON API behind HTTP Basic auth at `/api`, serves uploaded
//! photos from the media root, and traces every request.

pub mod auth;
pub mod error;
pub mod seed;

pub use error::Error;

use std::{path::{Path, PathBuf}, sync::Arc};

use axum::{Router, middleware};
use roster_api::{ApiState, MediaStore};
use roster_core::{
  choices::{AgeRange, Catalog, ChoiceSet},
  store::StudentStore,
};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

use auth::{AuthConfig, require_auth};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROSTER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub media_root:         PathBuf,
  pub media_url:          String,
  #[serde(default)]
  pub auth_username:      String,
  #[serde(default)]
  pub auth_password_hash: String,
  pub debug:              bool,
  /// Replaces the default `Level 1`..`Level 6` set.
  #[serde(default)]
  pub levels:             Option<ChoiceSet>,
  /// Replaces the default `Room 1`..`Room 6` set.
  #[serde(default)]
  pub rooms:              Option<ChoiceSet>,
  /// Youngest accepted age on the day a date of birth is entered.
  pub min_age:            u32,
  pub max_age:            u32,
}

impl ServerConfig {
  /// Layer defaults, the TOML file at `path` (if present), and the
  /// environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8000_i64)?
      .set_default("store_path", "roster.db")?
      .set_default("media_root", "media")?
      .set_default("media_url", "/media")?
      .set_default("debug", false)?
      .set_default("min_age", 3_i64)?
      .set_default("max_age", 25_i64)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ROSTER"))
      .build()?
      .try_deserialize()
  }

  /// Fails when `min_age` is greater than `max_age`.
  pub fn catalog(&self) -> roster_core::Result<Catalog> {
    let defaults = Catalog::default();
    Ok(Catalog {
      levels: self.levels.clone().unwrap_or(defaults.levels),
      rooms:  self.rooms.clone().unwrap_or(defaults.rooms),
      ages:   AgeRange::new(self.min_age, self.max_age)?,
    })
  }

  /// The path prefix `/media` is served under, if `media_url` is a local
  /// path rather than an external URL.
  fn media_mount(&self) -> Option<&str> {
    let mount = self.media_url.trim_end_matches('/');
    (mount.starts_with('/') && mount.len() > 1).then_some(mount)
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state for the whole server.
pub struct AppState<S> {
  pub api:    ApiState<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      api:    self.api.clone(),
      config: Arc::clone(&self.config),
      auth:   Arc::clone(&self.auth),
    }
  }
}

impl<S: StudentStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Result<Self, Error> {
    let auth = AuthConfig::new(&config.auth_username, &config.auth_password_hash)?;
    let media = MediaStore::new(config.media_root.clone(), config.media_url.clone());
    let api = ApiState::new(Arc::new(store), media);
    api
      .admin
      .check(api.store.catalog())
      .map_err(|e| Error::Config(e.to_string()))?;
    Ok(Self { api, config: Arc::new(config), auth: Arc::new(auth) })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: StudentStore + 'static,
{
  let api = roster_api::api_router(state.api.clone())
    .layer(middleware::from_fn_with_state(state.auth.clone(), require_auth));

  let mut app = Router::new().nest("/api", api);
  if let Some(mount) = state.config.media_mount() {
    app = app.nest_service(mount, ServeDir::new(&state.config.media_root));
  }
  app.layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
