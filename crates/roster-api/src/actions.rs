//! Bulk level changes.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/students/set-level` | `{"ids":[..],"level":"2"}` |
//! | `GET`  | `/admin/students/actions` | Declared actions |
//! | `POST` | `/admin/students/actions/{name}` | `{"ids":[..]}` |
//!
//! Identifiers that no longer resolve are skipped; the reply reports how many
//! records were actually changed.

use axum::{
  Json,
  extract::{Path, State},
};
use roster_core::{admin::BulkAction, store::StudentStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Set level ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SetLevelBody {
  #[serde(default)]
  pub ids:   Vec<Uuid>,
  #[serde(default)]
  pub level: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetLevelReply {
  pub updated: usize,
}

/// `POST /students/set-level`
pub async fn set_level<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<SetLevelBody>,
) -> Result<Json<SetLevelReply>, ApiError> {
  let updated = state
    .store
    .set_level_for_many(&body.ids, &body.level)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(SetLevelReply { updated }))
}

// ─── Named actions ───────────────────────────────────────────────────────────

/// `GET /admin/students/actions`
pub async fn list<S: StudentStore>(State(state): State<ApiState<S>>) -> Json<Vec<BulkAction>> {
  Json(state.admin.actions.clone())
}

#[derive(Debug, Deserialize)]
pub struct RunBody {
  #[serde(default)]
  pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunReply {
  pub updated: usize,
  pub message: String,
}

/// `POST /admin/students/actions/{name}`
pub async fn run<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Path(name): Path<String>,
  Json(body): Json<RunBody>,
) -> Result<Json<RunReply>, ApiError> {
  let action = state
    .admin
    .action(&name)
    .ok_or_else(|| ApiError::NotFound(format!("action {name:?} not found")))?;

  let updated = state
    .store
    .set_level_for_many(&body.ids, &action.target_level)
    .await
    .map_err(ApiError::store)?;

  let message = action.message(updated, state.store.catalog());
  tracing::info!(action = %action.name, updated, "ran bulk action");
  Ok(Json(RunReply { updated, message }))
}
