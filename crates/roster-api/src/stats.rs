//! `GET /stats[?recent=N]`: registry totals for the dashboard.

use axum::{
  Json,
  extract::{Query, State},
};
use roster_core::{stats::RosterStats, store::StudentStore};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct StatsParams {
  #[serde(default = "default_recent")]
  pub recent: usize,
}

fn default_recent() -> usize { 5 }

pub async fn handler<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<StatsParams>,
) -> Result<Json<RosterStats>, ApiError> {
  let stats = state.store.stats(params.recent).await.map_err(ApiError::store)?;
  Ok(Json(stats))
}
