//! `GET /admin/students`: one page of the administrative list view.
//!
//! Accepts the same filters as `GET /students` plus `page` (1-based; out of
//! range pages are clamped). Rows carry only the configured columns, with
//! choice codes rendered as labels.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::Utc;
use roster_core::{
  ValidationError,
  admin::{AdminRow, BulkAction, Column, FilterField, Pagination, SEARCH_FIELDS},
  store::StudentStore,
};
use serde::{Deserialize, Serialize};

use crate::{
  ApiState,
  error::ApiError,
  students::{FilterParams, number, parse},
};

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  #[serde(flatten)]
  pub filters: FilterParams,
  pub page:    Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminPage {
  pub columns:       Vec<Column>,
  pub filters:       Vec<FilterField>,
  pub search_fields: Vec<String>,
  pub actions:       Vec<BulkAction>,
  pub pagination:    Pagination,
  pub rows:          Vec<AdminRow>,
}

pub async fn list<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<PageParams>,
) -> Result<Json<AdminPage>, ApiError> {
  let mut err = ValidationError::default();
  let query = params.filters.collect(&mut err);
  let requested = parse(&mut err, "page", &params.page, number);
  let mut query = err.or_ok(query)?;

  let total = state.store.count(&query).await.map_err(ApiError::store)?;
  let pagination = Pagination::new(total, state.admin.list_per_page, requested);
  query.limit = Some(pagination.per_page);
  query.offset = Some(pagination.offset());

  let students = state.store.query(&query).await.map_err(ApiError::store)?;
  let catalog = state.store.catalog();
  let today = Utc::now().date_naive();
  let rows = students
    .iter()
    .map(|s| state.admin.row(s, catalog, today, |p| state.media.url(p)))
    .collect();

  Ok(Json(AdminPage {
    columns: state.admin.list_display.clone(),
    filters: state.admin.list_filter.clone(),
    search_fields: SEARCH_FIELDS.iter().map(|f| (*f).to_owned()).collect(),
    actions: state.admin.actions.clone(),
    pagination,
    rows,
  }))
}
