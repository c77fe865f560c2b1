//! Handlers for `/students` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/students` | Filters, `ordering`, `limit`, `offset` |
//! | `POST`   | `/students` | Body: [`NewStudent`] without `photo`; 201 |
//! | `GET`    | `/students/{id}` | 404 if not found |
//! | `PATCH`  | `/students/{id}` | Body: [`StudentPatch`]; `photo` may only be `null` |
//! | `DELETE` | `/students/{id}` | 204; also removes the photo file |

use std::str::FromStr as _;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use roster_core::{
  ValidationError,
  query::{StudentQuery, parse_ordering},
  store::StudentStore,
  student::{NewStudent, Sex, Student, StudentPatch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Filters ─────────────────────────────────────────────────────────────────

/// Query-string filters shared by `/students` and `/admin/students`.
///
/// Everything arrives as text and is parsed here so that a malformed value is
/// reported against its parameter name. Blank values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
  pub search:         Option<String>,
  pub level:          Option<String>,
  pub room:           Option<String>,
  pub sex:            Option<String>,
  pub born_after:     Option<String>,
  pub born_before:    Option<String>,
  pub created_after:  Option<String>,
  pub created_before: Option<String>,
  pub updated_after:  Option<String>,
  pub updated_before: Option<String>,
  pub ordering:       Option<String>,
}

impl FilterParams {
  pub fn to_query(&self) -> Result<StudentQuery, ValidationError> {
    let mut err = ValidationError::default();
    let q = self.collect(&mut err);
    err.or_ok(q)
  }

  /// Build a query, recording each malformed parameter in `err`.
  pub fn collect(&self, err: &mut ValidationError) -> StudentQuery {
    let mut q = StudentQuery {
      search: given(&self.search).map(str::to_owned),
      level: given(&self.level).map(str::to_owned),
      room: given(&self.room).map(str::to_owned),
      ..StudentQuery::default()
    };

    q.sex = parse(err, "sex", &self.sex, |s| Sex::from_str(s).ok());
    q.born_after = parse(err, "born_after", &self.born_after, date);
    q.born_before = parse(err, "born_before", &self.born_before, date);
    q.created_after = parse(err, "created_after", &self.created_after, instant);
    q.created_before = parse(err, "created_before", &self.created_before, instant);
    q.updated_after = parse(err, "updated_after", &self.updated_after, instant);
    q.updated_before = parse(err, "updated_before", &self.updated_before, instant);

    if let Some(ordering) = given(&self.ordering) {
      match parse_ordering(ordering) {
        Ok(keys) => q.ordering = keys,
        Err(e) => err.fields.extend(e.fields),
      }
    }
    q
  }
}

fn given(raw: &Option<String>) -> Option<&str> {
  raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Parse an optional parameter, recording a field error when it is present
/// but malformed.
pub(crate) fn parse<T>(
  err: &mut ValidationError,
  name: &str,
  raw: &Option<String>,
  f: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
  let raw = given(raw)?;
  let parsed = f(raw);
  if parsed.is_none() {
    err.push(name, format!("Enter a valid value; {raw:?} was not understood."));
  }
  parsed
}

fn date(s: &str) -> Option<NaiveDate> { NaiveDate::parse_from_str(s, "%Y-%m-%d").ok() }

/// RFC 3339, or a bare date meaning midnight UTC.
fn instant(s: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .ok()
    .or_else(|| date(s).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc()))
}

pub(crate) fn number(s: &str) -> Option<usize> { s.parse().ok() }

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  #[serde(flatten)]
  pub filters: FilterParams,
  pub limit:   Option<String>,
  pub offset:  Option<String>,
}

/// `GET /students[?search=..&level=..&ordering=..&limit=..&offset=..]`
pub async fn list<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Student>>, ApiError> {
  let mut err = ValidationError::default();
  let mut query = params.filters.collect(&mut err);
  query.limit = parse(&mut err, "limit", &params.limit, number);
  query.offset = parse(&mut err, "offset", &params.offset, number);
  let query = err.or_ok(query)?;

  let students = state.store.query(&query).await.map_err(ApiError::store)?;
  Ok(Json(students))
}

/// Photo files are owned by the record they were uploaded for, so a
/// reference can only come from `PUT /students/{id}/photo`.
fn client_photo() -> ValidationError {
  ValidationError::single("photo", "Upload photos with PUT /students/{id}/photo.")
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /students` with a [`NewStudent`] body
pub async fn create<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewStudent>,
) -> Result<impl IntoResponse, ApiError> {
  if body.photo.is_some() {
    return Err(client_photo().into());
  }
  let student = state.store.create(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(student)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /students/{id}`
pub async fn get_one<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError> {
  let student = state.store.get(id).await.map_err(ApiError::store)?;
  Ok(Json(student))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /students/{id}` with a [`StudentPatch`] body
pub async fn update<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<StudentPatch>,
) -> Result<Json<Student>, ApiError> {
  if matches!(patch.photo, Some(Some(_))) {
    return Err(client_photo().into());
  }
  let before = match &patch.photo {
    Some(None) => Some(state.store.get(id).await.map_err(ApiError::store)?),
    _ => None,
  };
  let student = state.store.update(id, patch).await.map_err(ApiError::store)?;

  if let Some(old) = before.and_then(|b| b.photo) {
    crate::photos::discard(&state.media, &old).await;
  }
  Ok(Json(student))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /students/{id}`
pub async fn remove<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let student = state.store.get(id).await.map_err(ApiError::store)?;
  state.store.delete(id).await.map_err(ApiError::store)?;
  if let Some(photo) = &student.photo {
    crate::photos::discard(&state.media, photo).await;
  }
  Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
  use roster_core::query::SortField;

  use super::*;

  #[test]
  fn blank_filters_are_ignored() {
    let params = FilterParams {
      search: Some("  ".into()),
      level: Some(String::new()),
      ..FilterParams::default()
    };
    let q = params.to_query().unwrap();
    assert!(q.search.is_none());
    assert!(q.level.is_none());
  }

  #[test]
  fn filters_parse_into_a_query() {
    let params = FilterParams {
      sex: Some("F".into()),
      born_after: Some("2012-01-01".into()),
      created_before: Some("2024-09-01".into()),
      ordering: Some("-created_at".into()),
      ..FilterParams::default()
    };
    let q = params.to_query().unwrap();
    assert_eq!(q.sex, Some(Sex::Female));
    assert_eq!(q.born_after, NaiveDate::from_ymd_opt(2012, 1, 1));
    assert_eq!(q.created_before.unwrap().to_rfc3339(), "2024-09-01T00:00:00+00:00");
    assert_eq!(q.ordering[0].field, SortField::CreatedAt);
    assert!(q.ordering[0].descending);
  }

  #[test]
  fn every_malformed_filter_is_reported() {
    let params = FilterParams {
      sex: Some("unknown".into()),
      born_before: Some("yesterday".into()),
      ordering: Some("shoe_size".into()),
      ..FilterParams::default()
    };
    let err = params.to_query().unwrap_err();
    for field in ["sex", "born_before", "ordering"] {
      assert!(err.has_field(field), "{field} not reported: {err}");
    }
  }
}
