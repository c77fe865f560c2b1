//! Questionnaire endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/questionnaires` | Name, question count and answer scale of each |
//! | `GET`  | `/students/{id}/assessments` | Newest first |
//! | `POST` | `/students/{id}/assessments/{questionnaire}` | Body: `{"answers": [..]}`; 201 |
//! | `GET`  | `/students/{id}/profile` | Latest Holland and intelligence result |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  assessment::{Assessment, Profile, Questionnaire},
  store::StudentStore,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionnaireInfo {
  pub name:      Questionnaire,
  pub questions: usize,
  pub min:       u8,
  pub max:       u8,
}

/// `GET /questionnaires`
pub async fn catalog() -> Json<Vec<QuestionnaireInfo>> {
  Json(
    Questionnaire::iter()
      .map(|q| QuestionnaireInfo {
        name:      q,
        questions: q.question_count(),
        min:       *q.scale().start(),
        max:       *q.scale().end(),
      })
      .collect(),
  )
}

#[derive(Debug, Deserialize)]
pub struct Answers {
  pub answers: Vec<u8>,
}

/// `POST /students/{id}/assessments/{questionnaire}`
pub async fn record<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Path((id, name)): Path<(Uuid, String)>,
  Json(body): Json<Answers>,
) -> Result<impl IntoResponse, ApiError> {
  let questionnaire: Questionnaire = name
    .parse()
    .map_err(|_| ApiError::NotFound(format!("questionnaire {name:?} not found")))?;
  let assessment = state
    .store
    .record_assessment(id, questionnaire, &body.answers)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(assessment)))
}

/// `GET /students/{id}/assessments`
pub async fn list<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Assessment>>, ApiError> {
  let history = state.store.assessments(id).await.map_err(ApiError::store)?;
  Ok(Json(history))
}

/// `GET /students/{id}/profile`
pub async fn profile<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError> {
  let history = state.store.assessments(id).await.map_err(ApiError::store)?;
  Ok(Json(Profile::from_history(history)))
}
