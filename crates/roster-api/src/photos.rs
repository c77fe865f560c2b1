//! Handlers for `/students/{id}/photo`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `PUT`    | `/students/{id}/photo?filename=me.png` | Raw image bytes |
//! | `DELETE` | `/students/{id}/photo` | Clears the photo |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use bytes::Bytes;
use roster_core::{
  ValidationError,
  store::StudentStore,
  student::{PhotoRef, Student, StudentPatch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError, media::MediaStore};

#[derive(Debug, Deserialize)]
pub struct UploadParams {
  pub filename: Option<String>,
}

/// `PUT /students/{id}/photo?filename=<name>`
///
/// The extension of `filename` decides the format; the old file, if any, is
/// deleted once the record points at the new one.
pub async fn upload<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<UploadParams>,
  body: Bytes,
) -> Result<Json<Student>, ApiError> {
  let filename = params
    .filename
    .filter(|f| !f.trim().is_empty())
    .ok_or_else(|| ValidationError::single("filename", "This field is required."))?;

  let current = state.store.get(id).await.map_err(ApiError::store)?;
  let photo = state.media.save(&current, &filename, &body).await?;

  let updated = match state.store.update(id, StudentPatch::photo(Some(photo.clone()))).await {
    Ok(s) => s,
    Err(e) => {
      discard(&state.media, &photo).await;
      return Err(ApiError::store(e));
    }
  };

  if let Some(old) = &current.photo {
    discard(&state.media, old).await;
  }
  tracing::info!(%id, path = %photo.path, "replaced student photo");
  Ok(Json(updated))
}

/// `DELETE /students/{id}/photo`
pub async fn remove<S: StudentStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError> {
  let current = state.store.get(id).await.map_err(ApiError::store)?;
  let updated = state
    .store
    .update(id, StudentPatch::photo(None))
    .await
    .map_err(ApiError::store)?;

  if let Some(old) = &current.photo {
    discard(&state.media, old).await;
  }
  Ok(Json(updated))
}

/// Best-effort removal of a file no record refers to any more.
pub(crate) async fn discard(media: &MediaStore, photo: &PhotoRef) {
  if let Err(e) = media.remove(photo).await {
    tracing::warn!(path = %photo.path, error = %e, "could not remove photo file");
  }
}
