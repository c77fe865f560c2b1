//! JSON REST API for Roster.
//!
//! Exposes an axum [`Router`] backed by any [`roster_core::store::StudentStore`].
//! Auth, TLS, and serving the media directory are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", roster_api::api_router(state.clone()))
//! ```

pub mod actions;
pub mod admin;
pub mod assessments;
pub mod choices;
pub mod error;
pub mod media;
pub mod photos;
pub mod stats;
pub mod students;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use roster_core::{admin::AdminConfig, store::StudentStore, validate::PHOTO_MAX_BYTES};

pub use error::ApiError;
pub use media::MediaStore;

/// Everything a handler needs. Cheap to clone.
pub struct ApiState<S> {
  pub store: Arc<S>,
  pub media: Arc<MediaStore>,
  pub admin: Arc<AdminConfig>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      media: Arc::clone(&self.media),
      admin: Arc::clone(&self.admin),
    }
  }
}

impl<S: StudentStore> ApiState<S> {
  /// State with the default admin configuration for `store`'s catalog.
  pub fn new(store: Arc<S>, media: MediaStore) -> Self {
    let admin = AdminConfig::for_catalog(store.catalog());
    Self { store, media: Arc::new(media), admin: Arc::new(admin) }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: StudentStore + 'static,
{
  Router::new()
    // Students
    .route("/students", get(students::list::<S>).post(students::create::<S>))
    .route("/students/set-level", post(actions::set_level::<S>))
    .route(
      "/students/{id}",
      get(students::get_one::<S>)
        .patch(students::update::<S>)
        .delete(students::remove::<S>),
    )
    .route(
      "/students/{id}/photo",
      // Oversized photos get a JSON 413 from the handler, not a bare rejection.
      put(photos::upload::<S>)
        .layer(DefaultBodyLimit::max(PHOTO_MAX_BYTES + 1024 * 1024))
        .delete(photos::remove::<S>),
    )
    // Assessments
    .route("/students/{id}/assessments", get(assessments::list::<S>))
    .route("/students/{id}/assessments/{questionnaire}", post(assessments::record::<S>))
    .route("/students/{id}/profile", get(assessments::profile::<S>))
    // Reference data
    .route("/choices", get(choices::handler::<S>))
    .route("/questionnaires", get(assessments::catalog))
    .route("/stats", get(stats::handler::<S>))
    // Admin list view
    .route("/admin/students", get(admin::list::<S>))
    .route("/admin/students/actions", get(actions::list::<S>))
    .route("/admin/students/actions/{name}", post(actions::run::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
