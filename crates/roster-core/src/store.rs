//! The `StudentStore` trait and the error classification shared by backends.
//!
//! The trait is implemented by storage backends (e.g. `roster-store-sqlite`).
//! Higher layers (`roster-api`, `roster-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  assessment::{Assessment, Questionnaire},
  choices::Catalog,
  query::StudentQuery,
  stats::RosterStats,
  student::{NewStudent, Student, StudentPatch},
  validate::ValidationError,
};

// ─── Error classification ────────────────────────────────────────────────────

/// What kind of failure a backend error represents.
#[derive(Debug)]
pub enum ErrorClass<'a> {
  /// The referenced student does not exist.
  NotFound(Uuid),
  /// The caller's input was rejected; nothing was written.
  Invalid(&'a ValidationError),
  /// Anything else: I/O, corruption, decoding.
  Internal,
}

/// Implemented by backend error types so callers can react to the
/// not-found and validation cases without knowing the backend.
pub trait ClassifyError {
  fn class(&self) -> ErrorClass<'_>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a student record store.
///
/// Every mutation persists immediately. Timestamps are assigned by the store:
/// `created_at` once, `updated_at` on every write, never moving backwards.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait StudentStore: Send + Sync {
  type Error: std::error::Error + ClassifyError + Send + Sync + 'static;

  /// The level and room choice sets records are validated against.
  fn catalog(&self) -> &Catalog;

  // ── Records ───────────────────────────────────────────────────────────

  /// Validate and persist a new student. `created_at == updated_at`.
  fn create(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// Retrieve a student, failing with a not-found error if absent.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// Validate the supplied fields and apply them. `updated_at` is refreshed
  /// even when the patch changes nothing.
  fn update(
    &self,
    id: Uuid,
    patch: StudentPatch,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// Permanently remove a student.
  fn delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove every student and return how many were removed.
  fn clear(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Bulk ──────────────────────────────────────────────────────────────

  /// Set `level` on every listed student that exists and return how many
  /// were updated. Unknown identifiers are skipped without error; the batch
  /// is applied record by record, not atomically.
  fn set_level_for_many<'a>(
    &'a self,
    ids: &'a [Uuid],
    level: &'a str,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Students matching `query`, ordered and paginated as requested.
  fn query<'a>(
    &'a self,
    query: &'a StudentQuery,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + 'a;

  /// Number of students matching `query`'s predicates.
  fn count<'a>(
    &'a self,
    query: &'a StudentQuery,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Per-choice totals and the `recent` newest students.
  fn stats(
    &self,
    recent: usize,
  ) -> impl Future<Output = Result<RosterStats, Self::Error>> + Send + '_;

  // ── Assessments ───────────────────────────────────────────────────────

  /// Score `answers` and keep them with the result. Fails with a validation
  /// error on field `answers` when they do not fit the questionnaire.
  fn record_assessment<'a>(
    &'a self,
    student_id: Uuid,
    questionnaire: Questionnaire,
    answers: &'a [u8],
  ) -> impl Future<Output = Result<Assessment, Self::Error>> + Send + 'a;

  /// Every assessment the student has taken, newest first. Deleting the
  /// student deletes these too.
  fn assessments(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Assessment>, Self::Error>> + Send + '_;
}
