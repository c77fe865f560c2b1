//! Error type for `roster-store-sqlite`.

use roster_core::{
  ValidationError,
  store::{ClassifyError, ErrorClass},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] roster_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value the domain types cannot represent.
  #[error("corrupt row: {0}")]
  Corrupt(String),
}

impl From<ValidationError> for Error {
  fn from(e: ValidationError) -> Self { Self::Core(e.into()) }
}

impl ClassifyError for Error {
  fn class(&self) -> ErrorClass<'_> {
    match self {
      Error::Core(roster_core::Error::NotFound(id)) => ErrorClass::NotFound(*id),
      Error::Core(roster_core::Error::Validation(v)) => ErrorClass::Invalid(v),
      _ => ErrorClass::Internal,
    }
  }
}

pub(crate) fn not_found(id: uuid::Uuid) -> Error {
  Error::Core(roster_core::Error::NotFound(id))
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
