//! Error types for `roster-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::validate::ValidationError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("student not found: {0}")]
  NotFound(Uuid),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("invalid configuration: {0}")]
  Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
