//! Query parameters for listing students.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  student::{Sex, Student},
  validate::ValidationError,
};

// ─── Ordering ────────────────────────────────────────────────────────────────

/// Columns a listing can be sorted by.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortField {
  StudentCode,
  StudentNumber,
  FirstName,
  LastName,
  Sex,
  DateOfBirth,
  Level,
  Room,
  CreatedAt,
  UpdatedAt,
}

/// A sort column and direction, written `field` or `-field` for descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
  pub field:      SortField,
  pub descending: bool,
}

impl SortKey {
  pub const fn asc(field: SortField) -> Self { Self { field, descending: false } }

  pub const fn desc(field: SortField) -> Self { Self { field, descending: true } }
}

impl FromStr for SortKey {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    let (descending, name) = match s.strip_prefix('-') {
      Some(rest) => (true, rest),
      None => (false, s),
    };
    let field = SortField::from_str(name).map_err(|_| {
      ValidationError::single("ordering", format!("cannot sort by {name:?}"))
    })?;
    Ok(Self { field, descending })
  }
}

impl fmt::Display for SortKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.descending {
      f.write_str("-")?;
    }
    write!(f, "{}", self.field)
  }
}

/// Listing order when a query names none: surname, then given name.
pub const DEFAULT_ORDERING: [SortKey; 2] =
  [SortKey::asc(SortField::LastName), SortKey::asc(SortField::FirstName)];

/// Parse a comma-separated list such as `level,-created_at`.
pub fn parse_ordering(s: &str) -> Result<Vec<SortKey>, ValidationError> {
  s.split(',')
    .filter(|part| !part.trim().is_empty())
    .map(SortKey::from_str)
    .collect()
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::StudentStore::query`].
///
/// All predicates are combined with AND; date and timestamp ranges are
/// inclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
  /// Case-insensitive substring matched against first or last name.
  pub search:         Option<String>,
  pub level:          Option<String>,
  pub room:           Option<String>,
  pub sex:            Option<Sex>,
  pub born_after:     Option<NaiveDate>,
  pub born_before:    Option<NaiveDate>,
  pub created_after:  Option<DateTime<Utc>>,
  pub created_before: Option<DateTime<Utc>>,
  pub updated_after:  Option<DateTime<Utc>>,
  pub updated_before: Option<DateTime<Utc>>,
  /// Empty means [`DEFAULT_ORDERING`].
  pub ordering:       Vec<SortKey>,
  pub limit:          Option<usize>,
  pub offset:         Option<usize>,
}

impl StudentQuery {
  /// The effective sort keys.
  pub fn ordering(&self) -> &[SortKey] {
    if self.ordering.is_empty() { &DEFAULT_ORDERING } else { &self.ordering }
  }

  /// The search text, if it is not blank.
  pub fn search_text(&self) -> Option<&str> {
    self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
  }

  /// Whether `student` satisfies every predicate. Ordering and pagination
  /// are ignored.
  pub fn matches(&self, student: &Student) -> bool {
    if let Some(text) = self.search_text() {
      let needle = text.to_lowercase();
      if !student.first_name.to_lowercase().contains(&needle)
        && !student.last_name.to_lowercase().contains(&needle)
      {
        return false;
      }
    }
    self.level.as_ref().is_none_or(|l| *l == student.level)
      && self.room.as_ref().is_none_or(|r| *r == student.room)
      && self.sex.is_none_or(|s| s == student.sex)
      && self.born_after.is_none_or(|d| student.date_of_birth >= d)
      && self.born_before.is_none_or(|d| student.date_of_birth <= d)
      && self.created_after.is_none_or(|t| student.created_at >= t)
      && self.created_before.is_none_or(|t| student.created_at <= t)
      && self.updated_after.is_none_or(|t| student.updated_at >= t)
      && self.updated_before.is_none_or(|t| student.updated_at <= t)
  }
}
