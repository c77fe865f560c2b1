//! The student record, the only entity in the registry.
//!
//! [`Student`] is what the store persists and returns. [`NewStudent`] and
//! [`StudentPatch`] are the loosely-typed inputs an operator submits; they are
//! turned into [`StudentFields`] by [`crate::validate`] before anything is
//! written.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{EnumIter, EnumString};
use uuid::Uuid;

// ─── Sex ─────────────────────────────────────────────────────────────────────

/// A closed enumeration; unlike levels and rooms it is not configurable.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Sex {
  #[strum(serialize = "male", serialize = "m")]
  Male,
  #[strum(serialize = "female", serialize = "f")]
  Female,
  #[strum(serialize = "other", serialize = "o")]
  Other,
}

impl Sex {
  /// Single-letter code stored in the `sex` column.
  pub fn code(self) -> &'static str {
    match self {
      Self::Male => "M",
      Self::Female => "F",
      Self::Other => "O",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Male => "Male",
      Self::Female => "Female",
      Self::Other => "Other",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    match code {
      "M" => Some(Self::Male),
      "F" => Some(Self::Female),
      "O" => Some(Self::Other),
      _ => None,
    }
  }
}

impl fmt::Display for Sex {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

// ─── Photo ───────────────────────────────────────────────────────────────────

/// A student photo stored on disk; no binary data lives in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
  /// Path relative to the configured media root.
  pub path:         String,
  /// SHA-256 hex digest of the file contents.
  pub content_hash: String,
  pub media_type:   String,
}

// ─── Student ─────────────────────────────────────────────────────────────────

/// A persisted student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub id:             Uuid,
  pub student_code:   Option<String>,
  pub student_number: Option<String>,
  pub photo:          Option<PhotoRef>,
  pub first_name:     String,
  pub last_name:      String,
  pub sex:            Sex,
  pub date_of_birth:  NaiveDate,
  /// Code from the level choice set.
  pub level:          String,
  /// Code from the room choice set.
  pub room:           String,
  /// Server-assigned; never changes after creation.
  pub created_at:     DateTime<Utc>,
  /// Refreshed by every mutation, including bulk actions.
  pub updated_at:     DateTime<Utc>,
}

impl Student {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }

  /// Age in whole years on `today`.
  pub fn age_on(&self, today: NaiveDate) -> u32 { age_on(self.date_of_birth, today) }

  /// The validated, mutable part of this record.
  pub fn fields(&self) -> StudentFields {
    StudentFields {
      student_code:   self.student_code.clone(),
      student_number: self.student_number.clone(),
      photo:          self.photo.clone(),
      first_name:     self.first_name.clone(),
      last_name:      self.last_name.clone(),
      sex:            self.sex,
      date_of_birth:  self.date_of_birth,
      level:          self.level.clone(),
      room:           self.room.clone(),
    }
  }
}

impl fmt::Display for Student {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {} - Level {}", self.first_name, self.last_name, self.level)
  }
}

/// Whole years between `date_of_birth` and `today`; zero for future dates.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> u32 {
  let mut years = today.year() - date_of_birth.year();
  if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
    years -= 1;
  }
  years.max(0) as u32
}

/// Every field of a [`Student`] an operator may set, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentFields {
  pub student_code:   Option<String>,
  pub student_number: Option<String>,
  pub photo:          Option<PhotoRef>,
  pub first_name:     String,
  pub last_name:      String,
  pub sex:            Sex,
  pub date_of_birth:  NaiveDate,
  pub level:          String,
  pub room:           String,
}

impl StudentFields {
  /// Attach identity and timestamps to produce a persistable record.
  pub fn into_student(
    self,
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
  ) -> Student {
    Student {
      id,
      student_code: self.student_code,
      student_number: self.student_number,
      photo: self.photo,
      first_name: self.first_name,
      last_name: self.last_name,
      sex: self.sex,
      date_of_birth: self.date_of_birth,
      level: self.level,
      room: self.room,
      created_at,
      updated_at,
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::StudentStore::create`].
///
/// Every field is optional at the type level so that a missing required field
/// is reported as a validation error rather than a decoding failure. Choice
/// fields are raw strings for the same reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewStudent {
  pub student_code:   Option<String>,
  pub student_number: Option<String>,
  pub photo:          Option<PhotoRef>,
  pub first_name:     Option<String>,
  pub last_name:      Option<String>,
  /// `male`, `female`, `other`, or the codes `M`, `F`, `O`.
  pub sex:            Option<String>,
  pub date_of_birth:  Option<NaiveDate>,
  pub level:          Option<String>,
  pub room:           Option<String>,
}

/// Input to [`crate::store::StudentStore::update`].
///
/// `None` leaves a field untouched. The optional fields use a nested `Option`
/// so that `Some(None)` (JSON `null`) clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentPatch {
  #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
  pub student_code:   Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
  pub student_number: Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
  pub photo:          Option<Option<PhotoRef>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub first_name:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_name:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sex:            Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_of_birth:  Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub level:          Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub room:           Option<String>,
}

impl StudentPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// A patch that only replaces (or clears) the photo.
  pub fn photo(photo: Option<PhotoRef>) -> Self {
    Self { photo: Some(photo), ..Self::default() }
  }
}

/// Distinguish an absent key (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  Option::<T>::deserialize(de).map(Some)
}
