//! Field validation for student inputs.
//!
//! Validation never stops at the first problem: every failing field is
//! collected into one [`ValidationError`] so an operator can fix a form in a
//! single round trip. Uniqueness of `student_code` / `student_number` needs
//! the database and is checked by the store.

use std::{fmt, path::Path, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  choices::{AgeRange, Catalog, ChoiceSet},
  student::{NewStudent, PhotoRef, Sex, StudentFields, StudentPatch, age_on},
};

pub const NAME_MAX_LEN: usize = 50;
pub const CODE_MAX_LEN: usize = 20;
pub const PHOTO_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const PHOTO_MAX_BYTES: usize = 5 * 1024 * 1024;

const REQUIRED: &str = "This field is required.";

// ─── Error ───────────────────────────────────────────────────────────────────

/// A problem with one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

/// One or more rejected input fields. Nothing was persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
  pub fields: Vec<FieldError>,
}

impl ValidationError {
  pub fn single(field: &str, message: impl Into<String>) -> Self {
    let mut err = Self::default();
    err.push(field, message);
    err
  }

  pub fn push(&mut self, field: &str, message: impl Into<String>) {
    self.fields.push(FieldError { field: field.to_owned(), message: message.into() });
  }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }

  pub fn has_field(&self, field: &str) -> bool {
    self.fields.iter().any(|f| f.field == field)
  }

  /// `Ok(value)` when no field failed.
  pub fn or_ok<T>(self, value: T) -> Result<T, Self> {
    if self.is_empty() { Ok(value) } else { Err(self) }
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("validation failed")?;
    for (i, e) in self.fields.iter().enumerate() {
      let sep = if i == 0 { ": " } else { "; " };
      write!(f, "{sep}{}: {}", e.field, e.message)?;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationError {}

// ─── Single-field checks ─────────────────────────────────────────────────────

/// Upper-case the first letter of every word and lower-case the rest. A word
/// starts after anything that is not a letter, so `o'neil-smith` becomes
/// `O'Neil-Smith`.
pub fn title_case(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut in_word = false;
  for c in name.chars() {
    if in_word {
      out.extend(c.to_lowercase());
    } else {
      out.extend(c.to_uppercase());
    }
    in_word = c.is_alphabetic();
  }
  out
}

/// Trimmed, non-empty, bounded, limited to letters, spaces, hyphens and
/// apostrophes, and title-cased.
pub fn check_name(raw: &str) -> Result<String, String> {
  let name = raw.trim();
  if name.is_empty() {
    return Err(REQUIRED.into());
  }
  if name.chars().count() > NAME_MAX_LEN {
    return Err(format!("Ensure this value has at most {NAME_MAX_LEN} characters."));
  }
  if !name
    .chars()
    .all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'')
  {
    return Err("Only letters, spaces, hyphens, and apostrophes are allowed.".into());
  }
  Ok(title_case(name))
}

/// Optional identifier made of ASCII letters and digits. Blank means absent.
pub fn check_code(raw: &str, upper: bool) -> Result<Option<String>, String> {
  let code = raw.trim();
  if code.is_empty() {
    return Ok(None);
  }
  if code.len() > CODE_MAX_LEN {
    return Err(format!("Ensure this value has at most {CODE_MAX_LEN} characters."));
  }
  if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
    return Err("Only letters and numbers are allowed (e.g. STD001).".into());
  }
  Ok(Some(if upper { code.to_ascii_uppercase() } else { code.to_owned() }))
}

pub fn check_sex(raw: &str) -> Result<Sex, String> {
  Sex::from_str(raw.trim())
    .map_err(|_| format!("Select a valid choice. {raw:?} is not one of male, female, other."))
}

pub fn check_choice(raw: &str, set: &ChoiceSet) -> Result<String, String> {
  let code = raw.trim();
  if set.contains(code) {
    Ok(code.to_owned())
  } else {
    Err(format!("Select a valid choice. {raw:?} is not one of the available choices."))
  }
}

/// Not in the future, and old enough and young enough on `today`.
pub fn check_date_of_birth(
  dob: NaiveDate,
  today: NaiveDate,
  ages: AgeRange,
) -> Result<NaiveDate, String> {
  if dob > today {
    return Err("Date of birth cannot be in the future.".into());
  }
  let age = age_on(dob, today);
  if age < ages.min() {
    Err(format!(
      "Student seems too young (under {}). Please verify the date of birth.",
      ages.min()
    ))
  } else if age > ages.max() {
    Err(format!(
      "Student seems too old (over {}). Please verify the date of birth.",
      ages.max()
    ))
  } else {
    Ok(dob)
  }
}

/// The lower-cased extension of `filename` if it is an accepted photo format.
pub fn photo_extension(filename: &str) -> Result<&'static str, String> {
  let ext = Path::new(filename)
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase)
    .unwrap_or_default();
  PHOTO_EXTENSIONS
    .iter()
    .copied()
    .find(|allowed| *allowed == ext)
    .ok_or_else(|| {
      format!(
        "File extension {ext:?} is not allowed. Allowed extensions are: {}.",
        PHOTO_EXTENSIONS.join(", ")
      )
    })
}

/// The media type recorded for an accepted extension.
pub fn photo_media_type(ext: &str) -> &'static str {
  match ext {
    "png" => "image/png",
    _ => "image/jpeg",
  }
}

pub fn check_photo(photo: &PhotoRef) -> Result<(), String> {
  photo_extension(&photo.path).map(|_| ())
}

// ─── Whole-record validation ─────────────────────────────────────────────────

/// Validate a create request against `catalog`, treating `today` as the
/// latest acceptable date of birth.
pub fn validate_new(
  input: NewStudent,
  catalog: &Catalog,
  today: NaiveDate,
) -> Result<StudentFields, ValidationError> {
  let mut err = ValidationError::default();

  let student_code = optional_code(&mut err, "student_code", input.student_code, true);
  let student_number =
    optional_code(&mut err, "student_number", input.student_number, false);

  if let Some(photo) = &input.photo
    && let Err(m) = check_photo(photo)
  {
    err.push("photo", m);
  }

  let first_name = required(&mut err, "first_name", input.first_name, |v| check_name(&v));
  let last_name = required(&mut err, "last_name", input.last_name, |v| check_name(&v));
  let sex = required(&mut err, "sex", input.sex, |v| check_sex(&v));
  let date_of_birth = required(&mut err, "date_of_birth", input.date_of_birth, |d| {
    check_date_of_birth(d, today, catalog.ages)
  });
  let level = required(&mut err, "level", input.level, |v| check_choice(&v, &catalog.levels));
  let room = required(&mut err, "room", input.room, |v| check_choice(&v, &catalog.rooms));

  match (first_name, last_name, sex, date_of_birth, level, room) {
    (Some(first_name), Some(last_name), Some(sex), Some(date_of_birth), Some(level), Some(room))
      if err.is_empty() =>
    {
      Ok(StudentFields {
        student_code,
        student_number,
        photo: input.photo,
        first_name,
        last_name,
        sex,
        date_of_birth,
        level,
        room,
      })
    }
    _ => Err(err),
  }
}

/// Apply `patch` on top of `current`, validating only the supplied fields.
pub fn apply_patch(
  mut current: StudentFields,
  patch: StudentPatch,
  catalog: &Catalog,
  today: NaiveDate,
) -> Result<StudentFields, ValidationError> {
  let mut err = ValidationError::default();

  if let Some(code) = patch.student_code {
    current.student_code = optional_code(&mut err, "student_code", code, true);
  }
  if let Some(number) = patch.student_number {
    current.student_number = optional_code(&mut err, "student_number", number, false);
  }
  if let Some(photo) = patch.photo {
    if let Some(p) = &photo
      && let Err(m) = check_photo(p)
    {
      err.push("photo", m);
    }
    current.photo = photo;
  }
  if let Some(v) = patch.first_name {
    field(&mut err, "first_name", check_name(&v), &mut current.first_name);
  }
  if let Some(v) = patch.last_name {
    field(&mut err, "last_name", check_name(&v), &mut current.last_name);
  }
  if let Some(v) = patch.sex {
    field(&mut err, "sex", check_sex(&v), &mut current.sex);
  }
  if let Some(d) = patch.date_of_birth {
    let checked = check_date_of_birth(d, today, catalog.ages);
    field(&mut err, "date_of_birth", checked, &mut current.date_of_birth);
  }
  if let Some(v) = patch.level {
    field(&mut err, "level", check_choice(&v, &catalog.levels), &mut current.level);
  }
  if let Some(v) = patch.room {
    field(&mut err, "room", check_choice(&v, &catalog.rooms), &mut current.room);
  }

  err.or_ok(current)
}

fn required<T, U>(
  err: &mut ValidationError,
  name: &str,
  value: Option<T>,
  check: impl FnOnce(T) -> Result<U, String>,
) -> Option<U> {
  match value.map(check) {
    None => {
      err.push(name, REQUIRED);
      None
    }
    Some(Err(m)) => {
      err.push(name, m);
      None
    }
    Some(Ok(v)) => Some(v),
  }
}

fn optional_code(
  err: &mut ValidationError,
  name: &str,
  value: Option<String>,
  upper: bool,
) -> Option<String> {
  match value.as_deref().map(|v| check_code(v, upper)) {
    None => None,
    Some(Ok(code)) => code,
    Some(Err(m)) => {
      err.push(name, m);
      None
    }
  }
}

fn field<T>(err: &mut ValidationError, name: &str, checked: Result<T, String>, slot: &mut T) {
  match checked {
    Ok(v) => *slot = v,
    Err(m) => err.push(name, m),
  }
}
