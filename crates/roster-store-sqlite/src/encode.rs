//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond width so
//! that lexicographic order equals chronological order. Dates are ISO 8601.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound as _, Utc};
use roster_core::{
  assessment::{Assessment, Questionnaire},
  query::{SortField, SortKey},
  student::{PhotoRef, Sex, Student},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store persists.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Sex ─────────────────────────────────────────────────────────────────────

pub fn decode_sex(s: &str) -> Result<Sex> {
  Sex::from_code(s).ok_or_else(|| Error::Corrupt(format!("unknown sex code: {s:?}")))
}

// ─── Photo ───────────────────────────────────────────────────────────────────

pub fn encode_photo(p: &PhotoRef) -> Result<String> { Ok(serde_json::to_string(p)?) }

pub fn decode_photo(s: &str) -> Result<PhotoRef> { Ok(serde_json::from_str(s)?) }

// ─── Ordering ────────────────────────────────────────────────────────────────

/// SQL function registered on every connection: Unicode lower-casing.
pub const FOLD_CASE: &str = "fold_case";

fn sort_column(field: SortField) -> &'static str {
  match field {
    SortField::StudentCode => "student_code",
    SortField::StudentNumber => "student_number",
    SortField::FirstName => "fold_case(first_name)",
    SortField::LastName => "fold_case(last_name)",
    SortField::Sex => "sex",
    SortField::DateOfBirth => "date_of_birth",
    SortField::Level => "level",
    SortField::Room => "room",
    SortField::CreatedAt => "created_at",
    SortField::UpdatedAt => "updated_at",
  }
}

/// An `ORDER BY` clause for `keys`, with insertion order as the final
/// tie-breaker. Column names come from a fixed table, never from input.
pub fn order_by(keys: &[SortKey]) -> String {
  let mut terms: Vec<String> = keys
    .iter()
    .map(|k| {
      let dir = if k.descending { "DESC" } else { "ASC" };
      format!("{} {dir}", sort_column(k.field))
    })
    .collect();
  terms.push("rowid ASC".to_owned());
  format!("ORDER BY {}", terms.join(", "))
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'`
/// pattern, and wrap the result for substring matching.
pub fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawStudent::from_row`].
pub const STUDENT_COLUMNS: &str = "id, student_code, student_number, photo, first_name, \
                                   last_name, sex, date_of_birth, level, room, \
                                   created_at, updated_at";

/// Raw strings read directly from a `students` row.
pub struct RawStudent {
  pub id:             String,
  pub student_code:   Option<String>,
  pub student_number: Option<String>,
  pub photo:          Option<String>,
  pub first_name:     String,
  pub last_name:      String,
  pub sex:            String,
  pub date_of_birth:  String,
  pub level:          String,
  pub room:           String,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawStudent {
  /// Read a row selected with [`STUDENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      student_code:   row.get(1)?,
      student_number: row.get(2)?,
      photo:          row.get(3)?,
      first_name:     row.get(4)?,
      last_name:      row.get(5)?,
      sex:            row.get(6)?,
      date_of_birth:  row.get(7)?,
      level:          row.get(8)?,
      room:           row.get(9)?,
      created_at:     row.get(10)?,
      updated_at:     row.get(11)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      id:             decode_uuid(&self.id)?,
      student_code:   self.student_code,
      student_number: self.student_number,
      photo:          self.photo.as_deref().map(decode_photo).transpose()?,
      first_name:     self.first_name,
      last_name:      self.last_name,
      sex:            decode_sex(&self.sex)?,
      date_of_birth:  decode_date(&self.date_of_birth)?,
      level:          self.level,
      room:           self.room,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawAssessment::from_row`].
pub const ASSESSMENT_COLUMNS: &str = "id, student_id, questionnaire, answers, taken_at";

/// Raw strings read directly from an `assessments` row.
pub struct RawAssessment {
  pub id:            String,
  pub student_id:    String,
  pub questionnaire: String,
  pub answers:       String,
  pub taken_at:      String,
}

impl RawAssessment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      student_id:    row.get(1)?,
      questionnaire: row.get(2)?,
      answers:       row.get(3)?,
      taken_at:      row.get(4)?,
    })
  }

  /// Decode the row and re-score its answers.
  pub fn into_assessment(self) -> Result<Assessment> {
    let questionnaire: Questionnaire = self
      .questionnaire
      .parse()
      .map_err(|_| Error::Corrupt(format!("unknown questionnaire: {:?}", self.questionnaire)))?;
    let answers: Vec<u8> = serde_json::from_str(&self.answers)?;
    let outcome = questionnaire
      .score(&answers)
      .map_err(|e| Error::Corrupt(format!("assessment {}: {e}", self.id)))?;
    Ok(Assessment {
      id: decode_uuid(&self.id)?,
      student_id: decode_uuid(&self.student_id)?,
      questionnaire,
      answers,
      taken_at: decode_dt(&self.taken_at)?,
      outcome,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn timestamps_sort_lexicographically() {
    let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let b = a + chrono::Duration::microseconds(1);
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(encode_dt(a).len(), encode_dt(b).len());
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn like_pattern_escapes_wildcards() {
    assert_eq!(like_pattern("ann"), "%ann%");
    assert_eq!(like_pattern("50%_\\"), "%50\\%\\_\\\\%");
  }

  #[test]
  fn stored_answers_that_no_longer_score_are_corrupt() {
    let raw = |questionnaire: &str, answers: &str| RawAssessment {
      id:            Uuid::nil().to_string(),
      student_id:    Uuid::nil().to_string(),
      questionnaire: questionnaire.into(),
      answers:       answers.into(),
      taken_at:      encode_dt(now()),
    };
    let ok = raw("gardner", &serde_json::to_string(&[3u8; 24]).unwrap());
    assert_eq!(ok.into_assessment().unwrap().questionnaire, Questionnaire::Gardner);

    let short = raw("gardner", "[3, 3]").into_assessment().unwrap_err();
    assert!(matches!(short, Error::Corrupt(_)), "{short}");
    let unknown = raw("enneagram", "[]").into_assessment().unwrap_err();
    assert!(matches!(unknown, Error::Corrupt(_)), "{unknown}");
  }

  #[test]
  fn order_by_always_ends_with_insertion_order() {
    let sql = order_by(&[SortKey::desc(SortField::CreatedAt)]);
    assert_eq!(sql, "ORDER BY created_at DESC, rowid ASC");
  }
}
