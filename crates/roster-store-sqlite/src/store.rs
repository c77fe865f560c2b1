//! [`SqliteStore`], the SQLite implementation of [`StudentStore`].

use std::{collections::HashSet, path::Path, sync::Arc};

use rusqlite::{OptionalExtension as _, functions::FunctionFlags};
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use roster_core::{
  ValidationError,
  assessment::{Assessment, Questionnaire},
  choices::{Catalog, ChoiceSet},
  query::StudentQuery,
  stats::{ChoiceCount, RosterStats},
  store::StudentStore,
  student::{NewStudent, Sex, Student, StudentPatch},
  validate::{apply_patch, validate_new},
};

use crate::{
  Result,
  encode::{
    ASSESSMENT_COLUMNS, FOLD_CASE, RawAssessment, RawStudent, STUDENT_COLUMNS, encode_date,
    encode_dt, encode_photo, encode_uuid, like_pattern, now, order_by,
  },
  error::{Error, not_found},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A student registry backed by a single SQLite file.
///
/// Clones share one connection and catalog.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  catalog: Arc<Catalog>,
}

/// Column values for an INSERT or UPDATE, already encoded.
struct EncodedStudent {
  id:             String,
  student_code:   Option<String>,
  student_number: Option<String>,
  photo:          Option<String>,
  first_name:     String,
  last_name:      String,
  sex:            &'static str,
  date_of_birth:  String,
  level:          String,
  room:           String,
  created_at:     String,
  updated_at:     String,
}

impl EncodedStudent {
  fn new(s: &Student) -> Result<Self> {
    Ok(Self {
      id:             encode_uuid(s.id),
      student_code:   s.student_code.clone(),
      student_number: s.student_number.clone(),
      photo:          s.photo.as_ref().map(encode_photo).transpose()?,
      first_name:     s.first_name.clone(),
      last_name:      s.last_name.clone(),
      sex:            s.sex.code(),
      date_of_birth:  encode_date(s.date_of_birth),
      level:          s.level.clone(),
      room:           s.room.clone(),
      created_at:     encode_dt(s.created_at),
      updated_at:     encode_dt(s.updated_at),
    })
  }
}

enum Write {
  Insert,
  Update,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, catalog: Arc::new(Catalog::default()) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, catalog: Arc::new(Catalog::default()) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Validate levels and rooms against `catalog` instead of the default
  /// `1..=6` sets.
  pub fn with_catalog(mut self, catalog: Catalog) -> Self {
    self.catalog = Arc::new(catalog);
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        register_functions(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch(&self, id: Uuid) -> Result<Option<Student>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
              rusqlite::params![id_str],
              RawStudent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  /// Insert or overwrite `student`, refusing codes already held by another
  /// record. The uniqueness check and the write share one transaction.
  ///
  /// Returns the row as stored, or `None` if an update found no row.
  async fn write(&self, student: &Student, mode: Write) -> Result<Option<Student>> {
    let row = EncodedStudent::new(student)?;

    let (conflicts, raw): (Vec<&'static str>, Option<RawStudent>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let mut conflicts = Vec::new();
        for (column, value) in [
          ("student_code", &row.student_code),
          ("student_number", &row.student_number),
        ] {
          let Some(value) = value else { continue };
          let taken = tx
            .query_row(
              &format!("SELECT 1 FROM students WHERE {column} = ?1 AND id <> ?2"),
              rusqlite::params![value, row.id],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          if taken {
            conflicts.push(column);
          }
        }
        if !conflicts.is_empty() {
          return Ok((conflicts, None));
        }

        let params = rusqlite::params![
          row.id,
          row.student_code,
          row.student_number,
          row.photo,
          row.first_name,
          row.last_name,
          row.sex,
          row.date_of_birth,
          row.level,
          row.room,
          row.created_at,
          row.updated_at,
        ];
        let sql = match mode {
          Write::Insert => format!(
            "INSERT INTO students ({STUDENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             RETURNING {STUDENT_COLUMNS}"
          ),
          // created_at (?11) is bound but never overwritten.
          Write::Update => format!(
            "UPDATE students SET
               student_code = ?2, student_number = ?3, photo = ?4,
               first_name = ?5, last_name = ?6, sex = ?7, date_of_birth = ?8,
               level = ?9, room = ?10,
               updated_at = MAX(updated_at, ?12)
             WHERE id = ?1
             RETURNING {STUDENT_COLUMNS}"
          ),
        };
        let raw = tx.query_row(&sql, params, RawStudent::from_row).optional()?;
        tx.commit()?;
        Ok((conflicts, raw))
      })
      .await?;

    if !conflicts.is_empty() {
      let mut err = ValidationError::default();
      for field in conflicts {
        err.push(field, "This value is already in use by another student.");
      }
      return Err(err.into());
    }

    raw.map(RawStudent::into_student).transpose()
  }

  async fn select(&self, query: &StudentQuery) -> Result<Vec<Student>> {
    let (where_sql, params) = where_clause(query);
    let order_sql = order_by(query.ordering());
    let page_sql = match (query.limit, query.offset) {
      (None, None) => String::new(),
      (limit, offset) => format!(
        "LIMIT {} OFFSET {}",
        limit.map_or(-1, |l| l as i64),
        offset.unwrap_or(0)
      ),
    };
    let sql = format!("SELECT {STUDENT_COLUMNS} FROM students {where_sql} {order_sql} {page_sql}");

    let raws: Vec<RawStudent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawStudent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStudent::into_student).collect()
  }

  /// Rows in the `assessments` table, whoever they belong to.
  #[cfg(test)]
  pub(crate) async fn assessment_rows(&self) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM assessments", [], |r| r.get(0))?))
      .await?;
    Ok(n as usize)
  }
}

/// SQLite's own `lower()` and `LIKE` fold ASCII only; names are searched and
/// sorted through [`FOLD_CASE`] instead, which lower-cases any script the
/// same way [`StudentQuery::matches`] does.
fn register_functions(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    FOLD_CASE,
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| {
      let text: Option<String> = ctx.get(0)?;
      Ok(text.map(|t| t.to_lowercase()))
    },
  )
}

/// A `WHERE` clause for the predicates of `query` and its positional
/// parameters. Empty when the query has no predicates.
fn where_clause(query: &StudentQuery) -> (String, Vec<String>) {
  let mut conds: Vec<&'static str> = vec![];
  let mut params: Vec<String> = vec![];

  if let Some(text) = query.search_text() {
    let pattern = like_pattern(&text.to_lowercase());
    conds.push(
      "(fold_case(first_name) LIKE ? ESCAPE '\\' OR fold_case(last_name) LIKE ? ESCAPE '\\')",
    );
    params.push(pattern.clone());
    params.push(pattern);
  }
  if let Some(level) = &query.level {
    conds.push("level = ?");
    params.push(level.clone());
  }
  if let Some(room) = &query.room {
    conds.push("room = ?");
    params.push(room.clone());
  }
  if let Some(sex) = query.sex {
    conds.push("sex = ?");
    params.push(sex.code().to_owned());
  }
  let dates = [
    ("date_of_birth >= ?", query.born_after.map(encode_date)),
    ("date_of_birth <= ?", query.born_before.map(encode_date)),
    ("created_at >= ?", query.created_after.map(encode_dt)),
    ("created_at <= ?", query.created_before.map(encode_dt)),
    ("updated_at >= ?", query.updated_after.map(encode_dt)),
    ("updated_at <= ?", query.updated_before.map(encode_dt)),
  ];
  for (cond, value) in dates {
    if let Some(value) = value {
      conds.push(cond);
      params.push(value);
    }
  }

  let sql = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (sql, params)
}

/// One [`ChoiceCount`] per configured choice, in configuration order, followed
/// by any stored codes the configuration no longer lists.
fn choice_counts(set: &ChoiceSet, counts: Vec<(String, i64)>) -> Vec<ChoiceCount> {
  let mut out: Vec<ChoiceCount> = set
    .iter()
    .map(|c| ChoiceCount { code: c.code.clone(), label: c.label.clone(), count: 0 })
    .collect();
  for (code, n) in counts {
    match out.iter_mut().find(|c| c.code == code) {
      Some(c) => c.count = n as usize,
      None => out.push(ChoiceCount { label: code.clone(), code, count: n as usize }),
    }
  }
  out
}

// ─── StudentStore impl ───────────────────────────────────────────────────────

impl StudentStore for SqliteStore {
  type Error = Error;

  fn catalog(&self) -> &Catalog { &self.catalog }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn create(&self, input: NewStudent) -> Result<Student> {
    let at = now();
    let fields = validate_new(input, &self.catalog, at.date_naive())?;
    let student = fields.into_student(Uuid::new_v4(), at, at);

    let stored = self
      .write(&student, Write::Insert)
      .await?
      .ok_or_else(|| Error::Corrupt("insert returned no row".into()))?;

    tracing::debug!(id = %stored.id, name = %stored.full_name(), "created student");
    Ok(stored)
  }

  async fn get(&self, id: Uuid) -> Result<Student> {
    self.fetch(id).await?.ok_or_else(|| not_found(id))
  }

  async fn update(&self, id: Uuid, patch: StudentPatch) -> Result<Student> {
    let current = self.get(id).await?;
    let at = now();
    let fields = apply_patch(current.fields(), patch, &self.catalog, at.date_naive())?;
    let updated_at = at.max(current.updated_at);
    let student = fields.into_student(id, current.created_at, updated_at);

    let stored = self
      .write(&student, Write::Update)
      .await?
      .ok_or_else(|| not_found(id))?;

    tracing::debug!(%id, "updated student");
    Ok(stored)
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM students WHERE id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    if affected == 0 {
      return Err(not_found(id));
    }
    tracing::debug!(%id, "deleted student");
    Ok(())
  }

  async fn clear(&self) -> Result<usize> {
    let removed = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM students", [])?))
      .await?;
    tracing::debug!(removed, "cleared students");
    Ok(removed)
  }

  // ── Bulk ──────────────────────────────────────────────────────────────────

  async fn set_level_for_many(&self, ids: &[Uuid], level: &str) -> Result<usize> {
    let mut err = ValidationError::default();
    if ids.is_empty() {
      err.push("ids", "Select at least one student.");
    }
    if !self.catalog.levels.contains(level) {
      err.push("level", format!("Select a valid choice. {level:?} is not one of the available choices."));
    }
    if !err.is_empty() {
      return Err(err.into());
    }

    let mut seen = HashSet::with_capacity(ids.len());
    let id_strs: Vec<String> = ids
      .iter()
      .filter(|id| seen.insert(**id))
      .map(|id| encode_uuid(*id))
      .collect();
    let level_str = level.to_owned();
    let at_str = encode_dt(now());

    // Each statement commits on its own; a failure part-way leaves the
    // earlier records updated.
    let updated = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "UPDATE students SET level = ?1, updated_at = MAX(updated_at, ?2) WHERE id = ?3",
        )?;
        let mut updated = 0;
        for id in &id_strs {
          updated += stmt.execute(rusqlite::params![level_str, at_str, id])?;
        }
        Ok(updated)
      })
      .await?;

    tracing::info!(requested = ids.len(), updated, level, "set level for students");
    Ok(updated)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn query(&self, query: &StudentQuery) -> Result<Vec<Student>> {
    self.select(query).await
  }

  async fn count(&self, query: &StudentQuery) -> Result<usize> {
    let (where_sql, params) = where_clause(query);
    let sql = format!("SELECT COUNT(*) FROM students {where_sql}");

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(params.iter()), |r| r.get(0))?)
      })
      .await?;
    Ok(n as usize)
  }

  async fn stats(&self, recent: usize) -> Result<RosterStats> {
    let limit = recent as i64;

    let (total, levels, rooms, sexes, raws) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;

        let grouped = |column: &str| -> rusqlite::Result<Vec<(String, i64)>> {
          let mut stmt =
            conn.prepare(&format!("SELECT {column}, COUNT(*) FROM students GROUP BY {column}"))?;
          let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        };
        let levels = grouped("level")?;
        let rooms = grouped("room")?;
        let sexes = grouped("sex")?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {STUDENT_COLUMNS} FROM students ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        ))?;
        let raws = stmt
          .query_map(rusqlite::params![limit], RawStudent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, levels, rooms, sexes, raws))
      })
      .await?;

    let by_sex = Sex::iter()
      .map(|sex| ChoiceCount {
        code:  sex.code().to_owned(),
        label: sex.label().to_owned(),
        count: sexes
          .iter()
          .find(|(c, _)| c == sex.code())
          .map_or(0, |(_, n)| *n as usize),
      })
      .collect();

    Ok(RosterStats {
      total:    total as usize,
      by_level: choice_counts(&self.catalog.levels, levels),
      by_room:  choice_counts(&self.catalog.rooms, rooms),
      by_sex,
      recent:   raws
        .into_iter()
        .map(RawStudent::into_student)
        .collect::<Result<_>>()?,
    })
  }

  // ── Assessments ───────────────────────────────────────────────────────────

  async fn record_assessment(
    &self,
    student_id: Uuid,
    questionnaire: Questionnaire,
    answers: &[u8],
  ) -> Result<Assessment> {
    let outcome = questionnaire.score(answers)?;
    let assessment = Assessment {
      id: Uuid::new_v4(),
      student_id,
      questionnaire,
      answers: answers.to_vec(),
      taken_at: now(),
      outcome,
    };

    let params = (
      encode_uuid(assessment.id),
      encode_uuid(student_id),
      questionnaire.to_string(),
      serde_json::to_string(&assessment.answers)?,
      encode_dt(assessment.taken_at),
    );
    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!(
            "INSERT INTO assessments ({ASSESSMENT_COLUMNS})
             SELECT ?1, ?2, ?3, ?4, ?5 WHERE EXISTS (SELECT 1 FROM students WHERE id = ?2)"
          ),
          rusqlite::params![params.0, params.1, params.2, params.3, params.4],
        )?)
      })
      .await?;

    if inserted == 0 {
      return Err(not_found(student_id));
    }
    tracing::debug!(
      %student_id,
      %questionnaire,
      result = %assessment.outcome.headline(),
      "recorded assessment"
    );
    Ok(assessment)
  }

  async fn assessments(&self, student_id: Uuid) -> Result<Vec<Assessment>> {
    let id_str = encode_uuid(student_id);

    let (exists, raws): (bool, Vec<RawAssessment>) = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row("SELECT 1 FROM students WHERE id = ?1", rusqlite::params![id_str], |_| Ok(()))
          .optional()?
          .is_some();
        let mut stmt = conn.prepare(&format!(
          "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE student_id = ?1
           ORDER BY taken_at DESC, rowid DESC"
        ))?;
        let raws = stmt
          .query_map(rusqlite::params![id_str], RawAssessment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((exists, raws))
      })
      .await?;

    if !exists {
      return Err(not_found(student_id));
    }
    raws.into_iter().map(RawAssessment::into_assessment).collect()
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  #[test]
  fn empty_query_has_no_where_clause() {
    let (sql, params) = where_clause(&StudentQuery::default());
    assert!(sql.is_empty());
    assert!(params.is_empty());
  }

  #[test]
  fn where_clause_binds_parameters_in_order() {
    let q = StudentQuery {
      search: Some("ann".into()),
      level: Some("3".into()),
      sex: Some(Sex::Female),
      born_after: NaiveDate::from_ymd_opt(2010, 1, 1),
      ..StudentQuery::default()
    };
    let (sql, params) = where_clause(&q);
    assert_eq!(sql.matches('?').count(), params.len());
    assert_eq!(params, ["%ann%", "%ann%", "3", "F", "2010-01-01"]);
  }

  #[test]
  fn search_pattern_is_lower_cased_beyond_ascii() {
    let q = StudentQuery { search: Some(" ÉLODIE ".into()), ..StudentQuery::default() };
    let (sql, params) = where_clause(&q);
    assert!(sql.contains("fold_case(first_name) LIKE ?"), "{sql}");
    assert_eq!(params, ["%élodie%", "%élodie%"]);
  }

  #[test]
  fn retired_codes_are_still_counted() {
    let set = ChoiceSet::numbered("Level", 2);
    let counts = choice_counts(&set, vec![("2".into(), 4), ("9".into(), 1)]);
    let summary: Vec<_> = counts.iter().map(|c| (c.code.as_str(), c.count)).collect();
    assert_eq!(summary, [("1", 0), ("2", 4), ("9", 1)]);
  }
}
