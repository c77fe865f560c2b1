//! Declarative configuration of the administrative list view.
//!
//! Mirrors what an admin panel registration declares: which columns to show,
//! which fields get sidebar filters, what the search box covers, page size,
//! and the bulk actions offered for a selection of rows.

use chrono::{NaiveDate, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::{
  Error, Result,
  choices::Catalog,
  student::{PhotoRef, Student},
};

/// Fields the search box matches against.
pub const SEARCH_FIELDS: [&str; 2] = ["first_name", "last_name"];

// ─── Columns and filters ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
  Photo,
  StudentCode,
  StudentNumber,
  FirstName,
  LastName,
  Sex,
  Age,
  Level,
  Room,
  CreatedAt,
  UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
  Level,
  Room,
  Sex,
  CreatedAt,
  UpdatedAt,
  DateOfBirth,
}

// ─── Bulk actions ────────────────────────────────────────────────────────────

/// A named "set level" action offered for a selection of students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkAction {
  pub name:         String,
  pub description:  String,
  pub target_level: String,
}

impl BulkAction {
  /// `make_level_<code>`, described with the level's label.
  pub fn set_level(code: &str, label: &str) -> Self {
    Self {
      name:         format!("make_level_{code}"),
      description:  format!("Move selected students to {label}"),
      target_level: code.to_owned(),
    }
  }

  /// Operator feedback after the action touched `count` students.
  pub fn message(&self, count: usize, catalog: &Catalog) -> String {
    let label = catalog
      .levels
      .label(&self.target_level)
      .unwrap_or(&self.target_level);
    format!("{count} students moved to {label}.")
  }
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
  pub list_display:  Vec<Column>,
  pub list_filter:   Vec<FilterField>,
  pub list_per_page: usize,
  pub actions:       Vec<BulkAction>,
}

impl AdminConfig {
  /// The standard student list, with "move to Level 1" and "move to Level 2"
  /// actions for whichever of those levels `catalog` defines.
  pub fn for_catalog(catalog: &Catalog) -> Self {
    let actions = ["1", "2"]
      .into_iter()
      .filter_map(|code| {
        catalog
          .levels
          .label(code)
          .map(|label| BulkAction::set_level(code, label))
      })
      .collect();

    Self {
      list_display: vec![
        Column::Photo,
        Column::StudentCode,
        Column::StudentNumber,
        Column::FirstName,
        Column::LastName,
        Column::Sex,
        Column::Age,
        Column::Level,
        Column::Room,
        Column::CreatedAt,
        Column::UpdatedAt,
      ],
      list_filter: vec![
        FilterField::Level,
        FilterField::Room,
        FilterField::Sex,
        FilterField::CreatedAt,
        FilterField::UpdatedAt,
        FilterField::DateOfBirth,
      ],
      list_per_page: 25,
      actions,
    }
  }

  pub fn action(&self, name: &str) -> Option<&BulkAction> {
    self.actions.iter().find(|a| a.name == name)
  }

  /// Reject actions that target a level missing from `catalog`, duplicate
  /// action names, and a zero page size.
  pub fn check(&self, catalog: &Catalog) -> Result<()> {
    if self.list_per_page == 0 {
      return Err(Error::Config("list_per_page must be positive".into()));
    }
    for (i, action) in self.actions.iter().enumerate() {
      if !catalog.levels.contains(&action.target_level) {
        return Err(Error::Config(format!(
          "action {:?} targets unknown level {:?}",
          action.name, action.target_level
        )));
      }
      if self.actions[..i].iter().any(|a| a.name == action.name) {
        return Err(Error::Config(format!("duplicate action {:?}", action.name)));
      }
    }
    Ok(())
  }

  /// Render one list row: the configured columns, with choice codes replaced
  /// by their labels and the photo replaced by its public URL.
  pub fn row(
    &self,
    student: &Student,
    catalog: &Catalog,
    today: NaiveDate,
    photo_url: impl Fn(&PhotoRef) -> String,
  ) -> AdminRow {
    let mut cells = Map::new();
    for column in &self.list_display {
      let (key, value) = match column {
        Column::Photo => ("photo", json!(student.photo.as_ref().map(&photo_url))),
        Column::StudentCode => ("student_code", json!(student.student_code)),
        Column::StudentNumber => ("student_number", json!(student.student_number)),
        Column::FirstName => ("first_name", json!(student.first_name)),
        Column::LastName => ("last_name", json!(student.last_name)),
        Column::Sex => ("sex", json!(student.sex.label())),
        Column::Age => ("age", json!(student.age_on(today))),
        Column::Level => ("level", json!(label_or_code(&catalog.levels, &student.level))),
        Column::Room => ("room", json!(label_or_code(&catalog.rooms, &student.room))),
        Column::CreatedAt => (
          "created_at",
          json!(student.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ),
        Column::UpdatedAt => (
          "updated_at",
          json!(student.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ),
      };
      cells.insert(key.to_owned(), value);
    }
    AdminRow { id: student.id, cells }
  }
}

fn label_or_code<'a>(set: &'a crate::choices::ChoiceSet, code: &'a str) -> &'a str {
  set.label(code).unwrap_or(code)
}

/// One rendered row of the list view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRow {
  pub id:    Uuid,
  pub cells: Map<String, Value>,
}

// ─── Pagination ──────────────────────────────────────────────────────────────

/// Page arithmetic for the list view. Out-of-range pages are clamped rather
/// than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
  pub page:      usize,
  pub num_pages: usize,
  pub per_page:  usize,
  pub total:     usize,
}

impl Pagination {
  pub fn new(total: usize, per_page: usize, requested: Option<usize>) -> Self {
    let per_page = per_page.max(1);
    let num_pages = total.div_ceil(per_page).max(1);
    let page = requested.unwrap_or(1).clamp(1, num_pages);
    Self { page, num_pages, per_page, total }
  }

  pub fn offset(&self) -> usize { (self.page - 1) * self.per_page }
}
