//! Registry summary used by the dashboard and the seeding command.

use serde::{Deserialize, Serialize};

use crate::student::Student;

/// The number of students holding one choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceCount {
  pub code:  String,
  pub label: String,
  pub count: usize,
}

/// Totals per level, room and sex, listed in configuration order with zero
/// counts included, plus the most recently created students.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterStats {
  pub total:    usize,
  pub by_level: Vec<ChoiceCount>,
  pub by_room:  Vec<ChoiceCount>,
  pub by_sex:   Vec<ChoiceCount>,
  pub recent:   Vec<Student>,
}
