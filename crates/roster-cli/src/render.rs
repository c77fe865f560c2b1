//! Plain-text rendering of API replies.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use roster_core::{
  admin::BulkAction,
  assessment::{Assessment, Outcome, Profile},
  choices::Choice,
  stats::RosterStats,
  student::Student,
};

use crate::client::{Choices, QuestionnaireInfo};

/// Left-aligned columns separated by two spaces, with a rule under the header.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
  let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
  for row in rows {
    for (w, cell) in widths.iter_mut().zip(row) {
      *w = (*w).max(cell.chars().count());
    }
  }

  let mut out = String::new();
  push_line(&mut out, &widths, headers.iter().copied());
  let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
  push_line(&mut out, &widths, rule.iter().map(String::as_str));
  for row in rows {
    push_line(&mut out, &widths, row.iter().map(String::as_str));
  }
  out
}

fn push_line<'a>(out: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
  let text = cells
    .zip(widths.iter().copied())
    .map(|(c, w)| format!("{c:<w$}"))
    .collect::<Vec<_>>()
    .join("  ");
  out.push_str(text.trim_end());
  out.push('\n');
}

fn timestamp(t: DateTime<Utc>) -> String { t.format("%Y-%m-%d %H:%M").to_string() }

fn or_dash(v: &Option<String>) -> String { v.clone().unwrap_or_else(|| "-".into()) }

pub fn students(list: &[Student], today: NaiveDate) -> String {
  if list.is_empty() {
    return "No students found.\n".into();
  }
  let rows: Vec<Vec<String>> = list
    .iter()
    .map(|s| {
      vec![
        s.id.to_string(),
        or_dash(&s.student_code),
        or_dash(&s.student_number),
        s.full_name(),
        s.sex.label().into(),
        s.age_on(today).to_string(),
        s.level.clone(),
        s.room.clone(),
        timestamp(s.updated_at),
      ]
    })
    .collect();
  table(
    &["ID", "CODE", "NUMBER", "NAME", "SEX", "AGE", "LEVEL", "ROOM", "UPDATED"],
    &rows,
  )
}

/// Every field of one record, one per line.
pub fn student(s: &Student, today: NaiveDate) -> String {
  let photo = s
    .photo
    .as_ref()
    .map(|p| format!("{} ({})", p.path, p.media_type))
    .unwrap_or_else(|| "-".into());

  let fields = [
    ("id", s.id.to_string()),
    ("student_code", or_dash(&s.student_code)),
    ("student_number", or_dash(&s.student_number)),
    ("first_name", s.first_name.clone()),
    ("last_name", s.last_name.clone()),
    ("sex", s.sex.label().into()),
    ("date_of_birth", format!("{} (age {})", s.date_of_birth, s.age_on(today))),
    ("level", s.level.clone()),
    ("room", s.room.clone()),
    ("photo", photo),
    ("created_at", s.created_at.to_rfc3339()),
    ("updated_at", s.updated_at.to_rfc3339()),
  ];

  let mut out = String::new();
  for (name, value) in fields {
    let _ = writeln!(out, "{name:<15} {value}");
  }
  out
}

fn choice_rows<'a>(kind: &str, choices: impl Iterator<Item = &'a Choice>) -> Vec<Vec<String>> {
  choices
    .map(|c| vec![kind.to_owned(), c.code.clone(), c.label.clone()])
    .collect()
}

pub fn choices(c: &Choices) -> String {
  let mut rows = choice_rows("level", c.levels.iter());
  rows.extend(choice_rows("room", c.rooms.iter()));
  rows.extend(choice_rows("sex", c.sex.iter()));
  table(&["FIELD", "CODE", "LABEL"], &rows)
}

pub fn actions(list: &[BulkAction]) -> String {
  let rows: Vec<Vec<String>> = list
    .iter()
    .map(|a| vec![a.name.clone(), a.description.clone()])
    .collect();
  table(&["ACTION", "DESCRIPTION"], &rows)
}

// ─── Assessments ─────────────────────────────────────────────────────────────

/// Category scores, strongest first.
fn scores(outcome: &Outcome) -> String {
  let rows: Vec<Vec<String>> = match outcome {
    Outcome::Holland { scores, .. } => scores
      .ranked()
      .into_iter()
      .map(|(i, n)| vec![format!("{} ({})", i.label(), i.letter()), format!("{n}%")])
      .collect(),
    Outcome::Intelligence { scores, .. } => scores
      .ranked()
      .into_iter()
      .map(|(i, n)| vec![i.label().to_owned(), format!("{n}%")])
      .collect(),
  };
  table(&["CATEGORY", "SCORE"], &rows)
}

pub fn assessment(a: &Assessment) -> String { format!("{a}\n{}", scores(&a.outcome)) }

pub fn profile(p: &Profile) -> String {
  let mut out = String::new();
  for (title, latest) in [("Career interests", &p.holland), ("Intelligences", &p.intelligence)] {
    match latest {
      Some(a) => {
        let _ = write!(out, "{title}: {}\n{}", a, scores(&a.outcome));
      }
      None => {
        let _ = writeln!(out, "{title}: not assessed");
      }
    }
  }
  out
}

pub fn assessments(list: &[Assessment]) -> String {
  if list.is_empty() {
    return "No assessments taken.\n".into();
  }
  let rows: Vec<Vec<String>> = list
    .iter()
    .map(|a| {
      vec![
        a.id.to_string(),
        a.questionnaire.to_string(),
        timestamp(a.taken_at),
        a.outcome.headline(),
      ]
    })
    .collect();
  table(&["ID", "QUESTIONNAIRE", "TAKEN", "RESULT"], &rows)
}

pub fn questionnaires(list: &[QuestionnaireInfo]) -> String {
  let rows: Vec<Vec<String>> = list
    .iter()
    .map(|q| vec![q.name.to_string(), q.questions.to_string(), format!("{} to {}", q.min, q.max)])
    .collect();
  table(&["NAME", "QUESTIONS", "ANSWERS"], &rows)
}

pub fn stats(s: &RosterStats, today: NaiveDate) -> String {
  let mut out = format!("Total students: {}\n", s.total);
  for (title, counts) in [("level", &s.by_level), ("room", &s.by_room), ("sex", &s.by_sex)] {
    let rows: Vec<Vec<String>> = counts
      .iter()
      .map(|c| vec![c.label.clone(), c.count.to_string()])
      .collect();
    let _ = write!(out, "\nBy {title}:\n{}", table(&["LABEL", "COUNT"], &rows));
  }
  if !s.recent.is_empty() {
    let _ = write!(out, "\nRecently added:\n{}", students(&s.recent, today));
  }
  out
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use roster_core::{
    assessment::Questionnaire,
    choices::ChoiceSet,
    stats::ChoiceCount,
    student::{PhotoRef, Sex},
  };
  use uuid::Uuid;

  use super::*;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 9, 1).unwrap() }

  fn ann() -> Student {
    let at = Utc.with_ymd_and_hms(2024, 8, 30, 9, 15, 0).unwrap();
    Student {
      id:             Uuid::nil(),
      student_code:   Some("STDANLE001".into()),
      student_number: None,
      photo:          None,
      first_name:     "Ann".into(),
      last_name:      "Lee".into(),
      sex:            Sex::Female,
      date_of_birth:  NaiveDate::from_ymd_opt(2013, 4, 20).unwrap(),
      level:          "3".into(),
      room:           "1".into(),
      created_at:     at,
      updated_at:     at,
    }
  }

  #[test]
  fn table_pads_to_widest_cell() {
    let out = table(&["A", "NAME"], &[vec!["long".into(), "x".into()]]);
    assert_eq!(out, "A     NAME\n----  ----\nlong  x\n");
  }

  #[test]
  fn student_rows_show_age_and_dashes() {
    let out = students(&[ann()], today());
    let row = out.lines().nth(2).unwrap();
    assert!(row.contains("STDANLE001  -"), "{row}");
    assert!(row.contains("Ann Lee"));
    assert!(row.contains("Female  11"));
    assert!(row.ends_with("2024-08-30 09:15"));
  }

  #[test]
  fn empty_list_says_so() {
    assert_eq!(students(&[], today()), "No students found.\n");
  }

  #[test]
  fn detail_lists_photo_path() {
    let mut s = ann();
    s.photo = Some(PhotoRef {
      path:         "student_photos/Ann_Lee.png".into(),
      content_hash: "00".into(),
      media_type:   "image/png".into(),
    });
    let out = student(&s, today());
    assert!(out.contains("photo           student_photos/Ann_Lee.png (image/png)"));
    assert!(out.contains("date_of_birth   2013-04-20 (age 11)"));
  }

  #[test]
  fn choices_and_stats_sections() {
    let c = Choices {
      levels: ChoiceSet::numbered("Level", 2),
      rooms:  ChoiceSet::numbered("Room", 1),
      sex:    vec![Choice::new("M", "Male")],
    };
    let out = choices(&c);
    assert!(out.contains("level  2     Level 2"));
    assert!(out.contains("sex    M     Male"));

    let s = RosterStats {
      total:    1,
      by_level: vec![ChoiceCount { code: "3".into(), label: "Level 3".into(), count: 1 }],
      by_room:  vec![],
      by_sex:   vec![],
      recent:   vec![ann()],
    };
    let out = stats(&s, today());
    assert!(out.starts_with("Total students: 1\n\nBy level:\n"));
    assert!(out.contains("Level 3  1"));
    assert!(out.contains("Recently added:"));
  }

  fn holland_taken() -> Assessment {
    let answers: Vec<u8> = [5u8, 1, 1, 4, 1, 3].iter().flat_map(|a| [*a; 6]).collect();
    Assessment {
      id:            Uuid::nil(),
      student_id:    Uuid::nil(),
      questionnaire: Questionnaire::Holland,
      outcome:       Questionnaire::Holland.score(&answers).unwrap(),
      answers,
      taken_at:      Utc.with_ymd_and_hms(2024, 8, 30, 9, 15, 0).unwrap(),
    }
  }

  #[test]
  fn assessment_lists_scores_strongest_first() {
    let out = assessment(&holland_taken());
    let mut lines = out.lines();
    assert_eq!(lines.next(), Some("Holland RSC (holland, 2024-08-30)"));
    assert_eq!(lines.nth(2), Some("Realistic (R)      100%"));
    assert_eq!(lines.next(), Some("Social (S)         80%"));
  }

  #[test]
  fn profile_marks_missing_kinds() {
    let p = Profile { holland: Some(holland_taken()), intelligence: None };
    let out = profile(&p);
    assert!(out.starts_with("Career interests: Holland RSC"), "{out}");
    assert!(out.ends_with("Intelligences: not assessed\n"), "{out}");

    let history = assessments(&[holland_taken()]);
    let row = history.lines().nth(2).unwrap();
    assert!(row.ends_with("holland        2024-08-30 09:15  Holland RSC"), "{row}");
    assert_eq!(assessments(&[]), "No assessments taken.\n");
  }
}
