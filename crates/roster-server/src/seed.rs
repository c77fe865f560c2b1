//! `server seed`: fill the registry with random sample students.

use std::fmt::Write as _;

use chrono::{Days, Months, NaiveDate};
use rand_core::RngCore;
use roster_core::{
  choices::{AgeRange, Catalog},
  stats::{ChoiceCount, RosterStats},
  store::{ClassifyError, ErrorClass, StudentStore},
  student::NewStudent,
};

const FIRST_NAMES: [&str; 20] = [
  "John", "Jane", "Michael", "Sarah", "David", "Emily", "James", "Emma", "William", "Olivia",
  "Alexander", "Sophia", "Benjamin", "Isabella", "Lucas", "Mia", "Henry", "Charlotte",
  "Sebastian", "Amelia",
];

const LAST_NAMES: [&str; 20] = [
  "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
  "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
  "Moore", "Jackson", "Martin",
];

/// Ages, in whole years, of generated students.
const AGES: std::ops::RangeInclusive<u32> = 6..=18;

/// [`AGES`] narrowed to what the catalog accepts, or the whole catalog window
/// when the two do not overlap.
fn age_span(accepted: AgeRange) -> (u32, u32) {
  let youngest = (*AGES.start()).max(accepted.min());
  let oldest = (*AGES.end()).min(accepted.max());
  if youngest <= oldest { (youngest, oldest) } else { (accepted.min(), accepted.max()) }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
  pub removed: usize,
  pub created: usize,
  pub skipped: usize,
}

fn pick<'a, T>(rng: &mut impl RngCore, items: &'a [T]) -> &'a T {
  &items[rng.next_u32() as usize % items.len()]
}

/// The `n`th sample student (1-based); `n` numbers its code and student
/// number, e.g. `STDJOSM001` and `2024001`.
pub fn sample_student(
  rng: &mut impl RngCore,
  n: usize,
  catalog: &Catalog,
  today: NaiveDate,
) -> NewStudent {
  let first = *pick(rng, &FIRST_NAMES);
  let last = *pick(rng, &LAST_NAMES);
  let sex = *pick(rng, &["M", "F"]);
  let levels: Vec<&str> = catalog.levels.codes().collect();
  let rooms: Vec<&str> = catalog.rooms.codes().collect();

  // Under a year on top of `years`, so the age is exactly `years`.
  let (youngest, oldest) = age_span(catalog.ages);
  let years = youngest + rng.next_u32() % (oldest - youngest + 1);
  let months = Months::new(years * 12 + rng.next_u32() % 12);
  let days = Days::new(u64::from(rng.next_u32() % 28));
  let date_of_birth = today
    .checked_sub_months(months)
    .and_then(|d| d.checked_sub_days(days))
    .unwrap_or(today);

  let initials = |name: &str| name.chars().take(2).collect::<String>().to_uppercase();

  NewStudent {
    student_code: Some(format!("STD{}{}{n:03}", initials(first), initials(last))),
    student_number: Some(format!("2024{n:03}")),
    photo: None,
    first_name: Some(first.to_owned()),
    last_name: Some(last.to_owned()),
    sex: Some(sex.to_owned()),
    date_of_birth: Some(date_of_birth),
    level: Some((*pick(rng, &levels)).to_owned()),
    room: Some((*pick(rng, &rooms)).to_owned()),
  }
}

/// Create `count` sample students, first deleting every record when
/// `replace` is set. Records whose generated codes are already taken are
/// skipped and reported; storage failures abort.
pub async fn seed<S: StudentStore>(
  store: &S,
  count: usize,
  replace: bool,
  rng: &mut impl RngCore,
  today: NaiveDate,
) -> Result<SeedReport, S::Error> {
  let mut report = SeedReport::default();

  if replace {
    report.removed = store.clear().await?;
    tracing::warn!(removed = report.removed, "deleted existing student records");
  }

  for _ in 0..count {
    let input = sample_student(rng, report.created + 1, store.catalog(), today);
    match store.create(input).await {
      Ok(student) => {
        report.created += 1;
        tracing::debug!(id = %student.id, "{student}");
        if report.created % 5 == 0 {
          tracing::info!("created {} students...", report.created);
        }
      }
      Err(e) => {
        if let ErrorClass::Invalid(v) = e.class() {
          tracing::warn!(error = %v, "skipped sample student");
          report.skipped += 1;
          continue;
        }
        return Err(e);
      }
    }
  }

  Ok(report)
}

/// Plain-text breakdown printed after seeding.
pub fn summary(stats: &RosterStats) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "Total students: {}", stats.total);
  for (title, counts) in [
    ("level", &stats.by_level),
    ("room", &stats.by_room),
    ("sex", &stats.by_sex),
  ] {
    let _ = writeln!(out, "\nStudents by {title}:");
    for ChoiceCount { label, count, .. } in counts {
      let _ = writeln!(out, "  {label}: {count}");
    }
  }
  out
}
