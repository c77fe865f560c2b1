//! Career-interest and multiple-intelligence questionnaires.
//!
//! A student answers a [`Questionnaire`]; the answers are kept as given and
//! the [`Outcome`] (percent scores per category plus the strongest
//! categories) is derived from them. Three questionnaires exist:
//!
//! | Name | Questions | Answers | Outcome |
//! |------|-----------|---------|---------|
//! | `holland` | 36, six per interest in RIASEC order | 1 to 5 | [`HollandScores`] |
//! | `gardner` | 24, three per intelligence | 1 to 5 | [`IntelligenceScores`] |
//! | `career-discovery` | 41, interleaved | 0 to 3 | [`IntelligenceScores`] |

use std::{fmt, ops::RangeInclusive};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

use crate::validate::ValidationError;

// ─── Categories ──────────────────────────────────────────────────────────────

/// Holland's six career-interest types. Declaration order is RIASEC, which
/// also breaks ties between equal scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum Interest {
  #[serde(rename = "R")]
  Realistic,
  #[serde(rename = "I")]
  Investigative,
  #[serde(rename = "A")]
  Artistic,
  #[serde(rename = "S")]
  Social,
  #[serde(rename = "E")]
  Enterprising,
  #[serde(rename = "C")]
  Conventional,
}

impl Interest {
  pub fn letter(self) -> char {
    match self {
      Self::Realistic => 'R',
      Self::Investigative => 'I',
      Self::Artistic => 'A',
      Self::Social => 'S',
      Self::Enterprising => 'E',
      Self::Conventional => 'C',
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Realistic => "Realistic",
      Self::Investigative => "Investigative",
      Self::Artistic => "Artistic",
      Self::Social => "Social",
      Self::Enterprising => "Enterprising",
      Self::Conventional => "Conventional",
    }
  }
}

/// Gardner's eight intelligences. Declaration order breaks ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum Intelligence {
  Linguistic,
  Logical,
  Spatial,
  Musical,
  Bodily,
  Interpersonal,
  Intrapersonal,
  Naturalist,
}

impl Intelligence {
  pub fn label(self) -> &'static str {
    match self {
      Self::Linguistic => "Linguistic",
      Self::Logical => "Logical-Mathematical",
      Self::Spatial => "Spatial",
      Self::Musical => "Musical",
      Self::Bodily => "Bodily-Kinesthetic",
      Self::Interpersonal => "Interpersonal",
      Self::Intrapersonal => "Intrapersonal",
      Self::Naturalist => "Naturalist",
    }
  }
}

/// Categories ordered by score, highest first; equal scores keep
/// declaration order.
fn ranked<K: IntoEnumIterator + Copy>(score: impl Fn(K) -> u8) -> Vec<(K, u8)> {
  let mut all: Vec<(K, u8)> = K::iter().map(|k| (k, score(k))).collect();
  all.sort_by(|a, b| b.1.cmp(&a.1));
  all
}

// ─── Scores ──────────────────────────────────────────────────────────────────

/// Percent score (0 to 100) per Holland interest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HollandScores {
  pub realistic:     u8,
  pub investigative: u8,
  pub artistic:      u8,
  pub social:        u8,
  pub enterprising:  u8,
  pub conventional:  u8,
}

impl HollandScores {
  pub fn from_fn(score: impl Fn(Interest) -> u8) -> Self {
    Self {
      realistic:     score(Interest::Realistic),
      investigative: score(Interest::Investigative),
      artistic:      score(Interest::Artistic),
      social:        score(Interest::Social),
      enterprising:  score(Interest::Enterprising),
      conventional:  score(Interest::Conventional),
    }
  }

  pub fn get(&self, interest: Interest) -> u8 {
    match interest {
      Interest::Realistic => self.realistic,
      Interest::Investigative => self.investigative,
      Interest::Artistic => self.artistic,
      Interest::Social => self.social,
      Interest::Enterprising => self.enterprising,
      Interest::Conventional => self.conventional,
    }
  }

  pub fn ranked(&self) -> Vec<(Interest, u8)> { ranked(|i| self.get(i)) }

  /// Letters of the three strongest interests, e.g. `"SAE"`.
  pub fn code(&self) -> String {
    self.ranked().iter().take(3).map(|(i, _)| i.letter()).collect()
  }
}

/// Percent score (0 to 100) per intelligence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelligenceScores {
  pub linguistic:    u8,
  pub logical:       u8,
  pub spatial:       u8,
  pub musical:       u8,
  pub bodily:        u8,
  pub interpersonal: u8,
  pub intrapersonal: u8,
  pub naturalist:    u8,
}

impl IntelligenceScores {
  pub fn from_fn(score: impl Fn(Intelligence) -> u8) -> Self {
    Self {
      linguistic:    score(Intelligence::Linguistic),
      logical:       score(Intelligence::Logical),
      spatial:       score(Intelligence::Spatial),
      musical:       score(Intelligence::Musical),
      bodily:        score(Intelligence::Bodily),
      interpersonal: score(Intelligence::Interpersonal),
      intrapersonal: score(Intelligence::Intrapersonal),
      naturalist:    score(Intelligence::Naturalist),
    }
  }

  pub fn get(&self, intelligence: Intelligence) -> u8 {
    match intelligence {
      Intelligence::Linguistic => self.linguistic,
      Intelligence::Logical => self.logical,
      Intelligence::Spatial => self.spatial,
      Intelligence::Musical => self.musical,
      Intelligence::Bodily => self.bodily,
      Intelligence::Interpersonal => self.interpersonal,
      Intelligence::Intrapersonal => self.intrapersonal,
      Intelligence::Naturalist => self.naturalist,
    }
  }

  pub fn ranked(&self) -> Vec<(Intelligence, u8)> { ranked(|i| self.get(i)) }

  pub fn highest(&self) -> Intelligence { self.ranked()[0].0 }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// What a completed questionnaire says about a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
  Holland {
    scores:    HollandScores,
    primary:   Interest,
    secondary: Interest,
    /// Top three interest letters.
    code:      String,
  },
  Intelligence {
    scores:    IntelligenceScores,
    primary:   Intelligence,
    secondary: Intelligence,
  },
}

impl Outcome {
  pub fn holland(scores: HollandScores) -> Self {
    let ranked = scores.ranked();
    Self::Holland { primary: ranked[0].0, secondary: ranked[1].0, code: scores.code(), scores }
  }

  pub fn intelligence(scores: IntelligenceScores) -> Self {
    let ranked = scores.ranked();
    Self::Intelligence { primary: ranked[0].0, secondary: ranked[1].0, scores }
  }

  /// One-line summary, e.g. `Holland SAE` or `Intelligence: Musical`.
  pub fn headline(&self) -> String {
    match self {
      Self::Holland { code, .. } => format!("Holland {code}"),
      Self::Intelligence { primary, .. } => format!("Intelligence: {}", primary.label()),
    }
  }
}

// ─── Questionnaires ──────────────────────────────────────────────────────────

/// Question blocks of the `gardner` questionnaire, three questions each.
const GARDNER_BLOCKS: [Intelligence; 8] = [
  Intelligence::Linguistic,
  Intelligence::Logical,
  Intelligence::Spatial,
  Intelligence::Bodily,
  Intelligence::Musical,
  Intelligence::Interpersonal,
  Intelligence::Intrapersonal,
  Intelligence::Naturalist,
];

/// 1-based question numbers of the `career-discovery` questionnaire.
const CAREER_DISCOVERY: [(Intelligence, &[usize]); 8] = [
  (Intelligence::Linguistic, &[1, 10, 17, 25, 34]),
  (Intelligence::Musical, &[2, 11, 20, 30, 40]),
  (Intelligence::Bodily, &[3, 9, 26, 27, 31, 37]),
  (Intelligence::Interpersonal, &[4, 12, 18, 35, 39]),
  (Intelligence::Logical, &[5, 15, 22, 32]),
  (Intelligence::Naturalist, &[6, 13, 16, 23, 38]),
  (Intelligence::Spatial, &[7, 19, 24, 29, 33]),
  (Intelligence::Intrapersonal, &[8, 14, 21, 28, 36, 41]),
];

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Questionnaire {
  Holland,
  Gardner,
  CareerDiscovery,
}

impl Questionnaire {
  pub fn question_count(self) -> usize {
    match self {
      Self::Holland => 36,
      Self::Gardner => 24,
      Self::CareerDiscovery => 41,
    }
  }

  /// The accepted answer values.
  pub fn scale(self) -> RangeInclusive<u8> {
    match self {
      Self::Holland | Self::Gardner => 1..=5,
      Self::CareerDiscovery => 0..=3,
    }
  }

  /// Validate `answers` (question 1 first) and score them.
  pub fn score(self, answers: &[u8]) -> Result<Outcome, ValidationError> {
    self.check(answers)?;
    let top = *self.scale().end();
    let outcome = match self {
      Self::Holland => Outcome::holland(HollandScores::from_fn(|interest| {
        let first = interest as usize * 6 + 1;
        percent(answers, first..first + 6, top)
      })),
      Self::Gardner => Outcome::intelligence(IntelligenceScores::from_fn(|intelligence| {
        let block = GARDNER_BLOCKS.iter().position(|b| *b == intelligence).unwrap_or(0);
        let first = block * 3 + 1;
        percent(answers, first..first + 3, top)
      })),
      Self::CareerDiscovery => Outcome::intelligence(IntelligenceScores::from_fn(|intelligence| {
        let questions = CAREER_DISCOVERY
          .iter()
          .find(|(i, _)| *i == intelligence)
          .map_or(&[][..], |(_, q)| *q);
        percent(answers, questions.iter().copied(), top)
      })),
    };
    Ok(outcome)
  }

  fn check(self, answers: &[u8]) -> Result<(), ValidationError> {
    let expected = self.question_count();
    if answers.len() != expected {
      return Err(ValidationError::single(
        "answers",
        format!("Expected {expected} answers, got {}.", answers.len()),
      ));
    }
    let scale = self.scale();
    let bad: Vec<String> = answers
      .iter()
      .enumerate()
      .filter(|(_, a)| !scale.contains(a))
      .map(|(i, _)| (i + 1).to_string())
      .collect();
    if bad.is_empty() {
      Ok(())
    } else {
      Err(ValidationError::single(
        "answers",
        format!(
          "Answers must run from {} to {}; check question {}.",
          scale.start(),
          scale.end(),
          bad.join(", ")
        ),
      ))
    }
  }
}

/// Total of the 1-based `questions` as a rounded percentage of the best
/// possible total.
fn percent(answers: &[u8], questions: impl IntoIterator<Item = usize>, top: u8) -> u8 {
  let (total, count) = questions
    .into_iter()
    .filter_map(|q| answers.get(q.wrapping_sub(1)))
    .fold((0u32, 0u32), |(total, count), a| (total + u32::from(*a), count + 1));
  let best = count * u32::from(top);
  if best == 0 { 0 } else { ((total * 100 + best / 2) / best) as u8 }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A completed questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
  pub id:            Uuid,
  pub student_id:    Uuid,
  pub questionnaire: Questionnaire,
  pub answers:       Vec<u8>,
  pub taken_at:      DateTime<Utc>,
  pub outcome:       Outcome,
}

impl fmt::Display for Assessment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} ({}, {})",
      self.outcome.headline(),
      self.questionnaire,
      self.taken_at.format("%Y-%m-%d")
    )
  }
}

/// The latest result of each kind for one student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub holland:      Option<Assessment>,
  pub intelligence: Option<Assessment>,
}

impl Profile {
  /// Pick the first of each kind from `history`, which is newest first.
  pub fn from_history(history: impl IntoIterator<Item = Assessment>) -> Self {
    let mut profile = Self::default();
    for a in history {
      let slot = match a.outcome {
        Outcome::Holland { .. } => &mut profile.holland,
        Outcome::Intelligence { .. } => &mut profile.intelligence,
      };
      if slot.is_none() {
        *slot = Some(a);
      }
    }
    profile
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  /// Holland answers with a fixed value per RIASEC block.
  fn holland(blocks: [u8; 6]) -> Vec<u8> {
    blocks.iter().flat_map(|a| [*a; 6]).collect()
  }

  #[test]
  fn holland_scores_are_percent_of_block_maximum() {
    let outcome = Questionnaire::Holland.score(&holland([1, 2, 3, 4, 5, 5])).unwrap();
    let Outcome::Holland { scores, primary, secondary, code } = outcome else {
      panic!("expected a holland outcome")
    };
    assert_eq!(scores.realistic, 20);
    assert_eq!(scores.investigative, 40);
    assert_eq!(scores.artistic, 60);
    assert_eq!(scores.social, 80);
    assert_eq!(scores.enterprising, 100);
    assert_eq!(scores.conventional, 100);
    // Ties keep RIASEC order.
    assert_eq!((primary, secondary), (Interest::Enterprising, Interest::Conventional));
    assert_eq!(code, "ECS");
  }

  #[test]
  fn partial_blocks_round_to_nearest() {
    let mut answers = holland([3; 6]);
    answers[0] = 4; // realistic total 19 of 30
    let Outcome::Holland { scores, code, .. } = Questionnaire::Holland.score(&answers).unwrap()
    else {
      panic!("expected a holland outcome")
    };
    assert_eq!(scores.realistic, 63);
    assert_eq!(scores.investigative, 60);
    assert_eq!(code, "RIA");
  }

  #[test]
  fn gardner_blocks_follow_question_order() {
    // Block 4 (questions 10 to 12) is bodily, block 5 musical.
    let mut answers = vec![1; 24];
    answers[9..12].copy_from_slice(&[5, 5, 5]);
    answers[12..15].copy_from_slice(&[5, 4, 3]);
    let Outcome::Intelligence { scores, primary, secondary } =
      Questionnaire::Gardner.score(&answers).unwrap()
    else {
      panic!("expected an intelligence outcome")
    };
    assert_eq!(scores.bodily, 100);
    assert_eq!(scores.musical, 80);
    assert_eq!(scores.linguistic, 20);
    assert_eq!(primary, Intelligence::Bodily);
    assert_eq!(secondary, Intelligence::Musical);
    assert_eq!(scores.highest(), Intelligence::Bodily);
  }

  #[test]
  fn career_discovery_uses_interleaved_questions() {
    let mut answers = vec![0; 41];
    for q in [5, 15, 22, 32] {
      answers[q - 1] = 3;
    }
    answers[0] = 3; // one linguistic question of five
    let Outcome::Intelligence { scores, primary, secondary } =
      Questionnaire::CareerDiscovery.score(&answers).unwrap()
    else {
      panic!("expected an intelligence outcome")
    };
    assert_eq!(scores.logical, 100);
    assert_eq!(scores.linguistic, 20);
    assert_eq!(scores.naturalist, 0);
    assert_eq!((primary, secondary), (Intelligence::Logical, Intelligence::Linguistic));
  }

  #[test]
  fn every_career_discovery_question_is_scored_once() {
    let mut seen: Vec<usize> = CAREER_DISCOVERY.iter().flat_map(|(_, q)| q.iter().copied()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (1..=41).collect::<Vec<_>>());
  }

  #[test]
  fn wrong_count_and_out_of_scale_answers_are_rejected() {
    let err = Questionnaire::Gardner.score(&[3; 23]).unwrap_err();
    assert!(err.has_field("answers"));
    assert!(err.to_string().contains("Expected 24 answers, got 23"));

    let mut answers = holland([3; 6]);
    answers[6] = 0;
    answers[35] = 6;
    let err = Questionnaire::Holland.score(&answers).unwrap_err();
    assert!(err.to_string().contains("question 7, 36"), "{err}");

    assert!(Questionnaire::CareerDiscovery.score(&[4; 41]).is_err());
    assert!(Questionnaire::CareerDiscovery.score(&[0; 41]).is_ok());
  }

  #[test]
  fn questionnaire_names_are_kebab_case() {
    assert_eq!(Questionnaire::CareerDiscovery.to_string(), "career-discovery");
    assert_eq!(Questionnaire::from_str("holland").unwrap(), Questionnaire::Holland);
    assert!(Questionnaire::from_str("myers-briggs").is_err());
  }

  #[test]
  fn outcome_serialises_with_kind_tag_and_letters() {
    let outcome = Questionnaire::Holland.score(&holland([5, 1, 1, 4, 1, 1])).unwrap();
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["kind"], "holland");
    assert_eq!(json["primary"], "R");
    assert_eq!(json["secondary"], "S");
    assert_eq!(json["code"], "RSI");
    assert_eq!(json["scores"]["social"], 80);
    let back: Outcome = serde_json::from_value(json).unwrap();
    assert_eq!(back, outcome);
  }

  #[test]
  fn profile_keeps_the_newest_of_each_kind() {
    let at = Utc::now();
    let make = |questionnaire: Questionnaire, answers: Vec<u8>| Assessment {
      id: Uuid::new_v4(),
      student_id: Uuid::nil(),
      outcome: questionnaire.score(&answers).unwrap(),
      questionnaire,
      answers,
      taken_at: at,
    };
    let newest_holland = make(Questionnaire::Holland, holland([5, 1, 1, 1, 1, 1]));
    let older_holland = make(Questionnaire::Holland, holland([1, 5, 1, 1, 1, 1]));
    let gardner = make(Questionnaire::Gardner, vec![2; 24]);

    let profile =
      Profile::from_history([newest_holland.clone(), gardner.clone(), older_holland]);
    assert_eq!(profile.holland, Some(newest_holland));
    assert_eq!(profile.intelligence, Some(gardner));
    assert_eq!(Profile::from_history([]), Profile::default());
  }
}
