//! Configuration-driven enumerations for `level` and `room`.
//!
//! A [`ChoiceSet`] is an ordered mapping of short codes to display labels.
//! The codes are what gets stored on a student record; labels exist only for
//! presentation. New levels or rooms are added by editing configuration, not
//! the record schema.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One entry of a [`ChoiceSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
  pub code:  String,
  pub label: String,
}

impl Choice {
  pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
    Self { code: code.into(), label: label.into() }
  }
}

/// An ordered, non-empty set of [`Choice`]s with unique codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Choice>", into = "Vec<Choice>")]
pub struct ChoiceSet {
  choices: Vec<Choice>,
}

impl ChoiceSet {
  /// Build a set, rejecting empty sets, blank codes and duplicate codes.
  pub fn new(choices: Vec<Choice>) -> Result<Self> {
    if choices.is_empty() {
      return Err(Error::Config("a choice set needs at least one entry".into()));
    }
    for (i, choice) in choices.iter().enumerate() {
      if choice.code.trim().is_empty() {
        return Err(Error::Config(format!("entry {i} has a blank code")));
      }
      if choices[..i].iter().any(|c| c.code == choice.code) {
        return Err(Error::Config(format!("duplicate code {:?}", choice.code)));
      }
    }
    Ok(Self { choices })
  }

  /// `1..=n` with labels `"{prefix} {i}"`, e.g. `Level 1` .. `Level 6`.
  pub fn numbered(prefix: &str, n: u32) -> Self {
    let choices = (1..=n.max(1))
      .map(|i| Choice::new(i.to_string(), format!("{prefix} {i}")))
      .collect();
    Self { choices }
  }

  pub fn contains(&self, code: &str) -> bool {
    self.choices.iter().any(|c| c.code == code)
  }

  pub fn label(&self, code: &str) -> Option<&str> {
    self
      .choices
      .iter()
      .find(|c| c.code == code)
      .map(|c| c.label.as_str())
  }

  pub fn codes(&self) -> impl Iterator<Item = &str> {
    self.choices.iter().map(|c| c.code.as_str())
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Choice> { self.choices.iter() }

  pub fn len(&self) -> usize { self.choices.len() }

  pub fn is_empty(&self) -> bool { self.choices.is_empty() }
}

impl TryFrom<Vec<Choice>> for ChoiceSet {
  type Error = Error;

  fn try_from(choices: Vec<Choice>) -> Result<Self> { Self::new(choices) }
}

impl From<ChoiceSet> for Vec<Choice> {
  fn from(set: ChoiceSet) -> Self { set.choices }
}

impl<'a> IntoIterator for &'a ChoiceSet {
  type Item = &'a Choice;
  type IntoIter = std::slice::Iter<'a, Choice>;

  fn into_iter(self) -> Self::IntoIter { self.choices.iter() }
}

/// Accepted student ages in whole years, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(u32, u32)", into = "(u32, u32)")]
pub struct AgeRange {
  min: u32,
  max: u32,
}

impl AgeRange {
  pub fn new(min: u32, max: u32) -> Result<Self> {
    if min > max {
      return Err(Error::Config(format!("age range {min}..={max} is empty")));
    }
    Ok(Self { min, max })
  }

  pub fn min(&self) -> u32 { self.min }

  pub fn max(&self) -> u32 { self.max }

  pub fn contains(&self, age: u32) -> bool { (self.min..=self.max).contains(&age) }
}

/// 3 to 25 years.
impl Default for AgeRange {
  fn default() -> Self { Self { min: 3, max: 25 } }
}

impl TryFrom<(u32, u32)> for AgeRange {
  type Error = Error;

  fn try_from((min, max): (u32, u32)) -> Result<Self> { Self::new(min, max) }
}

impl From<AgeRange> for (u32, u32) {
  fn from(range: AgeRange) -> Self { (range.min, range.max) }
}

/// The choice sets and age window a store validates records against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
  pub levels: ChoiceSet,
  pub rooms:  ChoiceSet,
  #[serde(default)]
  pub ages:   AgeRange,
}

impl Default for Catalog {
  fn default() -> Self {
    Self {
      levels: ChoiceSet::numbered("Level", 6),
      rooms:  ChoiceSet::numbered("Room", 6),
      ages:   AgeRange::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_catalog_has_six_levels_and_rooms() {
    let catalog = Catalog::default();
    assert_eq!(catalog.levels.len(), 6);
    assert_eq!(catalog.rooms.len(), 6);
    assert_eq!(catalog.levels.label("3"), Some("Level 3"));
    assert_eq!(catalog.rooms.label("6"), Some("Room 6"));
    assert!(!catalog.levels.contains("7"));
  }

  #[test]
  fn duplicate_codes_are_rejected() {
    let err = ChoiceSet::new(vec![Choice::new("1", "A"), Choice::new("1", "B")]);
    assert!(matches!(err, Err(Error::Config(_))));
  }

  #[test]
  fn empty_set_is_rejected() {
    assert!(ChoiceSet::new(vec![]).is_err());
  }

  #[test]
  fn deserialises_from_a_plain_list() {
    let set: ChoiceSet = serde_json::from_str(
      r#"[{"code":"K","label":"Kindergarten"},{"code":"1","label":"Level 1"}]"#,
    )
    .unwrap();
    assert_eq!(set.codes().collect::<Vec<_>>(), ["K", "1"]);
  }

  #[test]
  fn age_range_is_inclusive_and_non_empty() {
    let ages = AgeRange::default();
    assert!(ages.contains(3) && ages.contains(25));
    assert!(!ages.contains(2) && !ages.contains(26));
    assert!(AgeRange::new(10, 9).is_err());
    assert!(serde_json::from_str::<AgeRange>("[12, 4]").is_err());
  }

  #[test]
  fn deserialising_rejects_duplicates() {
    let res: std::result::Result<ChoiceSet, _> =
      serde_json::from_str(r#"[{"code":"1","label":"a"},{"code":"1","label":"b"}]"#);
    assert!(res.is_err());
  }
}
