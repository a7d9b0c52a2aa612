//! Record types — the three entity kinds held by the store.
//!
//! Records only come into existence by passing a candidate through
//! [`crate::schema::Schema::validate`]; after that they are immutable
//! snapshots.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString, VariantNames};

use crate::date::PartialDate;

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// The entity kind a record (and its schema) belongs to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
  Person,
  Event,
  Source,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sex {
  Female,
  Male,
  Unknown,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventType {
  Birth,
  Death,
  Marriage,
  Divorce,
  Baptism,
  Burial,
  Custom,
}

impl EventType {
  /// Inclusive bounds on the number of people an event of this type names.
  pub fn arity(self) -> (usize, usize) {
    match self {
      Self::Birth | Self::Death | Self::Baptism | Self::Burial => (1, 1),
      Self::Marriage | Self::Divorce => (2, 2),
      Self::Custom => (1, 2),
    }
  }
}

/// Which parent edge a person → parent reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParentRole {
  Father,
  Mother,
}

impl ParentRole {
  /// The record field holding this parent reference.
  pub fn field(self) -> &'static str {
    match self {
      Self::Father => "father_id",
      Self::Mother => "mother_id",
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Shared behaviour of every storable record.
pub trait Record: DeserializeOwned {
  const KIND: RecordKind;

  fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Person {
  pub id:         String,
  pub name:       String,
  pub sex:        Sex,
  pub born:       Option<PartialDate>,
  pub born_place: Option<String>,
  pub died:       Option<PartialDate>,
  pub died_place: Option<String>,
  pub father_id:  Option<String>,
  pub mother_id:  Option<String>,
  pub notes:      Option<String>,
  #[serde(default)]
  pub source_ids: BTreeSet<String>,
}

impl Person {
  /// Known parent references, father first.
  pub fn parents(&self) -> impl Iterator<Item = (ParentRole, &str)> {
    [
      (ParentRole::Father, self.father_id.as_deref()),
      (ParentRole::Mother, self.mother_id.as_deref()),
    ]
    .into_iter()
    .filter_map(|(role, id)| id.map(|id| (role, id)))
  }

  pub fn birth_year(&self) -> Option<i32> { self.born.map(|d| d.year()) }

  pub fn death_year(&self) -> Option<i32> { self.died.map(|d| d.year()) }
}

impl Record for Person {
  const KIND: RecordKind = RecordKind::Person;

  fn id(&self) -> &str { &self.id }
}

fn default_certainty() -> f64 { 1.0 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
  pub id:         String,
  #[serde(rename = "type")]
  pub event_type: EventType,
  pub t:          PartialDate,
  /// One person for unary events, two for binary ones.
  pub who:        Vec<String>,
  pub place:      Option<String>,
  /// Confidence in the record, within `[0, 1]`.
  #[serde(default = "default_certainty")]
  pub certainty:  f64,
  #[serde(default)]
  pub source_ids: BTreeSet<String>,
  pub payload:    Option<serde_json::Value>,
}

impl Event {
  pub fn year(&self) -> i32 { self.t.year() }
}

impl Record for Event {
  const KIND: RecordKind = RecordKind::Event;

  fn id(&self) -> &str { &self.id }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Source {
  pub id:            String,
  pub title:         String,
  pub citation:      Option<String>,
  pub url:           Option<String>,
  pub date_accessed: Option<PartialDate>,
  /// Lowercase hex SHA-256 of the source document.
  pub hash:          Option<String>,
}

impl Source {
  /// Check `content` against the recorded fingerprint.
  ///
  /// Returns `None` when the source carries no fingerprint.
  pub fn verify(&self, content: &[u8]) -> Option<bool> {
    self.hash.as_deref().map(|h| h == fingerprint(content))
  }
}

impl Record for Source {
  const KIND: RecordKind = RecordKind::Source;

  fn id(&self) -> &str { &self.id }
}

/// Lowercase hex SHA-256 digest of `content`, as stored in [`Source::hash`].
pub fn fingerprint(content: &[u8]) -> String {
  hex::encode(Sha256::digest(content))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn arity_by_event_type() {
    assert_eq!(EventType::Death.arity(), (1, 1));
    assert_eq!(EventType::Marriage.arity(), (2, 2));
    assert_eq!(EventType::Custom.arity(), (1, 2));
  }

  #[test]
  fn variant_names_follow_serde_names() {
    assert_eq!(Sex::VARIANTS, &["female", "male", "unknown"]);
    assert_eq!(EventType::VARIANTS[0], "birth");
    assert_eq!(RecordKind::Event.to_string(), "event");
  }

  #[test]
  fn parents_are_listed_father_first() {
    let person = Person {
      id:         "C1".into(),
      name:       "Child".into(),
      sex:        Sex::Unknown,
      born:       None,
      born_place: None,
      died:       None,
      died_place: None,
      father_id:  Some("F".into()),
      mother_id:  Some("M".into()),
      notes:      None,
      source_ids: BTreeSet::new(),
    };
    let parents: Vec<_> = person.parents().collect();
    assert_eq!(
      parents,
      vec![(ParentRole::Father, "F"), (ParentRole::Mother, "M")]
    );
  }

  #[test]
  fn source_verification() {
    let content = b"parish register, folio 12";
    let source = Source {
      id:            "S1".into(),
      title:         "Parish register".into(),
      citation:      None,
      url:           None,
      date_accessed: None,
      hash:          Some(fingerprint(content)),
    };
    assert_eq!(source.verify(content), Some(true));
    assert_eq!(source.verify(b"tampered"), Some(false));

    let unhashed = Source { hash: None, ..source };
    assert_eq!(unhashed.verify(content), None);
  }

  #[test]
  fn fingerprint_is_sha256_hex() {
    assert_eq!(
      fingerprint(b""),
      "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
  }
}
