//! Closed schemas for candidate records.
//!
//! A candidate is a JSON object. Its schema enumerates every permitted field,
//! whether it is required, and the type, pattern, enumerated set or numeric
//! range it must satisfy. Fields not declared by the schema are rejected.

use std::{collections::HashSet, fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde_json::{Map, Value};
use strum::VariantNames;

use crate::{
  Error, Result,
  date::{DATE_PATTERN, DateError, PartialDate},
  record::{EventType, RecordKind, Sex},
};

/// Pattern every record id (and every reference to one) must match.
pub const ID_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9_.:-]*$";

/// Pattern for [`crate::record::Source::hash`].
pub const DIGEST_PATTERN: &str = r"^[0-9a-f]{64}$";

/// Field name used in a [`Violation`] that concerns the record as a whole.
pub const RECORD_FIELD: &str = "<record>";

static ID_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(ID_PATTERN).expect("valid id pattern"));

static DIGEST_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(DIGEST_PATTERN).expect("valid digest pattern"));

// ─── Violations ──────────────────────────────────────────────────────────────

/// The rule a field broke.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
  Missing,
  WrongType { expected: &'static str },
  Empty,
  Pattern { pattern: &'static str },
  InvalidDate,
  NotInSet { allowed: &'static [&'static str] },
  OutOfRange { min: f64, max: f64 },
  Cardinality { min: usize, max: usize, found: usize },
  DuplicateMember { value: String },
  Undeclared,
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Missing => f.write_str("required field is missing"),
      Self::WrongType { expected } => write!(f, "expected {expected}"),
      Self::Empty => f.write_str("must not be empty"),
      Self::Pattern { pattern } => write!(f, "does not match {pattern}"),
      Self::InvalidDate => f.write_str("is not a valid calendar date"),
      Self::NotInSet { allowed } => {
        write!(f, "must be one of {}", allowed.join(", "))
      }
      Self::OutOfRange { min, max } => {
        write!(f, "must be within [{min}, {max}]")
      }
      Self::Cardinality { min, max, found } if min == max => {
        write!(f, "must name exactly {min} entries, found {found}")
      }
      Self::Cardinality { min, max, found } => {
        write!(f, "must name {min} to {max} entries, found {found}")
      }
      Self::DuplicateMember { value } => write!(f, "lists {value:?} twice"),
      Self::Undeclared => f.write_str("is not a declared field"),
    }
  }
}

/// One offending field and the rule it broke.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
  pub field: String,
  pub rule:  Rule,
}

impl Violation {
  pub fn new(field: impl Into<String>, rule: Rule) -> Self {
    Self {
      field: field.into(),
      rule,
    }
  }
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "`{}` {}", self.field, self.rule)
  }
}

// ─── Field declarations ──────────────────────────────────────────────────────

/// The shape a declared field's value must have.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
  /// A string matching [`ID_PATTERN`].
  Id,
  /// Any string.
  Text,
  /// A string with at least one non-whitespace character.
  NonEmptyText,
  /// A string from a closed set.
  Enum(&'static [&'static str]),
  /// A string matching [`DATE_PATTERN`] that names a real calendar date.
  PartialDate,
  /// A finite number within `[0, 1]`.
  Probability,
  /// A string matching [`DIGEST_PATTERN`].
  Digest,
  /// An array of distinct ids with bounded length.
  IdList { min: usize, max: usize },
  /// Arbitrary JSON.
  Json,
}

impl FieldType {
  /// Check `value`, returning the first rule it breaks.
  fn check(self, value: &Value) -> Result<(), Rule> {
    match self {
      Self::Json => Ok(()),
      Self::Id => check_id(value),
      Self::Text => as_str(value).map(drop),
      Self::NonEmptyText => {
        if as_str(value)?.trim().is_empty() {
          Err(Rule::Empty)
        } else {
          Ok(())
        }
      }
      Self::Enum(allowed) => {
        let s = as_str(value)?;
        if allowed.contains(&s) {
          Ok(())
        } else {
          Err(Rule::NotInSet { allowed })
        }
      }
      Self::PartialDate => match PartialDate::from_str(as_str(value)?) {
        Ok(_) => Ok(()),
        Err(DateError::Pattern(_)) => Err(Rule::Pattern {
          pattern: DATE_PATTERN,
        }),
        Err(DateError::Calendar(_)) => Err(Rule::InvalidDate),
      },
      Self::Probability => {
        let n = value
          .as_f64()
          .ok_or(Rule::WrongType { expected: "number" })?;
        if n.is_finite() && (0.0..=1.0).contains(&n) {
          Ok(())
        } else {
          Err(Rule::OutOfRange { min: 0.0, max: 1.0 })
        }
      }
      Self::Digest => {
        if DIGEST_RE.is_match(as_str(value)?) {
          Ok(())
        } else {
          Err(Rule::Pattern {
            pattern: DIGEST_PATTERN,
          })
        }
      }
      Self::IdList { min, max } => {
        let items = value
          .as_array()
          .ok_or(Rule::WrongType { expected: "array" })?;
        let mut seen = HashSet::new();
        for item in items {
          check_id(item)?;
          if let Some(s) = item.as_str()
            && !seen.insert(s)
          {
            return Err(Rule::DuplicateMember { value: s.to_owned() });
          }
        }
        if (min..=max).contains(&items.len()) {
          Ok(())
        } else {
          Err(Rule::Cardinality {
            min,
            max,
            found: items.len(),
          })
        }
      }
    }
  }
}

fn as_str(value: &Value) -> Result<&str, Rule> {
  value.as_str().ok_or(Rule::WrongType { expected: "string" })
}

fn check_id(value: &Value) -> Result<(), Rule> {
  if ID_RE.is_match(as_str(value)?) {
    Ok(())
  } else {
    Err(Rule::Pattern {
      pattern: ID_PATTERN,
    })
  }
}

/// A single declared field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
  pub name:     &'static str,
  pub required: bool,
  pub ty:       FieldType,
}

const fn required(name: &'static str, ty: FieldType) -> FieldSpec {
  FieldSpec {
    name,
    required: true,
    ty,
  }
}

const fn optional(name: &'static str, ty: FieldType) -> FieldSpec {
  FieldSpec {
    name,
    required: false,
    ty,
  }
}

/// Upper bound on `source_ids` entries; generous, only guards against junk.
const MAX_SOURCES: usize = 1024;

const SOURCE_IDS: FieldType = FieldType::IdList {
  min: 0,
  max: MAX_SOURCES,
};

const PERSON_FIELDS: &[FieldSpec] = &[
  required("id", FieldType::Id),
  required("name", FieldType::NonEmptyText),
  required("sex", FieldType::Enum(Sex::VARIANTS)),
  optional("born", FieldType::PartialDate),
  optional("born_place", FieldType::Text),
  optional("died", FieldType::PartialDate),
  optional("died_place", FieldType::Text),
  optional("father_id", FieldType::Id),
  optional("mother_id", FieldType::Id),
  optional("notes", FieldType::Text),
  optional("source_ids", SOURCE_IDS),
];

const EVENT_FIELDS: &[FieldSpec] = &[
  required("id", FieldType::Id),
  required("type", FieldType::Enum(EventType::VARIANTS)),
  required("t", FieldType::PartialDate),
  required("who", FieldType::IdList { min: 1, max: 2 }),
  optional("place", FieldType::Text),
  optional("certainty", FieldType::Probability),
  optional("source_ids", SOURCE_IDS),
  optional("payload", FieldType::Json),
];

const SOURCE_FIELDS: &[FieldSpec] = &[
  required("id", FieldType::Id),
  required("title", FieldType::NonEmptyText),
  optional("citation", FieldType::Text),
  optional("url", FieldType::Text),
  optional("date_accessed", FieldType::PartialDate),
  optional("hash", FieldType::Digest),
];

// ─── Schema ──────────────────────────────────────────────────────────────────

/// The declared, closed shape of one record kind.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
  kind:   RecordKind,
  fields: &'static [FieldSpec],
}

impl Schema {
  pub const fn person() -> Self {
    Self {
      kind:   RecordKind::Person,
      fields: PERSON_FIELDS,
    }
  }

  pub const fn event() -> Self {
    Self {
      kind:   RecordKind::Event,
      fields: EVENT_FIELDS,
    }
  }

  pub const fn source() -> Self {
    Self {
      kind:   RecordKind::Source,
      fields: SOURCE_FIELDS,
    }
  }

  pub const fn for_kind(kind: RecordKind) -> Self {
    match kind {
      RecordKind::Person => Self::person(),
      RecordKind::Event => Self::event(),
      RecordKind::Source => Self::source(),
    }
  }

  pub fn fields(&self) -> &'static [FieldSpec] { self.fields }

  pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
    self.fields.iter().find(|f| f.name == name)
  }

  /// Validate `candidate`, handing it back unchanged on success.
  ///
  /// On failure every offending field is reported, in declaration order,
  /// followed by any undeclared fields.
  pub fn validate(&self, candidate: Value) -> Result<Value> {
    let violations = match candidate.as_object() {
      Some(object) => self.violations(object),
      None => vec![Violation::new(
        RECORD_FIELD,
        Rule::WrongType { expected: "object" },
      )],
    };

    if violations.is_empty() {
      return Ok(candidate);
    }

    let id = candidate
      .get("id")
      .and_then(Value::as_str)
      .map(str::to_owned);
    Err(Error::SchemaViolation {
      kind: self.kind,
      id,
      violations,
    })
  }

  /// All violations in `object`; empty when it conforms.
  pub fn violations(&self, object: &Map<String, Value>) -> Vec<Violation> {
    let mut violations = Vec::new();

    for spec in self.fields {
      match object.get(spec.name) {
        None | Some(Value::Null) if spec.required => {
          violations.push(Violation::new(spec.name, Rule::Missing));
        }
        None | Some(Value::Null) => {}
        Some(value) => {
          if let Err(rule) = spec.ty.check(value) {
            violations.push(Violation::new(spec.name, rule));
          }
        }
      }
    }

    if self.kind == RecordKind::Event
      && !violations.iter().any(|v| v.field == "type" || v.field == "who")
      && let Some(v) = check_who_arity(object)
    {
      violations.push(v);
    }

    violations.extend(
      object
        .keys()
        .filter(|k| self.field(k).is_none())
        .map(|k| Violation::new(k.as_str(), Rule::Undeclared)),
    );

    violations
  }
}

/// `who` must name exactly as many people as the event type takes.
fn check_who_arity(object: &Map<String, Value>) -> Option<Violation> {
  let event_type = object
    .get("type")
    .and_then(Value::as_str)
    .and_then(|s| EventType::from_str(s).ok())?;
  let found = object.get("who").and_then(Value::as_array)?.len();
  let (min, max) = event_type.arity();
  if (min..=max).contains(&found) {
    None
  } else {
    Some(Violation::new("who", Rule::Cardinality { min, max, found }))
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn person() -> Value {
    json!({
      "id": "C1",
      "name": "Anna Berg",
      "sex": "female",
      "born": "1926-07",
      "father_id": "F1",
      "source_ids": ["S1", "S2"],
    })
  }

  fn rules_for<'a>(err: &'a Error, field: &str) -> Vec<&'a Rule> {
    err
      .violations()
      .iter()
      .filter(|v| v.field == field)
      .map(|v| &v.rule)
      .collect()
  }

  #[test]
  fn valid_person_is_returned_unchanged() {
    let candidate = person();
    let validated = Schema::person().validate(candidate.clone()).unwrap();
    assert_eq!(validated, candidate);
  }

  #[test]
  fn validation_is_idempotent() {
    let schema = Schema::person();
    let once = schema.validate(person()).unwrap();
    let twice = schema.validate(once.clone()).unwrap();
    assert_eq!(once, twice);

    let mut bad = person();
    bad["sex"] = json!("other");
    let first = schema.validate(bad.clone()).unwrap_err();
    let second = schema.validate(bad).unwrap_err();
    assert_eq!(first.violations(), second.violations());
  }

  #[test]
  fn missing_id_is_named() {
    let mut candidate = person();
    candidate.as_object_mut().unwrap().remove("id");
    let err = Schema::person().validate(candidate).unwrap_err();
    assert!(matches!(err, Error::SchemaViolation { id: None, .. }));
    assert_eq!(rules_for(&err, "id"), vec![&Rule::Missing]);
  }

  #[test]
  fn null_counts_as_absent() {
    let mut candidate = person();
    candidate["born_place"] = Value::Null;
    assert!(Schema::person().validate(candidate.clone()).is_ok());

    candidate["name"] = Value::Null;
    let err = Schema::person().validate(candidate).unwrap_err();
    assert_eq!(rules_for(&err, "name"), vec![&Rule::Missing]);
  }

  #[test]
  fn undeclared_field_is_rejected() {
    let mut candidate = person();
    candidate["nickname"] = json!("Annie");
    let err = Schema::person().validate(candidate).unwrap_err();
    assert_eq!(rules_for(&err, "nickname"), vec![&Rule::Undeclared]);
  }

  #[test]
  fn every_offending_field_is_reported() {
    let candidate = json!({
      "id": "bad id",
      "name": "  ",
      "sex": "x",
      "born": "1955-13",
    });
    let err = Schema::person().validate(candidate).unwrap_err();
    let fields: Vec<_> =
      err.violations().iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, vec!["id", "name", "sex", "born"]);
    assert_eq!(rules_for(&err, "name"), vec![&Rule::Empty]);
    assert!(matches!(rules_for(&err, "sex")[0], Rule::NotInSet { .. }));
    assert!(matches!(rules_for(&err, "born")[0], Rule::Pattern { .. }));
  }

  #[test]
  fn wrong_types_are_reported() {
    let mut candidate = person();
    candidate["name"] = json!(42);
    candidate["source_ids"] = json!("S1");
    let err = Schema::person().validate(candidate).unwrap_err();
    assert_eq!(
      rules_for(&err, "name"),
      vec![&Rule::WrongType { expected: "string" }]
    );
    assert_eq!(
      rules_for(&err, "source_ids"),
      vec![&Rule::WrongType { expected: "array" }]
    );
  }

  #[test]
  fn duplicate_source_ids_are_rejected() {
    let mut candidate = person();
    candidate["source_ids"] = json!(["S1", "S1"]);
    let err = Schema::person().validate(candidate).unwrap_err();
    assert_eq!(
      rules_for(&err, "source_ids"),
      vec![&Rule::DuplicateMember { value: "S1".into() }]
    );
  }

  #[test]
  fn certainty_must_be_a_probability() {
    let base = json!({ "id": "E1", "type": "death", "t": "1955", "who": ["C1"] });
    assert!(Schema::event().validate(base.clone()).is_ok());

    for (value, expected) in [
      (json!(1.5), Rule::OutOfRange { min: 0.0, max: 1.0 }),
      (json!(-0.1), Rule::OutOfRange { min: 0.0, max: 1.0 }),
      (json!("high"), Rule::WrongType { expected: "number" }),
    ] {
      let mut candidate = base.clone();
      candidate["certainty"] = value;
      let err = Schema::event().validate(candidate).unwrap_err();
      assert_eq!(rules_for(&err, "certainty"), vec![&expected]);
    }
  }

  #[test]
  fn who_arity_follows_event_type() {
    let marriage = json!({
      "id": "E2", "type": "marriage", "t": "1950-06-01", "who": ["A"],
    });
    let err = Schema::event().validate(marriage).unwrap_err();
    assert_eq!(
      rules_for(&err, "who"),
      vec![&Rule::Cardinality { min: 2, max: 2, found: 1 }]
    );

    let custom = json!({
      "id": "E3", "type": "custom", "t": "1950", "who": ["A", "B"],
      "payload": { "label": "emigration" },
    });
    assert!(Schema::event().validate(custom).is_ok());

    let crowded = json!({
      "id": "E4", "type": "custom", "t": "1950", "who": ["A", "B", "C"],
    });
    let err = Schema::event().validate(crowded).unwrap_err();
    assert_eq!(
      rules_for(&err, "who"),
      vec![&Rule::Cardinality { min: 1, max: 2, found: 3 }]
    );
  }

  #[test]
  fn source_hash_must_be_a_digest() {
    let source = json!({ "id": "S1", "title": "Census 1900", "hash": "abc" });
    let err = Schema::source().validate(source).unwrap_err();
    assert!(matches!(rules_for(&err, "hash")[0], Rule::Pattern { .. }));

    let source = json!({
      "id": "S1",
      "title": "Census 1900",
      "date_accessed": "2024-02-30",
    });
    let err = Schema::source().validate(source).unwrap_err();
    assert_eq!(rules_for(&err, "date_accessed"), vec![&Rule::InvalidDate]);
  }

  #[test]
  fn non_object_candidate_is_rejected() {
    let err = Schema::source().validate(json!(["S1"])).unwrap_err();
    assert_eq!(
      rules_for(&err, RECORD_FIELD),
      vec![&Rule::WrongType { expected: "object" }]
    );
  }
}
