//! Error types for `kindred-core`.

use std::fmt;

use thiserror::Error;

use crate::{record::RecordKind, schema::Violation};

/// The record and field holding a reference that failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referrer {
  pub kind:  RecordKind,
  pub id:    String,
  pub field: &'static str,
}

impl fmt::Display for Referrer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} `{}` field `{}`", self.kind, self.id, self.field)
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(
    "{kind} record{} violates its schema: {}",
    id_suffix(.id),
    join_violations(.violations)
  )]
  SchemaViolation {
    kind:       RecordKind,
    id:         Option<String>,
    violations: Vec<Violation>,
  },

  #[error("duplicate {kind} id: {id}")]
  DuplicateId { kind: RecordKind, id: String },

  #[error("{kind} not found: {id}{}", referrer_suffix(.referrer))]
  NotFound {
    kind:     RecordKind,
    id:       String,
    referrer: Option<Referrer>,
  },

  #[error("loading {kind} records failed at index {index}: {reason}")]
  LoadFailed {
    kind:   RecordKind,
    index:  usize,
    #[source]
    reason: Box<Error>,
  },

  #[error("cyclic parentage: {}", .path.join(" -> "))]
  CyclicParentage { path: Vec<String> },

  #[error("record decoding error: {0}")]
  Decode(#[from] serde_json::Error),
}

impl Error {
  /// Shorthand for a lookup miss with no referring record.
  pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
    Self::NotFound {
      kind,
      id: id.into(),
      referrer: None,
    }
  }

  /// The schema violations carried by this error, looking through
  /// [`Error::LoadFailed`].
  pub fn violations(&self) -> &[Violation] {
    match self {
      Self::SchemaViolation { violations, .. } => violations,
      Self::LoadFailed { reason, .. } => reason.violations(),
      _ => &[],
    }
  }
}

fn id_suffix(id: &Option<String>) -> String {
  id.as_deref().map(|id| format!(" `{id}`")).unwrap_or_default()
}

fn referrer_suffix(referrer: &Option<Referrer>) -> String {
  referrer
    .as_ref()
    .map(|r| format!(" (referenced by {r})"))
    .unwrap_or_default()
}

fn join_violations(violations: &[Violation]) -> String {
  violations
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("; ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
