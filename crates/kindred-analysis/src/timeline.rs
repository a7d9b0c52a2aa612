//! Ages at events, parent → child birth-year gaps and lifespans.
//!
//! Historical data is often missing a birth date; rows that would need one
//! are omitted rather than reported as errors. Values are raw: nothing here
//! judges whether a gap or age is plausible. [`GapPolicy`] is a helper for
//! callers that want to flag suspect rows.

use kindred_core::{
  record::{EventType, ParentRole},
  store::LineageStore,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Age of one participant at one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeRow {
  pub event_id:   String,
  pub event_type: EventType,
  pub person_id:  String,
  /// Year of the event.
  pub year:       i32,
  pub age:        i32,
}

/// Birth-year gap between a child and one of their parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapRow {
  pub parent_id: String,
  pub child_id:  String,
  pub relation:  ParentRole,
  pub gap:       i32,
}

/// Years between birth and death.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifespanRow {
  pub person_id: String,
  pub born:      i32,
  pub died:      i32,
  pub years:     i32,
}

/// One row per (event, participant) whose birth year is known.
///
/// Participants missing from the store, or without a birth year, are
/// skipped. Rows follow event order, then `who` order.
pub fn compute_ages<S: LineageStore + ?Sized>(store: &S) -> Vec<AgeRow> {
  let mut rows = Vec::new();

  for event in store.events() {
    let year = event.year();
    for person_id in &event.who {
      let Some(born) = store
        .person(person_id)
        .ok()
        .and_then(|p| p.birth_year())
      else {
        trace!(
          event = %event.id,
          person = %person_id,
          "no birth year; skipped"
        );
        continue;
      };

      rows.push(AgeRow {
        event_id: event.id.clone(),
        event_type: event.event_type,
        person_id: person_id.clone(),
        year,
        age: year - born,
      });
    }
  }

  rows
}

/// One row per (child, known parent) where both birth years are known.
///
/// Gaps are returned as computed, including zero and negative ones. Rows
/// follow store order, father before mother.
pub fn intergen_gaps<S: LineageStore + ?Sized>(store: &S) -> Vec<GapRow> {
  let mut rows = Vec::new();

  for child in store.persons() {
    let Some(child_born) = child.birth_year() else {
      continue;
    };
    for (relation, parent_id) in child.parents() {
      let Some(parent_born) = store
        .person(parent_id)
        .ok()
        .and_then(|p| p.birth_year())
      else {
        trace!(
          child = %child.id,
          parent = parent_id,
          "no parent birth year; skipped"
        );
        continue;
      };

      rows.push(GapRow {
        parent_id: parent_id.to_owned(),
        child_id: child.id.clone(),
        relation,
        gap: child_born - parent_born,
      });
    }
  }

  rows
}

/// One row per person whose birth and death years are both known.
pub fn lifespans<S: LineageStore + ?Sized>(store: &S) -> Vec<LifespanRow> {
  store
    .persons()
    .iter()
    .filter_map(|p| {
      let (born, died) = (p.birth_year()?, p.death_year()?);
      Some(LifespanRow {
        person_id: p.id.clone(),
        born,
        died,
        years: died - born,
      })
    })
    .collect()
}

/// Caller-side plausibility bounds for generation gaps, in years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapPolicy {
  pub min: i32,
  pub max: i32,
}

impl Default for GapPolicy {
  fn default() -> Self { Self { min: 12, max: 70 } }
}

impl GapPolicy {
  pub fn is_plausible(&self, gap: i32) -> bool {
    (self.min..=self.max).contains(&gap)
  }
}
