//! The `LineageStore` trait and the in-memory [`MemoryStore`].
//!
//! Every record enters through [`Schema::validate`]. Loads are
//! all-or-nothing; cross-record references are checked afterwards by
//! [`MemoryStore::check_integrity`], so records may be loaded in any order.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
  Error, Result,
  error::Referrer,
  graph::ParentageGraph,
  record::{Event, Person, Record, RecordKind, Source},
  schema::Schema,
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Read-only view of a loaded record set.
///
/// The analyses depend on this abstraction rather than on [`MemoryStore`].
/// Slices are in insertion order.
pub trait LineageStore {
  fn persons(&self) -> &[Person];

  fn events(&self) -> &[Event];

  fn sources(&self) -> &[Source];

  /// Look up a person by id; [`Error::NotFound`] if absent.
  fn person(&self, id: &str) -> Result<&Person>;

  fn event(&self, id: &str) -> Result<&Event>;

  fn source(&self, id: &str) -> Result<&Source>;
}

// ─── Table ───────────────────────────────────────────────────────────────────

/// Records of one kind in insertion order, indexed by id.
#[derive(Debug, Clone)]
struct Table<T> {
  rows:  Vec<T>,
  index: HashMap<String, usize>,
}

impl<T> Default for Table<T> {
  fn default() -> Self {
    Self {
      rows:  Vec::new(),
      index: HashMap::new(),
    }
  }
}

impl<T: Record> Table<T> {
  fn get(&self, id: &str) -> Result<&T> {
    self
      .index
      .get(id)
      .map(|&i| &self.rows[i])
      .ok_or_else(|| Error::not_found(T::KIND, id))
  }

  fn contains(&self, id: &str) -> bool { self.index.contains_key(id) }

  /// Validate and decode `candidate` without adding it.
  fn admit(&self, candidate: Value) -> Result<T> {
    let mut candidate = Schema::for_kind(T::KIND).validate(candidate)?;
    // null means absent; strip it so serde defaults apply
    if let Value::Object(fields) = &mut candidate {
      fields.retain(|_, value| !value.is_null());
    }
    let record: T = serde_json::from_value(candidate)?;
    if self.contains(record.id()) {
      return Err(Error::DuplicateId {
        kind: T::KIND,
        id:   record.id().to_owned(),
      });
    }
    Ok(record)
  }

  fn push(&mut self, record: T) {
    self.index.insert(record.id().to_owned(), self.rows.len());
    self.rows.push(record);
  }

  fn insert(&mut self, candidate: Value) -> Result<()> {
    let record = self.admit(candidate).inspect_err(|e| {
      warn!(kind = %T::KIND, error = %e, "record rejected");
    })?;
    debug!(kind = %T::KIND, id = record.id(), "record inserted");
    self.push(record);
    Ok(())
  }

  fn load<I>(&mut self, candidates: I) -> Result<usize>
  where
    I: IntoIterator<Item = Value>,
  {
    let mut staged: Vec<T> = Vec::new();
    let mut staged_ids: HashSet<String> = HashSet::new();

    for (index, candidate) in candidates.into_iter().enumerate() {
      let admitted = self.admit(candidate).and_then(|record| {
        if staged_ids.insert(record.id().to_owned()) {
          Ok(record)
        } else {
          Err(Error::DuplicateId {
            kind: T::KIND,
            id:   record.id().to_owned(),
          })
        }
      });

      match admitted {
        Ok(record) => staged.push(record),
        Err(reason) => {
          warn!(kind = %T::KIND, index, error = %reason, "load aborted");
          return Err(Error::LoadFailed {
            kind: T::KIND,
            index,
            reason: Box::new(reason),
          });
        }
      }
    }

    let count = staged.len();
    for record in staged {
      self.push(record);
    }
    debug!(kind = %T::KIND, count, "records loaded");
    Ok(count)
  }
}

// ─── MemoryStore ─────────────────────────────────────────────────────────────

/// Record counts per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Counts {
  pub persons: usize,
  pub events:  usize,
  pub sources: usize,
}

/// An in-memory record set. Records are never modified once inserted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  persons: Table<Person>,
  events:  Table<Event>,
  sources: Table<Source>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Validate `candidate` against the schema for `kind` and add it.
  ///
  /// Fails with [`Error::SchemaViolation`] or [`Error::DuplicateId`]; the
  /// store is unchanged on failure.
  pub fn insert(&mut self, kind: RecordKind, candidate: Value) -> Result<()> {
    match kind {
      RecordKind::Person => self.persons.insert(candidate),
      RecordKind::Event => self.events.insert(candidate),
      RecordKind::Source => self.sources.insert(candidate),
    }
  }

  /// Insert a batch of candidates of one kind, all or nothing.
  ///
  /// The first failing candidate aborts the load with
  /// [`Error::LoadFailed`] carrying its position and the underlying reason;
  /// none of the batch is committed. Returns the number of records added.
  pub fn load<I>(&mut self, kind: RecordKind, candidates: I) -> Result<usize>
  where
    I: IntoIterator<Item = Value>,
  {
    match kind {
      RecordKind::Person => self.persons.load(candidates),
      RecordKind::Event => self.events.load(candidates),
      RecordKind::Source => self.sources.load(candidates),
    }
  }

  pub fn counts(&self) -> Counts {
    Counts {
      persons: self.persons.rows.len(),
      events:  self.events.rows.len(),
      sources: self.sources.rows.len(),
    }
  }

  /// Build the parent → child adjacency over the current contents.
  pub fn parentage(&self) -> ParentageGraph<'_> { ParentageGraph::build(self) }

  /// Check that every cross-record reference resolves and that parentage is
  /// acyclic.
  ///
  /// Run once all kinds are loaded. Reports the first problem found, walking
  /// people, then events, in insertion order.
  pub fn check_integrity(&self) -> Result<()> {
    let result = self.find_broken_reference().map_or(Ok(()), Err).and_then(
      |()| match self.parentage().find_cycle() {
        Some(path) => Err(Error::CyclicParentage {
          path: path.into_iter().map(str::to_owned).collect(),
        }),
        None => Ok(()),
      },
    );

    match &result {
      Ok(()) => debug!(counts = ?self.counts(), "integrity check passed"),
      Err(e) => warn!(error = %e, "integrity check failed"),
    }
    result
  }

  fn find_broken_reference(&self) -> Option<Error> {
    let missing = |kind, id: &str, referrer: Referrer| Error::NotFound {
      kind,
      id: id.to_owned(),
      referrer: Some(referrer),
    };

    for person in &self.persons.rows {
      for (role, parent_id) in person.parents() {
        if !self.persons.contains(parent_id) {
          return Some(missing(RecordKind::Person, parent_id, Referrer {
            kind:  RecordKind::Person,
            id:    person.id.clone(),
            field: role.field(),
          }));
        }
      }
      if let Some(source_id) =
        person.source_ids.iter().find(|s| !self.sources.contains(s))
      {
        return Some(missing(RecordKind::Source, source_id, Referrer {
          kind:  RecordKind::Person,
          id:    person.id.clone(),
          field: "source_ids",
        }));
      }
    }

    for event in &self.events.rows {
      if let Some(person_id) =
        event.who.iter().find(|p| !self.persons.contains(p))
      {
        return Some(missing(RecordKind::Person, person_id, Referrer {
          kind:  RecordKind::Event,
          id:    event.id.clone(),
          field: "who",
        }));
      }
      if let Some(source_id) =
        event.source_ids.iter().find(|s| !self.sources.contains(s))
      {
        return Some(missing(RecordKind::Source, source_id, Referrer {
          kind:  RecordKind::Event,
          id:    event.id.clone(),
          field: "source_ids",
        }));
      }
    }

    None
  }
}

impl LineageStore for MemoryStore {
  fn persons(&self) -> &[Person] { &self.persons.rows }

  fn events(&self) -> &[Event] { &self.events.rows }

  fn sources(&self) -> &[Source] { &self.sources.rows }

  fn person(&self, id: &str) -> Result<&Person> { self.persons.get(id) }

  fn event(&self, id: &str) -> Result<&Event> { self.events.get(id) }

  fn source(&self, id: &str) -> Result<&Source> { self.sources.get(id) }
}
