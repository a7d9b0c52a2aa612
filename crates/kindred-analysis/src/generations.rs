//! Generation depth of every descendant of a founder.

use std::collections::{BTreeMap, VecDeque};

use kindred_core::{graph::ParentageGraph, store::LineageStore};
use serde::Serialize;
use tracing::debug;

use crate::{Error, Result};

/// Person id → generation number, founder at 0.
///
/// Entries are kept in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationIndex {
  founder: String,
  entries: Vec<(String, u32)>,
  #[serde(skip)]
  lookup:  BTreeMap<String, u32>,
}

impl GenerationIndex {
  pub fn founder(&self) -> &str { &self.founder }

  pub fn get(&self, id: &str) -> Option<u32> { self.lookup.get(id).copied() }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  /// `(id, generation)` pairs in the order the traversal reached them.
  pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
    self.entries.iter().map(|(id, g)| (id.as_str(), *g))
  }

  /// Deepest generation reached.
  pub fn max_depth(&self) -> u32 {
    self.entries.iter().map(|(_, g)| *g).max().unwrap_or(0)
  }

  pub fn into_map(self) -> BTreeMap<String, u32> { self.lookup }
}

/// Index every person reachable from `founder` along parent → child edges.
///
/// Breadth-first: a person takes the generation of the first parent whose
/// layer reaches them, plus one, and is never reassigned. People not
/// descended from the founder are absent. Parentage cycles cannot cause
/// non-termination since nodes are visited at most once.
pub fn generation_index<S>(store: &S, founder: &str) -> Result<GenerationIndex>
where
  S: LineageStore + ?Sized,
{
  let graph = ParentageGraph::build(store);
  index_graph(&graph, founder)
}

/// As [`generation_index`], over a graph already built by the caller.
pub fn index_graph(
  graph: &ParentageGraph<'_>,
  founder: &str,
) -> Result<GenerationIndex> {
  let root = graph
    .index_of(founder)
    .ok_or_else(|| Error::UnknownFounder(founder.to_owned()))?;

  let mut depth: Vec<Option<u32>> = vec![None; graph.len()];
  let mut frontier: VecDeque<usize> = VecDeque::from([root]);
  let mut entries = vec![(graph.id(root).to_owned(), 0)];
  depth[root] = Some(0);

  while let Some(node) = frontier.pop_front() {
    let next = depth[node].unwrap_or_default() + 1;
    for &child in graph.children(node) {
      if depth[child].is_some() {
        continue;
      }
      depth[child] = Some(next);
      entries.push((graph.id(child).to_owned(), next));
      frontier.push_back(child);
    }
  }

  debug!(founder, reached = entries.len(), "generation index built");

  let lookup = entries.iter().cloned().collect();
  Ok(GenerationIndex {
    founder: founder.to_owned(),
    entries,
    lookup,
  })
}
