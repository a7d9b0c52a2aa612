//! Index-based parent → child adjacency built once from a store.
//!
//! People are numbered in store order; each person owns the list of their
//! children's indices, again in store order. Traversals over the graph are
//! therefore proportional to its size and deterministic.

use std::collections::HashMap;

use crate::store::LineageStore;

#[derive(Debug, Clone)]
pub struct ParentageGraph<'a> {
  ids:      Vec<&'a str>,
  index:    HashMap<&'a str, usize>,
  children: Vec<Vec<usize>>,
}

impl<'a> ParentageGraph<'a> {
  /// Build the graph over every person in `store`.
  ///
  /// References to people absent from the store contribute no edge; the
  /// integrity pass is responsible for reporting them.
  pub fn build<S: LineageStore + ?Sized>(store: &'a S) -> Self {
    let persons = store.persons();
    let ids: Vec<&str> = persons.iter().map(|p| p.id.as_str()).collect();
    let index: HashMap<&str, usize> =
      ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut children = vec![Vec::new(); ids.len()];
    for (child, person) in persons.iter().enumerate() {
      for (_, parent_id) in person.parents() {
        if let Some(&parent) = index.get(parent_id) {
          children[parent].push(child);
        }
      }
    }

    Self {
      ids,
      index,
      children,
    }
  }

  pub fn len(&self) -> usize { self.ids.len() }

  pub fn is_empty(&self) -> bool { self.ids.is_empty() }

  pub fn index_of(&self, id: &str) -> Option<usize> {
    self.index.get(id).copied()
  }

  pub fn id(&self, node: usize) -> &'a str { self.ids[node] }

  pub fn children(&self, node: usize) -> &[usize] { &self.children[node] }

  /// Find one parentage cycle, returned as the ids along it with the first
  /// id repeated at the end. A person listed as their own parent yields
  /// `[id, id]`.
  pub fn find_cycle(&self) -> Option<Vec<&'a str>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
      Unseen,
      OnPath,
      Done,
    }

    let mut marks = vec![Mark::Unseen; self.len()];

    for root in 0..self.len() {
      if marks[root] != Mark::Unseen {
        continue;
      }

      // (node, position of the next child to visit)
      let mut path: Vec<(usize, usize)> = vec![(root, 0)];
      marks[root] = Mark::OnPath;

      while let Some(top) = path.last_mut() {
        let node = top.0;
        let Some(&child) = self.children[node].get(top.1) else {
          marks[node] = Mark::Done;
          path.pop();
          continue;
        };
        top.1 += 1;

        match marks[child] {
          Mark::Unseen => {
            marks[child] = Mark::OnPath;
            path.push((child, 0));
          }
          Mark::OnPath => {
            let start = path.iter().position(|&(n, _)| n == child)?;
            let mut cycle: Vec<&str> =
              path[start..].iter().map(|&(n, _)| self.ids[n]).collect();
            cycle.push(self.ids[child]);
            return Some(cycle);
          }
          Mark::Done => {}
        }
      }
    }

    None
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{record::RecordKind, store::MemoryStore};

  fn store(people: &[(&str, Option<&str>, Option<&str>)]) -> MemoryStore {
    let mut store = MemoryStore::new();
    for (id, father, mother) in people {
      store
        .insert(
          RecordKind::Person,
          json!({
            "id": id,
            "name": id,
            "sex": "unknown",
            "father_id": father,
            "mother_id": mother,
          }),
        )
        .unwrap();
    }
    store
  }

  #[test]
  fn children_follow_store_order() {
    let s = store(&[
      ("B", Some("F"), None),
      ("F", None, None),
      ("A", Some("F"), Some("M")),
      ("M", None, None),
    ]);
    let graph = ParentageGraph::build(&s);
    let f = graph.index_of("F").unwrap();
    let kids: Vec<_> =
      graph.children(f).iter().map(|&c| graph.id(c)).collect();
    assert_eq!(kids, vec!["B", "A"]);

    let m = graph.index_of("M").unwrap();
    assert_eq!(graph.children(m).len(), 1);
  }

  #[test]
  fn dangling_parent_adds_no_edge() {
    let s = store(&[("C", Some("ghost"), None)]);
    let graph = ParentageGraph::build(&s);
    assert_eq!(graph.len(), 1);
    assert!(graph.index_of("ghost").is_none());
    assert!(graph.find_cycle().is_none());
  }

  #[test]
  fn acyclic_graph_has_no_cycle() {
    let s = store(&[
      ("F1", None, None),
      ("C1", Some("F1"), None),
      ("C2", Some("C1"), None),
    ]);
    assert!(ParentageGraph::build(&s).find_cycle().is_none());
  }

  #[test]
  fn finds_two_person_cycle() {
    let s = store(&[("A", Some("B"), None), ("B", Some("A"), None)]);
    let cycle = ParentageGraph::build(&s).find_cycle().unwrap();
    assert_eq!(cycle.len(), 3);
    assert_eq!(cycle.first(), cycle.last());
  }

  #[test]
  fn self_parent_is_a_cycle() {
    let s = store(&[("A", None, Some("A"))]);
    assert_eq!(ParentageGraph::build(&s).find_cycle(), Some(vec!["A", "A"]));
  }
}
