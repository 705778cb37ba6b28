//! Component dependency graph.
//!
//! The graph is an ordered list of components, each with an ordered list of
//! the components it calls. Order is significant: it drives composition and
//! injection order, so it is kept as declared rather than recovered from a
//! map. Lookups by name go through a separate index built from that list.
//!
//! Dependencies are resolved one level deep only. A dependency's own
//! dependencies are never stubbed or injected on behalf of its callers, which
//! is why cycles spanning several components are accepted here.

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::algo::condensation;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::error::ConfigError;

/// A component and the components it calls, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentSpec {
  pub name: String,
  pub dependencies: Vec<String>,
}

impl ComponentSpec {
  pub fn new<I, S>(name: impl Into<String>, dependencies: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      name: name.into(),
      dependencies: dependencies.into_iter().map(Into::into).collect(),
    }
  }
}

/// Validated, read-only dependency graph.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
  components: Vec<ComponentSpec>,
  index: HashMap<String, usize>,
}

impl DependencyGraph {
  /// Build a graph from declared components.
  ///
  /// # Errors
  ///
  /// Rejects empty or duplicate names, names that are not a single path
  /// segment, self dependencies, repeated
  /// dependencies and dependencies on undeclared components.
  pub fn new(components: Vec<ComponentSpec>) -> Result<Self, ConfigError> {
    let mut index = HashMap::with_capacity(components.len());

    for (position, component) in components.iter().enumerate() {
      if component.name.is_empty() {
        return Err(ConfigError::EmptyName);
      }
      if !is_path_segment(&component.name) {
        return Err(ConfigError::InvalidName(component.name.clone()));
      }
      if index.insert(component.name.clone(), position).is_some() {
        return Err(ConfigError::DuplicateComponent(component.name.clone()));
      }
    }

    for component in &components {
      let mut seen = BTreeSet::new();
      for dependency in &component.dependencies {
        if *dependency == component.name {
          return Err(ConfigError::SelfDependency(component.name.clone()));
        }
        if !seen.insert(dependency.as_str()) {
          return Err(ConfigError::DuplicateDependency {
            component: component.name.clone(),
            dependency: dependency.clone(),
          });
        }
        if !index.contains_key(dependency) {
          return Err(ConfigError::UnknownDependency {
            component: component.name.clone(),
            dependency: dependency.clone(),
          });
        }
      }
    }

    Ok(Self { components, index })
  }

  /// Components in declared order.
  pub fn components(&self) -> &[ComponentSpec] {
    &self.components
  }

  pub fn contains(&self, name: &str) -> bool {
    self.index.contains_key(name)
  }

  pub fn is_empty(&self) -> bool {
    self.components.is_empty()
  }

  /// Ordered dependencies of `name`, or `None` for an unknown component.
  pub fn dependencies(&self, name: &str) -> Option<&[String]> {
    self
      .index
      .get(name)
      .map(|&position| self.components[position].dependencies.as_slice())
  }

  /// Every component name, sorted lexicographically.
  pub fn all_components(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.components.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    names
  }

  /// Components that some other component depends on, sorted and deduplicated.
  ///
  /// Exactly these components get a stub. A component nobody calls never gets
  /// one, whatever its own dependencies are.
  pub fn stub_needed(&self) -> Vec<&str> {
    let needed: BTreeSet<&str> = self
      .components
      .iter()
      .flat_map(|c| c.dependencies.iter().map(String::as_str))
      .collect();
    needed.into_iter().collect()
  }

  /// Every (consumer, dependency) edge.
  ///
  /// Consumers come in lexicographic order, each consumer's dependencies in
  /// declared order.
  pub fn edges(&self) -> Vec<(&str, &str)> {
    self
      .all_components()
      .into_iter()
      .flat_map(|consumer| {
        self
          .dependencies(consumer)
          .unwrap_or_default()
          .iter()
          .map(move |dependency| (consumer, dependency.as_str()))
      })
      .collect()
  }

  /// Group components into waves that may be built concurrently.
  ///
  /// A component lands in a later wave than all of its dependencies. Members
  /// of a dependency cycle share a wave. Names inside a wave are sorted.
  pub fn build_waves(&self) -> Vec<Vec<String>> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = self
      .components
      .iter()
      .map(|c| graph.add_node(c.name.clone()))
      .collect();

    // Edge from dependency to dependent
    for (position, component) in self.components.iter().enumerate() {
      for dependency in &component.dependencies {
        let dependency_node = nodes[self.index[dependency]];
        graph.add_edge(dependency_node, nodes[position], ());
      }
    }

    let condensed = condensation(graph, true);

    let mut in_degree: HashMap<NodeIndex, usize> = condensed
      .node_indices()
      .map(|idx| (idx, condensed.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();

    let mut remaining: Vec<NodeIndex> = condensed.node_indices().collect();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
      let (ready, blocked): (Vec<NodeIndex>, Vec<NodeIndex>) =
        remaining.into_iter().partition(|idx| in_degree[idx] == 0);

      if ready.is_empty() {
        break;
      }

      let mut wave = Vec::new();
      for idx in &ready {
        wave.extend(condensed[*idx].iter().cloned());
        for neighbor in condensed.neighbors_directed(*idx, Direction::Outgoing) {
          if let Some(degree) = in_degree.get_mut(&neighbor) {
            *degree = degree.saturating_sub(1);
          }
        }
      }
      wave.sort_unstable();
      waves.push(wave);

      remaining = blocked;
    }

    waves
  }
}

/// Component names become directory and file names.
fn is_path_segment(name: &str) -> bool {
  !name.contains(['/', '\\']) && name != "." && name != ".."
}
