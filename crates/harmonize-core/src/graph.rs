//! Dependency graph and processing order.
//!
//! An edge `A -> B` means "A is processed after B". Edges come from
//! `depends_on`, foreign key targets, `exists_in` filters and entity sources.
//! The order is Kahn's algorithm with ties broken by declaration index, so the
//! same configuration always yields the same order.

use std::collections::{BTreeMap, BTreeSet};

use harmonize_model::EntityDescriptor;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("entity {entity} is declared more than once")]
    DuplicateEntity { entity: String },
    #[error("entity {entity}: {field} references unknown entity {target}")]
    UnknownReference {
        entity: String,
        field: &'static str,
        target: String,
    },
    #[error("dependency cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// A validated processing order over a set of entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessState {
    order: Vec<String>,
    dependencies: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl ProcessState {
    /// Validates the graph and computes the processing order.
    ///
    /// A cycle rejects the whole graph; no partial order is returned.
    pub fn build(entities: &[EntityDescriptor]) -> Result<Self, GraphError> {
        let mut index: BTreeMap<&str, usize> = BTreeMap::new();
        for (idx, entity) in entities.iter().enumerate() {
            if index.insert(entity.name.as_str(), idx).is_some() {
                return Err(GraphError::DuplicateEntity {
                    entity: entity.name.clone(),
                });
            }
        }

        let mut deps: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); entities.len()];
        let mut dependencies = BTreeMap::new();
        for (idx, entity) in entities.iter().enumerate() {
            let mut named: Vec<String> = Vec::new();
            for reference in entity.references() {
                let Some(&target) = index.get(reference.target) else {
                    return Err(GraphError::UnknownReference {
                        entity: entity.name.clone(),
                        field: reference.kind.field(),
                        target: reference.target.to_string(),
                    });
                };
                if deps[idx].insert(target) {
                    named.push(reference.target.to_string());
                }
            }
            dependencies.insert(entity.name.clone(), named);
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); entities.len()];
        for (idx, targets) in deps.iter().enumerate() {
            for &target in targets {
                dependents[target].push(idx);
            }
        }
        let mut remaining: Vec<usize> = deps.iter().map(BTreeSet::len).collect();
        let mut ready: BTreeSet<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(idx, _)| idx)
            .collect();

        let mut order = Vec::with_capacity(entities.len());
        while let Some(idx) = ready.pop_first() {
            order.push(idx);
            for &dependent in &dependents[idx] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() < entities.len() {
            let mut marks = vec![Mark::Unvisited; entities.len()];
            for &idx in &order {
                marks[idx] = Mark::Done;
            }
            let path = find_cycle(&deps, &mut marks)
                .map(|path| {
                    path.into_iter()
                        .map(|idx| entities[idx].name.clone())
                        .collect()
                })
                .unwrap_or_else(|| {
                    (0..entities.len())
                        .filter(|idx| !order.contains(idx))
                        .map(|idx| entities[idx].name.clone())
                        .collect()
                });
            return Err(GraphError::Cycle { path });
        }

        Ok(Self {
            order: order
                .into_iter()
                .map(|idx| entities[idx].name.clone())
                .collect(),
            dependencies,
        })
    }

    /// Entity names in processing order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Distinct entities `entity` must be processed after, in reference order.
    pub fn dependencies(&self, entity: &str) -> &[String] {
        self.dependencies
            .get(entity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Position of `entity` in the processing order.
    pub fn position(&self, entity: &str) -> Option<usize> {
        self.order.iter().position(|name| name == entity)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Three-colour DFS over the nodes Kahn's algorithm could not place.
///
/// Returns the cycle as `[n0, n1, ..., n0]`.
fn find_cycle(deps: &[BTreeSet<usize>], marks: &mut [Mark]) -> Option<Vec<usize>> {
    let mut stack = Vec::new();
    for start in 0..deps.len() {
        if marks[start] == Mark::Unvisited
            && let Some(path) = visit(start, deps, marks, &mut stack)
        {
            return Some(path);
        }
    }
    None
}

fn visit(
    node: usize,
    deps: &[BTreeSet<usize>],
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    marks[node] = Mark::InProgress;
    stack.push(node);
    for &next in &deps[node] {
        match marks[next] {
            Mark::InProgress => {
                let start = stack.iter().position(|&idx| idx == next)?;
                let mut path = stack[start..].to_vec();
                path.push(next);
                return Some(path);
            }
            Mark::Unvisited => {
                if let Some(path) = visit(next, deps, marks, stack) {
                    return Some(path);
                }
            }
            Mark::Done => {}
        }
    }
    stack.pop();
    marks[node] = Mark::Done;
    None
}
