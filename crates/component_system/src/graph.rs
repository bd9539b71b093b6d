//! # Dependency Graph
//!
//! Directed graph over registered components where an edge `A -> B` means
//! "B depends on A". Cycles are found with a depth-first search that keeps a
//! recursion stack; the initialization order comes from Kahn's algorithm,
//! breaking ties by `(priority, registration sequence)`, lowest first.

use crate::error::LifecycleError;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, Clone)]
struct Node {
    name: String,
    priority: i32,
    sequence: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
    /// `dependents[a]` lists every node that depends on `a`.
    dependents: Vec<Vec<usize>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its index.
    pub fn add_node(&mut self, name: impl Into<String>, priority: i32, sequence: usize) -> usize {
        self.nodes.push(Node {
            name: name.into(),
            priority,
            sequence,
        });
        self.dependents.push(Vec::new());
        self.nodes.len() - 1
    }

    /// Records that `dependent` must start after `dependency`.
    pub fn add_edge(&mut self, dependency: usize, dependent: usize) {
        if !self.dependents[dependency].contains(&dependent) {
            self.dependents[dependency].push(dependent);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, index: usize) -> &str {
        &self.nodes[index].name
    }

    /// Returns the first cycle found as a closed path of names, e.g. `[a, b, a]`.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut stack = Vec::new();

        for start in 0..self.nodes.len() {
            if marks[start] == Mark::Unvisited {
                if let Some(cycle) = self.visit(start, &mut marks, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn visit(&self, node: usize, marks: &mut [Mark], stack: &mut Vec<usize>) -> Option<Vec<String>> {
        marks[node] = Mark::OnStack;
        stack.push(node);

        for &next in &self.dependents[node] {
            match marks[next] {
                Mark::OnStack => {
                    let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle: Vec<String> = stack[start..]
                        .iter()
                        .map(|&n| self.nodes[n].name.clone())
                        .collect();
                    cycle.push(self.nodes[next].name.clone());
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    if let Some(cycle) = self.visit(next, marks, stack) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }

        stack.pop();
        marks[node] = Mark::Done;
        None
    }

    /// Computes the initialization order as node indices.
    ///
    /// Fails with `CircularDependency` when a cycle exists and with
    /// `UnresolvedOrdering` if Kahn's algorithm cannot place every node.
    pub fn initialization_order(&self) -> Result<Vec<usize>, LifecycleError> {
        if let Some(cycle) = self.find_cycle() {
            return Err(LifecycleError::CircularDependency { cycle });
        }

        let mut in_degree = vec![0usize; self.nodes.len()];
        for targets in &self.dependents {
            for &target in targets {
                in_degree[target] += 1;
            }
        }

        let key = |index: usize| {
            let node = &self.nodes[index];
            Reverse((node.priority, node.sequence, index))
        };

        let mut ready: BinaryHeap<_> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| key(index))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse((_, _, index))) = ready.pop() {
            order.push(index);
            for &next in &self.dependents[index] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(key(next));
                }
            }
        }

        if order.len() != self.nodes.len() {
            let remaining = (0..self.nodes.len())
                .filter(|index| !order.contains(index))
                .map(|index| self.nodes[index].name.clone())
                .collect();
            return Err(LifecycleError::UnresolvedOrdering { remaining });
        }

        Ok(order)
    }
}
