// Copyright 2025 the Armature Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A generic directed graph with adjacency in both directions.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

/// A directed graph over copyable vertex ids.
///
/// Adjacency is tracked in both directions so that children
/// ([`adjacents_from`](Self::adjacents_from)) and parents
/// ([`adjacents_to`](Self::adjacents_to)) can each be enumerated without
/// scanning the whole edge set. Neighbor sets are ordered, which keeps
/// traversal results deterministic for a given graph.
#[derive(Debug, Clone)]
pub struct DirectedGraph<T> {
    /// Every vertex currently in the graph.
    vertices: BTreeSet<T>,
    /// Outgoing adjacency: maps a vertex to the set of its direct successors.
    edges_out: HashMap<T, BTreeSet<T>>,
    /// Incoming adjacency: maps a vertex to the set of its direct predecessors.
    edges_in: HashMap<T, BTreeSet<T>>,
}

impl<T: Copy + Eq + Hash + Ord> DirectedGraph<T> {
    /// Creates a new, empty graph.
    pub fn new() -> Self {
        Self {
            vertices: BTreeSet::new(),
            edges_out: HashMap::new(),
            edges_in: HashMap::new(),
        }
    }

    /// Adds a vertex. Returns `false` if it was already present.
    pub fn add_vertex(&mut self, vertex: T) -> bool {
        self.vertices.insert(vertex)
    }

    /// Removes a vertex together with all its incident edges.
    ///
    /// Returns `false` if the vertex was not in the graph.
    pub fn remove_vertex(&mut self, vertex: T) -> bool {
        if !self.vertices.remove(&vertex) {
            return false;
        }

        if let Some(successors) = self.edges_out.remove(&vertex) {
            for successor in successors {
                if let Some(predecessors) = self.edges_in.get_mut(&successor) {
                    predecessors.remove(&vertex);
                    if predecessors.is_empty() {
                        self.edges_in.remove(&successor);
                    }
                }
            }
        }

        if let Some(predecessors) = self.edges_in.remove(&vertex) {
            for predecessor in predecessors {
                if let Some(successors) = self.edges_out.get_mut(&predecessor) {
                    successors.remove(&vertex);
                    if successors.is_empty() {
                        self.edges_out.remove(&predecessor);
                    }
                }
            }
        }

        true
    }

    /// Checks whether a vertex is in the graph.
    pub fn contains(&self, vertex: T) -> bool {
        self.vertices.contains(&vertex)
    }

    /// Adds a directed edge `from -> to`.
    ///
    /// Both endpoints must already be vertices; edge creation fails otherwise,
    /// and duplicate edges are refused. Returns whether the edge was created.
    pub fn add_edge(&mut self, from: T, to: T) -> bool {
        if !self.vertices.contains(&from) || !self.vertices.contains(&to) {
            return false;
        }

        let inserted = self.edges_out.entry(from).or_default().insert(to);
        if inserted {
            self.edges_in.entry(to).or_default().insert(from);
        }
        inserted
    }

    /// Removes the directed edge `from -> to`, if present.
    pub fn remove_edge(&mut self, from: T, to: T) -> bool {
        let Some(successors) = self.edges_out.get_mut(&from) else {
            return false;
        };
        if !successors.remove(&to) {
            return false;
        }
        if successors.is_empty() {
            self.edges_out.remove(&from);
        }

        if let Some(predecessors) = self.edges_in.get_mut(&to) {
            predecessors.remove(&from);
            if predecessors.is_empty() {
                self.edges_in.remove(&to);
            }
        }

        true
    }

    /// Checks whether the directed edge `from -> to` exists.
    pub fn has_edge(&self, from: T, to: T) -> bool {
        self.edges_out
            .get(&from)
            .is_some_and(|successors| successors.contains(&to))
    }

    /// Returns the number of vertices in the graph.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns an iterator over every vertex, in id order.
    pub fn vertices(&self) -> impl Iterator<Item = T> + '_ {
        self.vertices.iter().copied()
    }

    /// Returns an iterator over the direct successors of `vertex`.
    pub fn adjacents_from(&self, vertex: T) -> impl Iterator<Item = T> + '_ {
        self.edges_out.get(&vertex).into_iter().flatten().copied()
    }

    /// Returns an iterator over the direct predecessors of `vertex`.
    pub fn adjacents_to(&self, vertex: T) -> impl Iterator<Item = T> + '_ {
        self.edges_in.get(&vertex).into_iter().flatten().copied()
    }

    /// Performs a breadth-first traversal starting at `root`.
    ///
    /// Yields the root first, followed by its descendants in breadth-first
    /// order. Returns an empty vector when the root is not a vertex of the
    /// graph. Cycles are tolerated: every reachable vertex appears exactly
    /// once.
    pub fn breadth_first_sort(&self, root: T) -> Vec<T> {
        if !self.vertices.contains(&root) {
            return Vec::new();
        }

        let mut visited: HashSet<T> = HashSet::new();
        visited.insert(root);
        let mut queue: VecDeque<T> = VecDeque::new();
        queue.push_back(root);
        let mut sorted = Vec::new();

        while let Some(vertex) = queue.pop_front() {
            sorted.push(vertex);
            for successor in self.adjacents_from(vertex) {
                if visited.insert(successor) {
                    queue.push_back(successor);
                }
            }
        }

        sorted
    }
}

impl<T: Copy + Eq + Hash + Ord> Default for DirectedGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}
