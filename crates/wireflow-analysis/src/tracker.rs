// Copyright 2025 DataStax Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

use std::{collections::HashMap, sync::Arc};

use bit_set::BitSet;
use wireflow_core::workflow::Graph;

/// Step-to-step dependencies of a compiled graph.
///
/// Built from the edge list, tolerating malformed input: unknown endpoints are
/// ignored here (structure validation reports them) and self-edges surface as
/// single-step cycles.
#[derive(Debug)]
pub struct Dependencies {
    /// Step ids, in declaration order.
    step_names: Vec<String>,
    /// For each step, a bitset of the steps that depend on it.
    step_dependents: Vec<BitSet>,
    /// For each step, a bitset of the steps that it depends on.
    step_dependencies: Vec<BitSet>,
}

impl Dependencies {
    /// Extract the dependency relation from a graph's edges.
    pub fn from_graph(graph: &Graph) -> Arc<Self> {
        let len = graph.steps.len();
        let index: HashMap<&str, usize> = graph
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.as_str(), i))
            .collect();

        let mut step_dependents = vec![BitSet::with_capacity(len); len];
        let mut step_dependencies = vec![BitSet::with_capacity(len); len];
        for edge in &graph.edges {
            let Some(producer) = edge.from.step_id().and_then(|id| index.get(id)) else {
                continue;
            };
            let Some(consumer) = index.get(edge.to.step.as_str()) else {
                continue;
            };
            if step_dependencies[*consumer].insert(*producer) {
                step_dependents[*producer].insert(*consumer);
            }
        }

        Arc::new(Dependencies {
            step_names: graph.steps.iter().map(|s| s.id.clone()).collect(),
            step_dependents,
            step_dependencies,
        })
    }

    /// The number of steps.
    pub fn len(&self) -> usize {
        self.step_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.step_names.is_empty()
    }

    /// Return the name of the given step.
    pub fn step_name(&self, step: usize) -> &str {
        &self.step_names[step]
    }

    /// A topological order of the steps, or the ids of the steps stuck on a
    /// cycle.
    pub fn topological_order(self: Arc<Self>) -> Result<Vec<usize>, Vec<String>> {
        let mut tracker = DependencyTracker::new(self.clone());
        let mut order = Vec::with_capacity(self.len());
        let mut ready: Vec<usize> = tracker.unblocked_steps().iter().collect();
        while let Some(step) = ready.pop() {
            order.push(step);
            let unblocked = tracker.complete_step(step);
            ready.extend(unblocked.iter());
        }
        if order.len() == self.len() {
            // Report in declaration order regardless of completion order.
            order.sort_unstable();
            Ok(order)
        } else {
            let completed: BitSet = order.iter().copied().collect();
            let stuck = (0..self.len())
                .filter(|step| !completed.contains(*step))
                .map(|step| self.step_names[step].clone())
                .collect();
            Err(stuck)
        }
    }
}

/// Tracks which steps become runnable as their dependencies complete.
///
/// Used for cycle detection at validation time and by executors to drive
/// steps in dependency order.
pub struct DependencyTracker {
    dependencies: Arc<Dependencies>,
    /// For each step, the count of remaining dependencies.
    blocking: Vec<usize>,
    /// For each step, whether it has been completed.
    completed: BitSet,
}

impl DependencyTracker {
    pub fn new(dependencies: Arc<Dependencies>) -> Self {
        let blocking = dependencies
            .step_dependencies
            .iter()
            .map(|d| d.len())
            .collect();
        let completed = BitSet::with_capacity(dependencies.len());
        Self {
            dependencies,
            blocking,
            completed,
        }
    }

    /// Return the name of the given step.
    pub fn step_name(&self, step: usize) -> &str {
        self.dependencies.step_name(step)
    }

    /// Return the set of all steps that are currently runnable.
    pub fn unblocked_steps(&self) -> BitSet {
        let mut unblocked: BitSet = self
            .blocking
            .iter()
            .enumerate()
            .filter(|(_, blocking)| **blocking == 0)
            .map(|(step, _)| step)
            .collect();
        unblocked.difference_with(&self.completed);
        unblocked
    }

    /// Mark the given step as completed.
    ///
    /// Return a set of newly runnable steps.
    pub fn complete_step(&mut self, step: usize) -> BitSet {
        // Record completion. If already completed, return empty set.
        if !self.completed.insert(step) {
            return BitSet::new();
        }

        let mut unblocked = BitSet::with_capacity(self.dependencies.len());
        for dependent in self.dependencies.step_dependents[step].iter() {
            self.blocking[dependent] -= 1;
            if self.blocking[dependent] == 0 && !self.completed.contains(dependent) {
                unblocked.insert(dependent);
            }
        }
        unblocked
    }
}
