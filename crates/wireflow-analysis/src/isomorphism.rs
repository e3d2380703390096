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

//! Port-labelled graph isomorphism.
//!
//! Two graphs are equivalent when a bijection between their steps preserves
//! step labels (tool, kind, scatter directive, typed port signature) and every
//! edge including its port labels. Step ids are ignored, so graphs produced by
//! inlining the same sub-workflow at different embedding depths compare equal.
//!
//! General graph isomorphism is exponential in the worst case. Every check
//! carries a time budget; exhausting it yields a third outcome,
//! [`IsomorphismOutcome::Inconclusive`], which callers must not fold into
//! success or failure.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use wireflow_core::workflow::{Graph, SourceRef, Step, StepKind};

/// The result of an isomorphism comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum IsomorphismOutcome {
    /// A label-preserving bijection exists.
    Equivalent,
    /// No bijection can exist, with reasons.
    Mismatch { reasons: Vec<String> },
    /// The time budget ran out before the search finished.
    Inconclusive { elapsed: Duration },
}

/// Compare two graphs up to step renaming within the given time budget.
pub fn check_isomorphic(a: &Graph, b: &Graph, budget: Duration) -> IsomorphismOutcome {
    let start = Instant::now();

    let mut reasons = Vec::new();
    if a.steps.len() != b.steps.len() {
        reasons.push(format!(
            "step counts differ: {} vs {}",
            a.steps.len(),
            b.steps.len()
        ));
    }
    if a.edges.len() != b.edges.len() {
        reasons.push(format!(
            "edge counts differ: {} vs {}",
            a.edges.len(),
            b.edges.len()
        ));
    }
    if a.inputs != b.inputs {
        reasons.push("workflow input declarations differ".to_string());
    }
    let mut a_output_names: Vec<&String> = a.outputs.keys().collect();
    let mut b_output_names: Vec<&String> = b.outputs.keys().collect();
    a_output_names.sort();
    b_output_names.sort();
    if a_output_names != b_output_names {
        reasons.push("workflow output names differ".to_string());
    }
    if !reasons.is_empty() {
        return IsomorphismOutcome::Mismatch { reasons };
    }

    let left = Indexed::new(a);
    let right = Indexed::new(b);

    let mut a_labels = left.labels.clone();
    let mut b_labels = right.labels.clone();
    a_labels.sort();
    b_labels.sort();
    if a_labels != b_labels {
        return IsomorphismOutcome::Mismatch {
            reasons: vec!["step label multisets differ".to_string()],
        };
    }

    let mut search = Search {
        left: &left,
        right: &right,
        a,
        b,
        mapping: vec![None; a.steps.len()],
        used: vec![false; b.steps.len()],
        deadline: start + budget,
    };
    match search.backtrack(0) {
        Some(true) => IsomorphismOutcome::Equivalent,
        Some(false) => IsomorphismOutcome::Mismatch {
            reasons: vec!["no label-preserving bijection exists".to_string()],
        },
        None => IsomorphismOutcome::Inconclusive {
            elapsed: start.elapsed(),
        },
    }
}

/// Precomputed per-step structure for one graph.
struct Indexed {
    labels: Vec<String>,
    /// Incoming step edges per step: (producer index, from port, to port).
    incoming: Vec<Vec<(usize, String, String)>>,
    /// Outgoing step edges per step: (consumer index, from port, to port).
    outgoing: Vec<Vec<(usize, String, String)>>,
    /// Workflow-input edges per step, sorted: (input name, to port).
    flow_inputs: Vec<Vec<(String, String)>>,
}

impl Indexed {
    fn new(graph: &Graph) -> Self {
        let index: HashMap<&str, usize> = graph
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.as_str(), i))
            .collect();
        let len = graph.steps.len();
        let mut incoming = vec![Vec::new(); len];
        let mut outgoing = vec![Vec::new(); len];
        let mut flow_inputs = vec![Vec::new(); len];
        for edge in &graph.edges {
            let Some(&consumer) = index.get(edge.to.step.as_str()) else {
                continue;
            };
            match &edge.from {
                SourceRef::StepOutput { step, port } => {
                    let Some(&producer) = index.get(step.as_str()) else {
                        continue;
                    };
                    incoming[consumer].push((producer, port.clone(), edge.to.port.clone()));
                    outgoing[producer].push((consumer, port.clone(), edge.to.port.clone()));
                }
                SourceRef::FlowInput { input } => {
                    flow_inputs[consumer].push((input.clone(), edge.to.port.clone()));
                }
            }
        }
        for list in &mut flow_inputs {
            list.sort();
        }
        Indexed {
            labels: graph.steps.iter().map(step_label).collect(),
            incoming,
            outgoing,
            flow_inputs,
        }
    }
}

/// Everything about a step except its id.
fn step_label(step: &Step) -> String {
    let kind = match &step.kind {
        StepKind::Task => "task",
        StepKind::Workflow { .. } => "workflow",
        StepKind::Gather { .. } => "gather",
    };
    let inputs: Vec<serde_json::Value> = step
        .inputs
        .iter()
        .map(|p| serde_json::json!([p.id, p.ty.to_string(), p.required, p.default]))
        .collect();
    let outputs: Vec<serde_json::Value> = step
        .outputs
        .iter()
        .map(|p| serde_json::json!([p.id, p.ty.to_string()]))
        .collect();
    serde_json::json!({
        "tool": step.tool,
        "kind": kind,
        "scatter": step.scatter,
        "inputs": inputs,
        "outputs": outputs,
    })
    .to_string()
}

struct Search<'a> {
    left: &'a Indexed,
    right: &'a Indexed,
    a: &'a Graph,
    b: &'a Graph,
    mapping: Vec<Option<usize>>,
    used: Vec<bool>,
    deadline: Instant,
}

impl Search<'_> {
    /// Extend the mapping from step `index` on. `None` means the deadline
    /// passed; `Some(found)` reports whether a full bijection exists.
    fn backtrack(&mut self, index: usize) -> Option<bool> {
        if Instant::now() >= self.deadline {
            return None;
        }
        if index == self.mapping.len() {
            return Some(self.outputs_match());
        }
        for candidate in 0..self.used.len() {
            if self.used[candidate] || !self.consistent(index, candidate) {
                continue;
            }
            self.mapping[index] = Some(candidate);
            self.used[candidate] = true;
            match self.backtrack(index + 1) {
                Some(true) => return Some(true),
                Some(false) => {}
                None => return None,
            }
            self.mapping[index] = None;
            self.used[candidate] = false;
        }
        Some(false)
    }

    /// Whether mapping a-step `index` to b-step `candidate` preserves labels
    /// and all edges whose other endpoint is already mapped.
    fn consistent(&self, index: usize, candidate: usize) -> bool {
        if self.left.labels[index] != self.right.labels[candidate] {
            return false;
        }
        if self.left.flow_inputs[index] != self.right.flow_inputs[candidate] {
            return false;
        }
        if self.left.incoming[index].len() != self.right.incoming[candidate].len()
            || self.left.outgoing[index].len() != self.right.outgoing[candidate].len()
        {
            return false;
        }
        for (producer, from_port, to_port) in &self.left.incoming[index] {
            if let Some(mapped) = self.mapping[*producer] {
                let found = self.right.incoming[candidate]
                    .iter()
                    .any(|(p, f, t)| *p == mapped && f == from_port && t == to_port);
                if !found {
                    return false;
                }
            }
        }
        for (consumer, from_port, to_port) in &self.left.outgoing[index] {
            if let Some(mapped) = self.mapping[*consumer] {
                let found = self.right.outgoing[candidate]
                    .iter()
                    .any(|(c, f, t)| *c == mapped && f == from_port && t == to_port);
                if !found {
                    return false;
                }
            }
        }
        true
    }

    /// Workflow outputs must point at corresponding producers.
    fn outputs_match(&self) -> bool {
        let b_index: HashMap<&str, usize> = self
            .b
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.as_str(), i))
            .collect();
        let a_index: HashMap<&str, usize> = self
            .a
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.as_str(), i))
            .collect();
        self.a.outputs.iter().all(|(name, source)| {
            let Some(expected) = self.b.outputs.get(name) else {
                return false;
            };
            match (source, expected) {
                (SourceRef::FlowInput { input: x }, SourceRef::FlowInput { input: y }) => x == y,
                (
                    SourceRef::StepOutput { step: x, port: p },
                    SourceRef::StepOutput { step: y, port: q },
                ) => {
                    p == q
                        && a_index
                            .get(x.as_str())
                            .and_then(|&i| self.mapping[i])
                            .and_then(|mapped| {
                                b_index.get(y.as_str()).map(|&j| mapped == j)
                            })
                            .unwrap_or(false)
                }
                _ => false,
            }
        })
    }
}
