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

//! Scatter expansion.
//!
//! A step scattered over array-typed inputs becomes two nodes: the element
//! template (the original step, executed once per element) and an implicit
//! gather step that recombines the per-element outputs into arrays in original
//! element order. Downstream consumers are re-sourced to the gather step;
//! edges into non-scattered ports and all sibling steps' edges are left
//! untouched.

use std::collections::HashSet;

use error_stack::report;
use wireflow_core::workflow::{Edge, Graph, Port, PortRef, PortType, SourceRef, Step, StepKind};

use crate::{sort_edges, CompileError, Result};

/// Expand every scattered step in the graph.
///
/// One pass suffices after inlining has completed: expansion synthesizes only
/// task and gather steps, never new scattered or compound ones.
pub(crate) fn expand_scatter(graph: Graph) -> Result<Graph> {
    let scattered: Vec<usize> = graph.unexpanded_scattered_steps();
    if scattered.is_empty() {
        return Ok(graph);
    }
    for &index in &scattered {
        check_length_contract(&graph, &graph.steps[index])?;
    }
    let scattered_ids: HashSet<String> = scattered
        .iter()
        .map(|&i| graph.steps[i].id.clone())
        .collect();

    let Graph {
        inputs,
        steps,
        mut edges,
        mut outputs,
    } = graph;

    let mut expanded = Vec::with_capacity(steps.len() + scattered_ids.len());
    for step in steps {
        if !scattered_ids.contains(&step.id) {
            expanded.push(step);
            continue;
        }
        log::debug!("expanding scattered step '{}'", step.id);
        let gather = make_gather(&step);

        // Downstream consumers read the gathered arrays.
        for edge in edges.iter_mut() {
            if edge.from.step_id() == Some(step.id.as_str()) {
                edge.from = SourceRef::step(gather.id.clone(), edge.from.port_name().to_string());
            }
        }
        for source in outputs.values_mut() {
            if source.step_id() == Some(step.id.as_str()) {
                *source = SourceRef::step(gather.id.clone(), source.port_name().to_string());
            }
        }
        // The template feeds the gather element-wise.
        for out in &step.outputs {
            edges.push(Edge::new(
                SourceRef::step(step.id.clone(), out.id.clone()),
                PortRef::new(gather.id.clone(), out.id.clone()),
            ));
        }

        expanded.push(step);
        expanded.push(gather);
    }

    sort_edges(&expanded, &mut edges);
    Ok(Graph {
        inputs,
        steps: expanded,
        edges,
        outputs,
    })
}

fn make_gather(template: &Step) -> Step {
    Step {
        id: format!("{}/gather", template.id),
        tool: None,
        kind: StepKind::Gather {
            step: template.id.clone(),
        },
        scatter: Vec::new(),
        inputs: template
            .outputs
            .iter()
            .map(|o| Port::new(o.id.clone(), o.ty.clone()))
            .collect(),
        outputs: template
            .outputs
            .iter()
            .map(|o| Port::new(o.id.clone(), PortType::array(o.ty.clone())))
            .collect(),
    }
}

/// Scattered ports of one step must agree on element count when the counts
/// are statically known. Unknown lengths are the executor's problem; the
/// compiler only emits the structural expansion.
fn check_length_contract(graph: &Graph, step: &Step) -> Result<()> {
    if step.scatter.len() < 2 {
        return Ok(());
    }
    let mut known: Vec<(String, usize)> = Vec::new();
    let mut deferred = false;
    for port_id in &step.scatter {
        match static_length(graph, step, port_id) {
            Some(len) => known.push((port_id.clone(), len)),
            None => deferred = true,
        }
    }
    if known.len() >= 2 && known.iter().any(|(_, len)| *len != known[0].1) {
        return Err(report!(CompileError::ScatterLengthMismatch {
            step: step.id.clone(),
            lengths: known,
        }));
    }
    if deferred {
        log::debug!(
            "scatter length check for step '{}' deferred to the executor",
            step.id
        );
    }
    Ok(())
}

/// The element count of a scattered port, when a literal array determines it.
fn static_length(graph: &Graph, step: &Step, port_id: &str) -> Option<usize> {
    let value = match graph.edge_to(&step.id, port_id) {
        Some(edge) => match &edge.from {
            SourceRef::FlowInput { input } => graph.inputs.get(input)?.default.as_ref()?,
            SourceRef::StepOutput { .. } => return None,
        },
        None => step.input_port(port_id)?.default.as_ref()?,
    };
    value.as_array().map(|a| a.len())
}
