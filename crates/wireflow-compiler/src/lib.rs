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

//! Compiles workflow definitions into fully wired graphs.
//!
//! Compilation is a linear pipeline over one definition: edge inference,
//! sub-workflow inlining, scatter expansion. Each invocation owns its graph
//! exclusively; there is no shared state between compilations, and cancelling
//! simply discards the in-progress graph.

mod error;
mod infer;
mod inline;
mod matcher;
mod scatter;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use wireflow_core::workflow::{Edge, Flow, Graph, Step, StepKind};

pub use error::{CompileError, Result};
pub use matcher::is_compatible;

/// How to resolve an input port with multiple equally-ranked producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmbiguityPolicy {
    /// Bind the best-ranked candidate deterministically.
    #[default]
    Rank,
    /// Fail with `AmbiguousPort` and require an explicit `source:` override.
    Strict,
}

/// Options controlling a compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Ambiguity resolution policy for edge inference.
    pub ambiguity: AmbiguityPolicy,

    /// Upper bound on expansion passes. Expansion should reach a fixed point
    /// after at most one pass per compound step; the bound guards against
    /// runaway recursion on pathological definitions.
    pub max_passes: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            ambiguity: AmbiguityPolicy::default(),
            max_passes: 100,
        }
    }
}

/// Compile a workflow definition into a fully wired graph.
///
/// The returned graph contains no compound steps and no unexpanded scatter
/// directives. Structural validation of the artifact lives in
/// `wireflow-analysis`; this function guarantees only the invariants the
/// passes themselves establish.
pub fn compile(flow: &Flow, options: &CompileOptions) -> Result<Graph> {
    validate_step_ids(flow)?;

    let mut graph = infer::infer_edges(flow, options)?;

    // Inlining can surface scattered steps from embedded flows, so the two
    // expansions repeat until the graph stops changing shape.
    let mut passes = 0;
    while graph.has_compound_steps() || !graph.unexpanded_scattered_steps().is_empty() {
        error_stack::ensure!(
            passes < options.max_passes,
            CompileError::FixpointExceeded(options.max_passes)
        );
        graph = inline::inline(graph, options)?;
        graph = scatter::expand_scatter(graph)?;
        passes += 1;
    }

    log::debug!(
        "compiled '{}': {} steps, {} edges",
        flow.name.as_deref().unwrap_or("<unnamed>"),
        graph.steps.len(),
        graph.edges.len()
    );
    Ok(graph)
}

/// Validate that step ids are present and unique, recursing into embedded
/// sub-workflows.
fn validate_step_ids(flow: &Flow) -> Result<()> {
    let mut step_ids: HashSet<&str> = HashSet::with_capacity(flow.steps.len());
    for step in &flow.steps {
        error_stack::ensure!(!step.id.trim().is_empty(), CompileError::EmptyStepId);
        error_stack::ensure!(
            step_ids.insert(step.id.as_str()),
            CompileError::DuplicateStepId(step.id.clone())
        );
        if let StepKind::Workflow { flow } = &step.kind {
            validate_step_ids(flow)?;
        }
    }
    Ok(())
}

/// Order edges by consumer declaration: step position first, then input port
/// position within the step. Rebuilding passes re-sort so that compiling the
/// same definition always serializes identically.
pub(crate) fn sort_edges(steps: &[Step], edges: &mut [Edge]) {
    let positions: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(index, step)| (step.id.as_str(), index))
        .collect();
    edges.sort_by_key(|edge| {
        let step = positions.get(edge.to.step.as_str()).copied();
        let port = step
            .and_then(|i| steps[i].inputs.iter().position(|p| p.id == edge.to.port));
        (step.unwrap_or(usize::MAX), port.unwrap_or(usize::MAX))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use wireflow_core::workflow::{FlowBuilder, FlowInput, Port, PortType, SourceRef};

    #[test]
    fn test_duplicate_step_ids_rejected() {
        let flow = FlowBuilder::new()
            .step(Step::task("a").output(Port::new("x", PortType::File)))
            .step(Step::task("a").output(Port::new("y", PortType::File)))
            .build();
        let err = compile(&flow, &CompileOptions::default()).unwrap_err();
        assert_eq!(
            err.current_context(),
            &CompileError::DuplicateStepId("a".to_string())
        );
    }

    #[test]
    fn test_duplicate_ids_inside_embedded_flow_rejected() {
        let inner = FlowBuilder::new()
            .step(Step::task("dup").output(Port::new("x", PortType::File)))
            .step(Step::task("dup").output(Port::new("y", PortType::File)))
            .output("x", SourceRef::step("dup", "x"))
            .build();
        let flow = FlowBuilder::new()
            .step(Step::compound("sub", inner))
            .build();
        let err = compile(&flow, &CompileOptions::default()).unwrap_err();
        assert_eq!(
            err.current_context(),
            &CompileError::DuplicateStepId("dup".to_string())
        );
    }

    #[test]
    fn test_empty_step_id_rejected() {
        let flow = FlowBuilder::new().step(Step::task("  ")).build();
        let err = compile(&flow, &CompileOptions::default()).unwrap_err();
        assert_eq!(err.current_context(), &CompileError::EmptyStepId);
    }

    #[test]
    fn test_compile_scattered_subworkflow_end_to_end() {
        // A compound step whose embedded flow scatters: inlining surfaces the
        // scattered step, then expansion rewrites it.
        let inner = FlowBuilder::new()
            .input("items", FlowInput::new(PortType::array(PortType::File)))
            .step(
                Step::task("each")
                    .scatter(["item"])
                    .input(Port::new("item", PortType::File))
                    .output(Port::new("out", PortType::File)),
            )
            .output("outs", SourceRef::step("each", "out"))
            .build();
        let flow = FlowBuilder::new()
            .step(Step::task("list").output(Port::new("items", PortType::array(PortType::File))))
            .step(Step::compound("sub", inner))
            .step(
                Step::task("merge")
                    .input(Port::new("parts", PortType::array(PortType::File))),
            )
            .build();

        let graph = compile(&flow, &CompileOptions::default()).unwrap();
        let ids: Vec<_> = graph.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["list", "sub/each", "sub/each/gather", "merge"]);
        assert_eq!(
            graph.edge_to("merge", "parts").unwrap().from,
            SourceRef::step("sub/each/gather", "out")
        );
        assert!(!graph.has_compound_steps());
        assert!(graph.unexpanded_scattered_steps().is_empty());
    }
}
