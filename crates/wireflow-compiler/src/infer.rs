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

//! Edge inference.
//!
//! Steps are processed in declaration order. For each required input port the
//! engine searches the visible producers — output ports of earlier steps, most
//! recently declared first, then workflow inputs — and binds the best-ranked
//! compatible candidate. The search is purely structural; runtime values are
//! never inspected.

use error_stack::report;
use wireflow_core::workflow::{Edge, Flow, Graph, Port, PortRef, SourceRef, Step, StepKind};

use crate::matcher::{self, Candidate};
use crate::{AmbiguityPolicy, CompileError, CompileOptions, Result};

/// Compute the draft graph for one workflow level.
///
/// Compound steps are treated as single nodes with their boundary ports; their
/// embedded flows are compiled when the inliner expands them.
pub(crate) fn infer_edges(flow: &Flow, options: &CompileOptions) -> Result<Graph> {
    let mut edges = Vec::new();
    for (index, step) in flow.steps.iter().enumerate() {
        validate_scatter_directive(step)?;
        for port in step.effective_inputs() {
            let scatter = step.scatter.contains(&port.id);
            if let Some(source) = &port.source {
                let edge = resolve_explicit(flow, index, step, &port, source, scatter)?;
                log::debug!("bound explicit edge {edge}");
                edges.push(edge);
            } else if port.needs_edge() {
                let edge = infer_port(flow, index, step, &port, scatter, options)?;
                log::debug!("inferred edge {edge}");
                edges.push(edge);
            }
        }
    }
    validate_outputs(flow)?;

    Ok(Graph {
        inputs: flow.inputs.clone(),
        steps: flow.steps.iter().map(strip_sources).collect(),
        edges,
        outputs: flow.outputs.clone(),
    })
}

/// Scatter directives may only name declared input ports of task steps.
fn validate_scatter_directive(step: &Step) -> Result<()> {
    if step.scatter.is_empty() {
        return Ok(());
    }
    if matches!(step.kind, StepKind::Workflow { .. }) {
        return Err(report!(CompileError::ScatterOnCompound(step.id.clone())));
    }
    for port in &step.scatter {
        if step.input_port(port).is_none() {
            return Err(report!(CompileError::UnknownScatterPort {
                step: step.id.clone(),
                port: port.clone(),
            }));
        }
    }
    Ok(())
}

/// Validate an explicit `source:` override and turn it into an edge.
fn resolve_explicit(
    flow: &Flow,
    index: usize,
    step: &Step,
    port: &Port,
    source: &SourceRef,
    scatter: bool,
) -> Result<Edge> {
    let producer_ty = match source {
        SourceRef::FlowInput { input } => flow
            .inputs
            .get(input)
            .map(|decl| decl.ty.clone())
            .ok_or_else(|| {
                report!(CompileError::UnknownSource {
                    step: step.id.clone(),
                    port: port.id.clone(),
                    src: source.to_string(),
                })
            })?,
        SourceRef::StepOutput {
            step: producer,
            port: out,
        } => {
            if *producer == step.id {
                return Err(report!(CompileError::SelfReference(step.id.clone())));
            }
            // Only earlier-declared steps are in scope.
            let producer_step = flow
                .steps
                .iter()
                .take(index)
                .find(|s| s.id == *producer)
                .ok_or_else(|| {
                    report!(CompileError::UnknownSource {
                        step: step.id.clone(),
                        port: port.id.clone(),
                        src: source.to_string(),
                    })
                })?;
            let out_port = producer_step
                .effective_outputs()
                .into_iter()
                .find(|p| p.id == *out)
                .ok_or_else(|| {
                    report!(CompileError::UnknownSource {
                        step: step.id.clone(),
                        port: port.id.clone(),
                        src: source.to_string(),
                    })
                })?;
            producer_step.effective_output_type(&out_port)
        }
    };

    if !matcher::is_compatible(&producer_ty, &port.ty, scatter) {
        return Err(report!(CompileError::IncompatibleSource {
            step: step.id.clone(),
            port: port.id.clone(),
            src: source.to_string(),
        }));
    }
    Ok(Edge::new(
        source.clone(),
        PortRef::new(step.id.clone(), port.id.clone()),
    ))
}

/// Find the producer for one required input port.
fn infer_port(
    flow: &Flow,
    index: usize,
    step: &Step,
    port: &Port,
    scatter: bool,
    options: &CompileOptions,
) -> Result<Edge> {
    let mut candidates = Vec::new();
    for earlier in flow.steps[..index].iter().rev() {
        for out in earlier.effective_outputs() {
            let ty = earlier.effective_output_type(&out);
            if matcher::is_compatible(&ty, &port.ty, scatter) {
                candidates.push(Candidate {
                    source: SourceRef::step(earlier.id.clone(), out.id.clone()),
                    name_match: out.id == port.id,
                });
            }
        }
    }
    // Workflow inputs are the fallback tier: visible everywhere, outranked by
    // any step producer.
    for (name, input) in &flow.inputs {
        if matcher::is_compatible(&input.ty, &port.ty, scatter) {
            candidates.push(Candidate {
                source: SourceRef::flow_input(name.clone()),
                name_match: *name == port.id,
            });
        }
    }

    let ranked = matcher::rank(candidates);
    let best = matcher::best_tier(&ranked);
    let chosen = match best {
        [] => {
            return Err(report!(CompileError::UnsatisfiedPort {
                step: step.id.clone(),
                port: port.id.clone(),
            }));
        }
        [single] => single,
        tied => {
            if options.ambiguity == AmbiguityPolicy::Strict {
                return Err(report!(CompileError::AmbiguousPort {
                    step: step.id.clone(),
                    port: port.id.clone(),
                    candidates: tied.iter().map(|c| c.source.to_string()).collect(),
                }));
            }
            &tied[0]
        }
    };
    Ok(Edge::new(
        chosen.source.clone(),
        PortRef::new(step.id.clone(), port.id.clone()),
    ))
}

/// Workflow outputs must reference producers that exist.
fn validate_outputs(flow: &Flow) -> Result<()> {
    for (output, source) in &flow.outputs {
        let resolves = match source {
            SourceRef::FlowInput { input } => flow.inputs.contains_key(input),
            SourceRef::StepOutput { step, port } => flow
                .step_by_id(step)
                .is_some_and(|s| s.effective_outputs().iter().any(|p| p.id == *port)),
        };
        if !resolves {
            return Err(report!(CompileError::UnknownOutput {
                output: output.clone(),
                src: source.to_string(),
            }));
        }
    }
    Ok(())
}

/// Explicit source overrides are realized as edges; the compiled artifact
/// carries the wiring only once.
fn strip_sources(step: &Step) -> Step {
    let mut step = step.clone();
    for port in &mut step.inputs {
        port.source = None;
    }
    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;
    use wireflow_core::workflow::{FlowBuilder, FlowInput, PortType};

    fn options() -> CompileOptions {
        CompileOptions::default()
    }

    fn strict() -> CompileOptions {
        CompileOptions {
            ambiguity: AmbiguityPolicy::Strict,
            ..CompileOptions::default()
        }
    }

    /// Three steps A, B, C: A.x feeds B.in, B.y feeds C.in.
    fn chain_flow() -> Flow {
        FlowBuilder::new()
            .step(Step::task("a").output(Port::new("x", PortType::File)))
            .step(
                Step::task("b")
                    .input(Port::new("in", PortType::File))
                    .output(Port::new("y", PortType::File)),
            )
            .step(Step::task("c").input(Port::new("in", PortType::File)))
            .build()
    }

    #[test]
    fn test_nearest_compatible_producer_wins() {
        let graph = infer_edges(&chain_flow(), &options()).unwrap();
        assert_eq!(
            graph.edges,
            vec![
                Edge::new(SourceRef::step("a", "x"), PortRef::new("b", "in")),
                Edge::new(SourceRef::step("b", "y"), PortRef::new("c", "in")),
            ]
        );
    }

    #[test]
    fn test_unsatisfied_port_names_the_port() {
        // C declared before B: nothing feeds c.in yet.
        let flow = FlowBuilder::new()
            .step(Step::task("c").input(Port::new("in", PortType::File)))
            .step(Step::task("a").output(Port::new("x", PortType::File)))
            .build();
        let err = infer_edges(&flow, &options()).unwrap_err();
        assert_eq!(
            err.current_context(),
            &CompileError::UnsatisfiedPort {
                step: "c".to_string(),
                port: "in".to_string(),
            }
        );
    }

    #[test]
    fn test_name_match_outranks_recency() {
        let flow = FlowBuilder::new()
            .step(Step::task("a").output(Port::new("in", PortType::File)))
            .step(Step::task("b").output(Port::new("y", PortType::File)))
            .step(Step::task("c").input(Port::new("in", PortType::File)))
            .build();
        let graph = infer_edges(&flow, &options()).unwrap();
        assert_eq!(
            graph.edge_to("c", "in").unwrap().from,
            SourceRef::step("a", "in")
        );
    }

    #[test]
    fn test_strict_policy_rejects_equally_ranked_candidates() {
        let err = infer_edges(&chain_flow(), &strict()).unwrap_err();
        match err.current_context() {
            CompileError::AmbiguousPort {
                step,
                port,
                candidates,
            } => {
                assert_eq!(step, "c");
                assert_eq!(port, "in");
                assert_eq!(candidates, &vec!["b.y".to_string(), "a.x".to_string()]);
            }
            other => panic!("expected AmbiguousPort, got {other:?}"),
        }
    }

    #[test]
    fn test_strict_policy_accepts_unique_name_match() {
        let flow = FlowBuilder::new()
            .step(Step::task("a").output(Port::new("x", PortType::File)))
            .step(Step::task("b").output(Port::new("in", PortType::File)))
            .step(Step::task("c").input(Port::new("in", PortType::File)))
            .build();
        let graph = infer_edges(&flow, &strict()).unwrap();
        assert_eq!(
            graph.edge_to("c", "in").unwrap().from,
            SourceRef::step("b", "in")
        );
    }

    #[test]
    fn test_flow_input_feeds_first_step() {
        let flow = FlowBuilder::new()
            .input("reads", FlowInput::new(PortType::File))
            .step(Step::task("map").input(Port::new("reads", PortType::File)))
            .build();
        let graph = infer_edges(&flow, &options()).unwrap();
        assert_eq!(
            graph.edge_to("map", "reads").unwrap().from,
            SourceRef::flow_input("reads")
        );
    }

    #[test]
    fn test_step_output_shadows_flow_input() {
        let flow = FlowBuilder::new()
            .input("data", FlowInput::new(PortType::File))
            .step(Step::task("stage").output(Port::new("out", PortType::File)))
            .step(Step::task("use").input(Port::new("in", PortType::File)))
            .build();
        let graph = infer_edges(&flow, &options()).unwrap();
        assert_eq!(
            graph.edge_to("use", "in").unwrap().from,
            SourceRef::step("stage", "out")
        );
    }

    #[test]
    fn test_optional_port_stays_unconnected() {
        let flow = FlowBuilder::new()
            .step(Step::task("a").output(Port::new("x", PortType::Int)))
            .step(Step::task("b").input(
                Port::new("limit", PortType::Int).with_default(serde_json::json!(10)),
            ))
            .build();
        let graph = infer_edges(&flow, &options()).unwrap();
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_explicit_source_overrides_inference() {
        let flow = FlowBuilder::new()
            .step(Step::task("a").output(Port::new("x", PortType::File)))
            .step(Step::task("b").output(Port::new("y", PortType::File)))
            .step(Step::task("c").input(
                Port::new("in", PortType::File).with_source(SourceRef::step("a", "x")),
            ))
            .build();
        let graph = infer_edges(&flow, &options()).unwrap();
        assert_eq!(
            graph.edge_to("c", "in").unwrap().from,
            SourceRef::step("a", "x")
        );
        // The override is realized as an edge and not re-serialized.
        assert!(graph.step("c").unwrap().inputs[0].source.is_none());
    }

    #[test]
    fn test_explicit_source_forward_reference_is_out_of_scope() {
        let flow = FlowBuilder::new()
            .step(Step::task("c").input(
                Port::new("in", PortType::File).with_source(SourceRef::step("a", "x")),
            ))
            .step(Step::task("a").output(Port::new("x", PortType::File)))
            .build();
        let err = infer_edges(&flow, &options()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            CompileError::UnknownSource { .. }
        ));
    }

    #[test]
    fn test_explicit_source_incompatible_type() {
        let flow = FlowBuilder::new()
            .step(Step::task("a").output(Port::new("x", PortType::Int)))
            .step(Step::task("b").input(
                Port::new("in", PortType::File).with_source(SourceRef::step("a", "x")),
            ))
            .build();
        let err = infer_edges(&flow, &options()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            CompileError::IncompatibleSource { .. }
        ));
    }

    #[test]
    fn test_explicit_self_reference_rejected() {
        let flow = FlowBuilder::new()
            .step(
                Step::task("a")
                    .input(Port::new("in", PortType::File).with_source(SourceRef::step("a", "x")))
                    .output(Port::new("x", PortType::File)),
            )
            .build();
        let err = infer_edges(&flow, &options()).unwrap_err();
        assert_eq!(
            err.current_context(),
            &CompileError::SelfReference("a".to_string())
        );
    }

    #[test]
    fn test_scattered_port_accepts_array_producer() {
        let flow = FlowBuilder::new()
            .input(
                "values",
                FlowInput::new(PortType::array(PortType::Int)),
            )
            .step(
                Step::task("each")
                    .scatter(["value"])
                    .input(Port::new("value", PortType::Int)),
            )
            .build();
        let graph = infer_edges(&flow, &options()).unwrap();
        assert_eq!(
            graph.edge_to("each", "value").unwrap().from,
            SourceRef::flow_input("values")
        );
    }

    #[test]
    fn test_scattered_producer_presents_array_type() {
        let flow = FlowBuilder::new()
            .input(
                "values",
                FlowInput::new(PortType::array(PortType::Int)),
            )
            .step(
                Step::task("each")
                    .scatter(["value"])
                    .input(Port::new("value", PortType::Int))
                    .output(Port::new("result", PortType::File)),
            )
            .step(Step::task("merge").input(Port::new("results", PortType::array(PortType::File))))
            .build();
        let graph = infer_edges(&flow, &options()).unwrap();
        assert_eq!(
            graph.edge_to("merge", "results").unwrap().from,
            SourceRef::step("each", "result")
        );
    }

    #[test]
    fn test_scatter_directive_validation() {
        let flow = FlowBuilder::new()
            .step(
                Step::task("s")
                    .scatter(["missing"])
                    .input(Port::new("in", PortType::Int).optional()),
            )
            .build();
        let err = infer_edges(&flow, &options()).unwrap_err();
        assert_eq!(
            err.current_context(),
            &CompileError::UnknownScatterPort {
                step: "s".to_string(),
                port: "missing".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_output_source() {
        let flow = Flow {
            steps: vec![Step::task("a").output(Port::new("x", PortType::File))],
            outputs: indexmap! {
                "result".to_string() => SourceRef::step("a", "missing"),
            },
            ..Flow::default()
        };
        let err = infer_edges(&flow, &options()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            CompileError::UnknownOutput { .. }
        ));
    }
}
