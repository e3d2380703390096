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

use std::time::Duration;

use error_stack::report;
use wireflow_core::workflow::Graph;

use crate::diagnostics::{DiagnosticMessage, Diagnostics};
use crate::isomorphism::{check_isomorphic, IsomorphismOutcome};
use crate::tracker::Dependencies;
use crate::{Result, ValidationError};

mod advisory;
mod satisfaction;
mod structure;

/// Validate a compiled graph and collect advisory diagnostics.
///
/// Structural failures abort with the error; advisory findings are returned
/// as diagnostics and never block the artifact.
pub fn validate(graph: &Graph) -> Result<Diagnostics> {
    let mut diagnostics = Diagnostics::new();
    structure::validate_structure(graph)?;
    validate_acyclic(graph)?;
    structure::validate_declaration_order(graph)?;
    satisfaction::validate_satisfaction(graph)?;
    advisory::collect_advisories(graph, &mut diagnostics);
    Ok(diagnostics)
}

/// Validate a graph and additionally compare it against a reference graph
/// expected to be structurally equivalent.
///
/// A mismatch is an advisory failure (`StructuralMismatch`); an exhausted
/// time budget is reported as an inconclusive diagnostic, never as success or
/// failure.
pub fn validate_with_reference(
    graph: &Graph,
    reference: &Graph,
    budget: Duration,
) -> Result<Diagnostics> {
    let mut diagnostics = validate(graph)?;
    match check_isomorphic(graph, reference, budget) {
        IsomorphismOutcome::Equivalent => {}
        IsomorphismOutcome::Mismatch { reasons } => {
            return Err(report!(ValidationError::StructuralMismatch { reasons }));
        }
        IsomorphismOutcome::Inconclusive { elapsed } => {
            log::warn!(
                "isomorphism check inconclusive after {}ms",
                elapsed.as_millis()
            );
            diagnostics.add(DiagnosticMessage::IsomorphismInconclusive {
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }
    }
    Ok(diagnostics)
}

/// Topological sort over the dependency relation; leftover steps are a cycle.
fn validate_acyclic(graph: &Graph) -> Result<()> {
    let dependencies = Dependencies::from_graph(graph);
    match dependencies.topological_order() {
        Ok(_) => Ok(()),
        Err(steps) => Err(report!(ValidationError::Cycle { steps })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;
    use wireflow_core::workflow::{
        Edge, FlowInput, Port, PortRef, PortType, SourceRef, Step,
    };

    fn wired_pair() -> Graph {
        Graph {
            steps: vec![
                Step::task("a").output(Port::new("x", PortType::File)),
                Step::task("b")
                    .input(Port::new("in", PortType::File))
                    .output(Port::new("y", PortType::File)),
            ],
            edges: vec![Edge::new(
                SourceRef::step("a", "x"),
                PortRef::new("b", "in"),
            )],
            outputs: indexmap! {
                "y".to_string() => SourceRef::step("b", "y"),
            },
            ..Graph::default()
        }
    }

    #[test]
    fn test_valid_graph_passes() {
        let diagnostics = validate(&wired_pair()).unwrap();
        assert!(!diagnostics.has_fatal());
    }

    #[test]
    fn test_unsatisfied_required_port() {
        let mut graph = wired_pair();
        graph.edges.clear();
        let err = validate(&graph).unwrap_err();
        assert_eq!(
            err.current_context(),
            &ValidationError::UnsatisfiedPort {
                step: "b".to_string(),
                port: "in".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_edges_on_one_port() {
        let mut graph = wired_pair();
        graph.steps.insert(
            0,
            Step::task("other").output(Port::new("x", PortType::File)),
        );
        graph
            .edges
            .push(Edge::new(SourceRef::step("other", "x"), PortRef::new("b", "in")));
        let err = validate(&graph).unwrap_err();
        assert_eq!(
            err.current_context(),
            &ValidationError::DuplicateEdge {
                step: "b".to_string(),
                port: "in".to_string(),
                count: 2,
            }
        );
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = wired_pair();
        // Wire a.in back from b.y to close a loop.
        graph.steps[0] = Step::task("a")
            .input(Port::new("in", PortType::File))
            .output(Port::new("x", PortType::File));
        graph
            .edges
            .push(Edge::new(SourceRef::step("b", "y"), PortRef::new("a", "in")));
        let err = validate(&graph).unwrap_err();
        match err.current_context() {
            ValidationError::Cycle { steps } => {
                assert_eq!(steps, &vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected Cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_edge_rejected() {
        let mut graph = wired_pair();
        graph
            .edges
            .push(Edge::new(SourceRef::step("b", "y"), PortRef::new("b", "in")));
        let err = validate(&graph).unwrap_err();
        assert_eq!(
            err.current_context(),
            &ValidationError::SelfEdge("b".to_string())
        );
    }

    #[test]
    fn test_order_violation_rejected() {
        let graph = Graph {
            steps: vec![
                Step::task("early").input(Port::new("in", PortType::File)),
                Step::task("late").output(Port::new("x", PortType::File)),
            ],
            edges: vec![Edge::new(
                SourceRef::step("late", "x"),
                PortRef::new("early", "in"),
            )],
            ..Graph::default()
        };
        let err = validate(&graph).unwrap_err();
        assert_eq!(
            err.current_context(),
            &ValidationError::OrderViolation {
                from: "late".to_string(),
                to: "early".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_endpoints_rejected() {
        let mut graph = wired_pair();
        graph.edges.push(Edge::new(
            SourceRef::step("ghost", "x"),
            PortRef::new("b", "in"),
        ));
        let err = validate(&graph).unwrap_err();
        assert_eq!(
            err.current_context(),
            &ValidationError::UnknownStep("ghost".to_string())
        );

        let mut graph = wired_pair();
        graph.edges[0].from = SourceRef::flow_input("missing");
        let err = validate(&graph).unwrap_err();
        assert_eq!(
            err.current_context(),
            &ValidationError::UnknownFlowInput("missing".to_string())
        );
    }

    #[test]
    fn test_validate_with_reference_equivalent() {
        let diagnostics =
            validate_with_reference(&wired_pair(), &wired_pair(), Duration::from_secs(5)).unwrap();
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_validate_with_reference_mismatch_is_reported() {
        let mut reference = wired_pair();
        reference.steps[1].tool = Some("other".to_string());
        let err =
            validate_with_reference(&wired_pair(), &reference, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(
            err.current_context(),
            ValidationError::StructuralMismatch { .. }
        ));
    }

    #[test]
    fn test_validate_with_reference_timeout_is_inconclusive_not_failure() {
        let diagnostics =
            validate_with_reference(&wired_pair(), &wired_pair(), Duration::ZERO).unwrap();
        assert_eq!(diagnostics.num_warning, 1);
        assert!(matches!(
            diagnostics.diagnostics[0].message,
            DiagnosticMessage::IsomorphismInconclusive { .. }
        ));
    }

    #[test]
    fn test_unreferenced_output_is_advisory() {
        let graph = Graph {
            inputs: indexmap! {
                "seed".to_string() => FlowInput::new(PortType::Int),
            },
            steps: vec![Step::task("a")
                .input(Port::new("seed", PortType::Int))
                .output(Port::new("x", PortType::File))],
            edges: vec![Edge::new(
                SourceRef::flow_input("seed"),
                PortRef::new("a", "seed"),
            )],
            ..Graph::default()
        };
        let diagnostics = validate(&graph).unwrap();
        assert_eq!(diagnostics.num_warning, 1);
        assert!(matches!(
            diagnostics.diagnostics[0].message,
            DiagnosticMessage::UnreferencedStepOutput { .. }
        ));
    }
}
