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

use std::collections::HashSet;

use error_stack::report;
use wireflow_core::workflow::{Graph, SourceRef};

use crate::{Result, ValidationError};

/// Validate basic graph structure: step ids and edge endpoints.
pub(crate) fn validate_structure(graph: &Graph) -> Result<()> {
    let mut seen_ids = HashSet::new();
    for step in graph.steps() {
        error_stack::ensure!(!step.id.trim().is_empty(), ValidationError::EmptyStepId);
        error_stack::ensure!(
            seen_ids.insert(step.id.as_str()),
            ValidationError::DuplicateStepId(step.id.clone())
        );
    }

    for edge in &graph.edges {
        validate_producer(graph, &edge.from)?;

        let consumer = graph
            .step(&edge.to.step)
            .ok_or_else(|| report!(ValidationError::UnknownStep(edge.to.step.clone())))?;
        if !consumer
            .effective_inputs()
            .iter()
            .any(|p| p.id == edge.to.port)
        {
            return Err(report!(ValidationError::UnknownPort {
                step: edge.to.step.clone(),
                port: edge.to.port.clone(),
            }));
        }

        if edge.from.step_id() == Some(edge.to.step.as_str()) {
            return Err(report!(ValidationError::SelfEdge(edge.to.step.clone())));
        }
    }

    for source in graph.outputs.values() {
        validate_producer(graph, source)?;
    }
    Ok(())
}

fn validate_producer(graph: &Graph, source: &SourceRef) -> Result<()> {
    match source {
        SourceRef::FlowInput { input } => {
            error_stack::ensure!(
                graph.inputs.contains_key(input),
                ValidationError::UnknownFlowInput(input.clone())
            );
        }
        SourceRef::StepOutput { step, port } => {
            let producer = graph
                .step(step)
                .ok_or_else(|| report!(ValidationError::UnknownStep(step.clone())))?;
            if !producer.effective_outputs().iter().any(|p| p.id == *port) {
                return Err(report!(ValidationError::UnknownPort {
                    step: step.clone(),
                    port: port.clone(),
                }));
            }
        }
    }
    Ok(())
}

/// An edge's producer step must appear no later than its consumer step in the
/// declared sequence. Run after cycle detection so a genuine cycle is
/// reported as such rather than as an order violation.
pub(crate) fn validate_declaration_order(graph: &Graph) -> Result<()> {
    for edge in &graph.edges {
        let Some(producer) = edge.from.step_id() else {
            continue;
        };
        let from = graph.step_index(producer);
        let to = graph.step_index(&edge.to.step);
        if let (Some(from), Some(to)) = (from, to) {
            error_stack::ensure!(
                from <= to,
                ValidationError::OrderViolation {
                    from: producer.to_string(),
                    to: edge.to.step.clone(),
                }
            );
        }
    }
    Ok(())
}
