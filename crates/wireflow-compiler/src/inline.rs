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

//! Sub-workflow inlining.
//!
//! Each compound step is replaced by the steps of its embedded flow, spliced
//! at the compound step's position with ids namespaced `"{compound}/{inner}"`.
//! Edges crossing the boundary are rewritten through the inlining context: a
//! mapping from boundary ports to internal producers and consumers that is
//! discarded once the step has been expanded. The result does not depend on
//! how deeply the compound step was embedded.

use error_stack::report;
use wireflow_core::workflow::{
    Edge, Flow, Graph, PortRef, SourceRef, Step, StepKind,
};

use crate::{infer, sort_edges, CompileError, CompileOptions, Result};

/// Expand compound steps until none remain.
///
/// Each pass expands one compound step; nested sub-workflows surface as new
/// compound steps and are expanded by later passes. The loop is bounded by
/// `options.max_passes` to guarantee termination on pathological input.
pub(crate) fn inline(mut graph: Graph, options: &CompileOptions) -> Result<Graph> {
    let mut passes = 0;
    while let Some(index) = graph
        .steps
        .iter()
        .position(|s| matches!(s.kind, StepKind::Workflow { .. }))
    {
        if passes >= options.max_passes {
            return Err(report!(CompileError::FixpointExceeded(options.max_passes)));
        }
        log::debug!("inlining compound step '{}'", graph.steps[index].id);
        graph = inline_step(graph, index, options)?;
        passes += 1;
    }
    Ok(graph)
}

/// A producer discovered behind a boundary output.
enum InlineSource {
    /// A real producer: an internal step output or a parent-side source.
    Ref(SourceRef),
    /// No producer; the boundary input's default value applies.
    Default(serde_json::Value),
}

fn inline_step(parent: Graph, index: usize, options: &CompileOptions) -> Result<Graph> {
    let mut steps = parent.steps;
    let compound = steps.remove(index);
    let flow = match compound.kind {
        StepKind::Workflow { flow } => *flow,
        _ => unreachable!("inline_step called on a non-compound step"),
    };

    // Compile the embedded flow in isolation, then splice it in.
    let inner = infer::infer_edges(&flow, options)?;
    let spliced: Vec<Step> = inner
        .steps
        .iter()
        .map(|s| namespace_step(&compound.id, s))
        .collect();
    steps.splice(index..index, spliced);

    let ctx = InlineContext {
        compound: &compound.id,
        flow: &flow,
        inner: &inner,
        parent_edges: &parent.edges,
    };

    let mut edges = Vec::new();
    let mut materialized_defaults: Vec<(PortRef, serde_json::Value)> = Vec::new();

    for edge in &parent.edges {
        if edge.to.step == compound.id {
            for to in ctx.input_consumers(&edge.to.port)? {
                edges.push(Edge::new(edge.from.clone(), to));
            }
        } else if edge.from.step_id() == Some(compound.id.as_str()) {
            match ctx.output_source(edge.from.port_name())? {
                InlineSource::Ref(from) => edges.push(Edge::new(from, edge.to.clone())),
                InlineSource::Default(value) => {
                    materialized_defaults.push((edge.to.clone(), value));
                }
            }
        } else {
            edges.push(edge.clone());
        }
    }

    for edge in &inner.edges {
        let to = ctx.namespace_ref(&edge.to);
        match &edge.from {
            SourceRef::StepOutput { step, port } => {
                edges.push(Edge::new(
                    SourceRef::step(ctx.namespace(step), port.clone()),
                    to,
                ));
            }
            SourceRef::FlowInput { input } => match ctx.parent_producer(input) {
                Some(from) => edges.push(Edge::new(from, to)),
                None => {
                    let default = flow
                        .inputs
                        .get(input)
                        .and_then(|decl| decl.default.clone())
                        .ok_or_else(|| {
                            report!(CompileError::DanglingPort {
                                step: compound.id.clone(),
                                port: input.clone(),
                            })
                        })?;
                    materialized_defaults.push((to, default));
                }
            },
        }
    }

    // Parent workflow outputs exposed through the compound boundary.
    let mut outputs = parent.outputs;
    for (name, source) in outputs.iter_mut() {
        if source.step_id() == Some(compound.id.as_str()) {
            match ctx.output_source(source.port_name())? {
                InlineSource::Ref(resolved) => *source = resolved,
                InlineSource::Default(_) => {
                    return Err(report!(CompileError::DanglingPort {
                        step: compound.id.clone(),
                        port: name.clone(),
                    }));
                }
            }
        }
    }

    // A boundary input left unconnected falls back to its default; push the
    // default onto the internal consumer ports so the wiring stays observable.
    for (port_ref, value) in materialized_defaults {
        let step = steps
            .iter_mut()
            .find(|s| s.id == port_ref.step)
            .expect("materialized default targets a spliced step");
        if let Some(port) = step.inputs.iter_mut().find(|p| p.id == port_ref.port) {
            port.default = Some(value);
        }
    }

    sort_edges(&steps, &mut edges);
    Ok(Graph {
        inputs: parent.inputs,
        steps,
        edges,
        outputs,
    })
}

/// The ephemeral boundary mapping for one compound step expansion.
struct InlineContext<'a> {
    compound: &'a str,
    flow: &'a Flow,
    inner: &'a Graph,
    parent_edges: &'a [Edge],
}

impl InlineContext<'_> {
    fn namespace(&self, id: &str) -> String {
        format!("{}/{}", self.compound, id)
    }

    fn namespace_ref(&self, port_ref: &PortRef) -> PortRef {
        PortRef::new(self.namespace(&port_ref.step), port_ref.port.clone())
    }

    /// The parent-side producer wired into the given boundary input, if any.
    fn parent_producer(&self, input: &str) -> Option<SourceRef> {
        self.parent_edges
            .iter()
            .find(|e| e.to.step == self.compound && e.to.port == input)
            .map(|e| e.from.clone())
    }

    /// The namespaced internal consumers of a boundary input.
    ///
    /// An empty list is fine when the input is forwarded by a passthrough
    /// output; the parent-side value then flows through the re-sourced
    /// consumer edges instead.
    fn input_consumers(&self, port: &str) -> Result<Vec<PortRef>> {
        if !self.flow.inputs.contains_key(port) {
            return Err(report!(CompileError::DanglingPort {
                step: self.compound.to_string(),
                port: port.to_string(),
            }));
        }
        let consumers: Vec<PortRef> = self
            .inner
            .edges
            .iter()
            .filter(|e| matches!(&e.from, SourceRef::FlowInput { input } if input == port))
            .map(|e| self.namespace_ref(&e.to))
            .collect();
        if consumers.is_empty() {
            let forwarded = self
                .inner
                .outputs
                .values()
                .any(|s| matches!(s, SourceRef::FlowInput { input } if input == port));
            if !forwarded {
                return Err(report!(CompileError::DanglingPort {
                    step: self.compound.to_string(),
                    port: port.to_string(),
                }));
            }
        }
        Ok(consumers)
    }

    /// Resolve a boundary output to its producer.
    fn output_source(&self, port: &str) -> Result<InlineSource> {
        let source = self.inner.outputs.get(port).ok_or_else(|| {
            report!(CompileError::DanglingPort {
                step: self.compound.to_string(),
                port: port.to_string(),
            })
        })?;
        match source {
            SourceRef::StepOutput { step, port } => Ok(InlineSource::Ref(SourceRef::step(
                self.namespace(step),
                port.clone(),
            ))),
            // A passthrough output forwards a boundary input.
            SourceRef::FlowInput { input } => match self.parent_producer(input) {
                Some(from) => Ok(InlineSource::Ref(from)),
                None => {
                    let default = self
                        .flow
                        .inputs
                        .get(input)
                        .and_then(|decl| decl.default.clone())
                        .ok_or_else(|| {
                            report!(CompileError::DanglingPort {
                                step: self.compound.to_string(),
                                port: port.to_string(),
                            })
                        })?;
                    Ok(InlineSource::Default(default))
                }
            },
        }
    }
}

fn namespace_step(prefix: &str, step: &Step) -> Step {
    let mut step = step.clone();
    step.id = format!("{prefix}/{}", step.id);
    if let StepKind::Gather { step: of } = &mut step.kind {
        *of = format!("{prefix}/{of}");
    }
    step
}
