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

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Flow, Port, PortType};

/// A step in a workflow with declared input and output ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Identifier for the step, unique within its workflow.
    pub id: String,

    /// Opaque reference to the underlying tool definition resolved by the
    /// executor. Absent for compiler-synthesized steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,

    /// What the step is: a plain task, an embedded sub-workflow, or a
    /// synthesized gather.
    #[serde(default, skip_serializing_if = "StepKind::is_task")]
    pub kind: StepKind,

    /// Input ports to iterate over element-wise. Each named port must be a
    /// declared input of the step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scatter: Vec<String>,

    /// Declared input ports, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Port>,

    /// Declared output ports, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Port>,
}

/// The closed set of step kinds.
///
/// Compilation resolves each kind by pattern matching; there is no dynamic
/// dispatch over step behavior.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    /// # Task
    /// Executes a single tool.
    #[default]
    Task,
    /// # Workflow
    /// Wraps an embedded sub-workflow, inlined during compilation.
    Workflow { flow: Box<Flow> },
    /// # Gather
    /// Recombines the per-element outputs of the named scattered step into
    /// arrays, in original element order. Synthesized by scatter expansion;
    /// never present in user input.
    Gather { step: String },
}

impl StepKind {
    pub fn is_task(&self) -> bool {
        matches!(self, StepKind::Task)
    }
}

impl Step {
    /// Create a task step with the given id and no ports.
    pub fn task(id: impl Into<String>) -> Self {
        Step {
            id: id.into(),
            tool: None,
            kind: StepKind::Task,
            scatter: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Create a compound step embedding the given sub-workflow.
    ///
    /// The step's boundary ports are derived from the embedded flow's inputs
    /// and outputs rather than declared on the step itself.
    pub fn compound(id: impl Into<String>, flow: Flow) -> Self {
        Step {
            id: id.into(),
            tool: None,
            kind: StepKind::Workflow {
                flow: Box::new(flow),
            },
            scatter: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Set the tool reference.
    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Add a scatter directive over the named input ports.
    pub fn scatter<I, S>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scatter.extend(ports.into_iter().map(Into::into));
        self
    }

    /// Add an input port.
    pub fn input(mut self, port: Port) -> Self {
        self.inputs.push(port);
        self
    }

    /// Add an output port.
    pub fn output(mut self, port: Port) -> Self {
        self.outputs.push(port);
        self
    }

    /// Look up a declared input port.
    pub fn input_port(&self, id: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.id == id)
    }

    /// Look up a declared output port.
    pub fn output_port(&self, id: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.id == id)
    }

    /// Whether this step carries a scatter directive.
    pub fn is_scattered(&self) -> bool {
        !self.scatter.is_empty()
    }

    /// The externally visible input ports of the step.
    ///
    /// For task and gather steps these are the declared inputs. For a compound
    /// step they are the embedded flow's inputs, which form the boundary seen
    /// by the enclosing workflow.
    pub fn effective_inputs(&self) -> Vec<Port> {
        match &self.kind {
            StepKind::Task | StepKind::Gather { .. } => self.inputs.clone(),
            StepKind::Workflow { flow } => flow
                .inputs
                .iter()
                .map(|(name, input)| {
                    let mut port = Port::new(name.clone(), input.ty.clone());
                    port.required = input.required;
                    port.default = input.default.clone();
                    port
                })
                .collect(),
        }
    }

    /// The externally visible output ports of the step.
    ///
    /// For a compound step these are the embedded flow's outputs with types
    /// resolved through the boundary.
    pub fn effective_outputs(&self) -> Vec<Port> {
        match &self.kind {
            StepKind::Task | StepKind::Gather { .. } => self.outputs.clone(),
            StepKind::Workflow { flow } => flow
                .outputs
                .keys()
                .filter_map(|name| {
                    flow.boundary_output_type(name)
                        .map(|ty| Port::new(name.clone(), ty))
                })
                .collect(),
        }
    }

    /// The type a downstream consumer sees for the given output port.
    ///
    /// Scattered steps produce one value per element, so their outputs are
    /// array-typed from the outside.
    pub fn effective_output_type(&self, port: &Port) -> PortType {
        if self.is_scattered() {
            PortType::array(port.ty.clone())
        } else {
            port.ty.clone()
        }
    }
}
