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

use indexmap::IndexMap;

use super::{Flow, FlowInput, SourceRef, Step};

/// Builder for creating Flow instances with reduced boilerplate.
///
/// This is the embedding API: callers declare inputs, steps, and outputs in
/// order, and the recorded declaration order is exactly the order edge
/// inference sees. The same flow can equivalently be parsed from YAML or JSON.
#[derive(Default)]
pub struct FlowBuilder {
    name: Option<String>,
    doc: Option<String>,
    inputs: IndexMap<String, FlowInput>,
    steps: Vec<Step>,
    outputs: IndexMap<String, SourceRef>,
}

impl FlowBuilder {
    /// Create a new FlowBuilder with default values.
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the flow name.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the flow description.
    pub fn doc<S: Into<String>>(mut self, doc: S) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Declare a workflow-level input.
    pub fn input<S: Into<String>>(mut self, name: S, input: FlowInput) -> Self {
        self.inputs.insert(name.into(), input);
        self
    }

    /// Add a single step to the flow.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Add multiple steps to the flow.
    pub fn steps<I: IntoIterator<Item = Step>>(mut self, steps: I) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Declare a workflow-level output.
    pub fn output<S: Into<String>>(mut self, name: S, source: SourceRef) -> Self {
        self.outputs.insert(name.into(), source);
        self
    }

    /// Build the final Flow instance.
    pub fn build(self) -> Flow {
        Flow {
            name: self.name,
            doc: self.doc,
            inputs: self.inputs,
            steps: self.steps,
            outputs: self.outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Port, PortType};

    #[test]
    fn test_builder_records_declaration_order() {
        let flow = FlowBuilder::new()
            .name("ordered")
            .input("b", FlowInput::new(PortType::Int))
            .input("a", FlowInput::new(PortType::Int))
            .steps(vec![
                Step::task("first").output(Port::new("x", PortType::File)),
                Step::task("second").input(Port::new("in", PortType::File)),
            ])
            .output("x", SourceRef::step("first", "x"))
            .build();

        let input_names: Vec<_> = flow.inputs.keys().cloned().collect();
        assert_eq!(input_names, vec!["b", "a"]);
        assert_eq!(flow.steps[0].id, "first");
        assert_eq!(flow.steps[1].id, "second");
    }

    #[test]
    fn test_builder_matches_parsed_flow() {
        let built = FlowBuilder::new()
            .name("two_steps")
            .step(
                Step::task("a")
                    .tool("make")
                    .output(Port::new("x", PortType::File)),
            )
            .step(
                Step::task("b")
                    .tool("use")
                    .input(Port::new("in", PortType::File)),
            )
            .build();

        let parsed = Flow::from_yaml_string(
            r#"
            name: two_steps
            steps:
              - id: a
                tool: make
                outputs:
                  - id: x
                    type: file
              - id: b
                tool: use
                inputs:
                  - id: in
                    type: file
            "#,
        )
        .unwrap();

        assert_eq!(built, parsed);
    }
}
