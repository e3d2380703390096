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
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{FlowInput, Step, StepKind};

/// A reference to a value producer: either a workflow-level input or the
/// output port of an earlier step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(untagged, rename_all = "camelCase")]
pub enum SourceRef {
    /// An output port of a step.
    StepOutput { step: String, port: String },
    /// A workflow-level input.
    FlowInput { input: String },
}

impl SourceRef {
    /// Reference a workflow-level input.
    pub fn flow_input(input: impl Into<String>) -> Self {
        SourceRef::FlowInput {
            input: input.into(),
        }
    }

    /// Reference the output port of a step.
    pub fn step(step: impl Into<String>, port: impl Into<String>) -> Self {
        SourceRef::StepOutput {
            step: step.into(),
            port: port.into(),
        }
    }

    /// The producing step id, if this references a step output.
    pub fn step_id(&self) -> Option<&str> {
        match self {
            SourceRef::StepOutput { step, .. } => Some(step),
            SourceRef::FlowInput { .. } => None,
        }
    }

    /// The producer-side port name.
    pub fn port_name(&self) -> &str {
        match self {
            SourceRef::StepOutput { port, .. } => port,
            SourceRef::FlowInput { input } => input,
        }
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceRef::StepOutput { step, port } => write!(f, "{step}.{port}"),
            SourceRef::FlowInput { input } => write!(f, "inputs.{input}"),
        }
    }
}

/// A reference to an input port of a step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    pub step: String,
    pub port: String,
}

impl PortRef {
    pub fn new(step: impl Into<String>, port: impl Into<String>) -> Self {
        PortRef {
            step: step.into(),
            port: port.into(),
        }
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.step, self.port)
    }
}

/// A directed binding from a producer to a consumer input port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from: SourceRef,
    pub to: PortRef,
}

impl Edge {
    pub fn new(from: SourceRef, to: PortRef) -> Self {
        Edge { from, to }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// A compiled workflow graph: steps plus the edges wiring them together.
///
/// The graph preserves the declared step sequence. An edge's producer step
/// never appears later than its consumer step, and the edge list is emitted in
/// consumer declaration order, so compiling the same definition twice yields
/// identical serialized artifacts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    /// Workflow-level inputs supplied by the caller at execution time.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, FlowInput>,

    /// The steps of the graph, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,

    /// The inferred producer-to-consumer bindings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<Edge>,

    /// Workflow-level outputs, each naming its internal producer.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, SourceRef>,
}

impl Graph {
    /// Returns a reference to all steps in the graph.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Look up a step by id.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// The declaration index of a step.
    pub fn step_index(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    /// All edges targeting the given step.
    pub fn edges_into<'a>(&'a self, step: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.to.step == step)
    }

    /// The edge targeting the given input port, if any.
    pub fn edge_to(&self, step: &str, port: &str) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| e.to.step == step && e.to.port == port)
    }

    /// Whether any compound step remains to be inlined.
    pub fn has_compound_steps(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s.kind, StepKind::Workflow { .. }))
    }

    /// Steps carrying a scatter directive that has not been expanded yet.
    ///
    /// A scattered step counts as expanded once its implicit gather step is
    /// present in the graph.
    pub fn unexpanded_scattered_steps(&self) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                matches!(s.kind, StepKind::Task) && !s.scatter.is_empty() && !self.has_gather_for(&s.id)
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn has_gather_for(&self, step_id: &str) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(&s.kind, StepKind::Gather { step } if step == step_id))
    }

    /// Parses a graph from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or cannot be deserialized into a Graph.
    pub fn from_yaml_string(yaml: &str) -> serde_yaml_ng::Result<Self> {
        serde_yaml_ng::from_str(yaml)
    }

    /// Parses a graph from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or cannot be deserialized into a Graph.
    pub fn from_json_string(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serializes the graph to a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be serialized to YAML.
    pub fn to_yaml_string(&self) -> serde_yaml_ng::Result<String> {
        serde_yaml_ng::to_string(self)
    }

    /// Serializes the graph to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be serialized to JSON.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Port, PortType};

    fn sample_graph() -> Graph {
        Graph {
            inputs: IndexMap::new(),
            steps: vec![
                Step::task("make").output(Port::new("x", PortType::File)),
                Step::task("use").input(Port::new("in", PortType::File)),
            ],
            edges: vec![Edge::new(
                SourceRef::step("make", "x"),
                PortRef::new("use", "in"),
            )],
            outputs: IndexMap::new(),
        }
    }

    #[test]
    fn test_source_ref_serialization() {
        let step = SourceRef::step("a", "x");
        assert_eq!(
            serde_json::to_value(&step).unwrap(),
            serde_json::json!({"step": "a", "port": "x"})
        );

        let input = SourceRef::flow_input("threshold");
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            serde_json::json!({"input": "threshold"})
        );

        let back: SourceRef = serde_json::from_str(r#"{"input": "threshold"}"#).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn test_graph_round_trip() {
        let graph = sample_graph();
        let yaml = graph.to_yaml_string().unwrap();
        let back = Graph::from_yaml_string(&yaml).unwrap();
        assert_eq!(graph, back);

        let json = graph.to_json_string().unwrap();
        let back = Graph::from_json_string(&json).unwrap();
        assert_eq!(graph, back);
    }

    #[test]
    fn test_edge_lookup() {
        let graph = sample_graph();
        assert!(graph.edge_to("use", "in").is_some());
        assert!(graph.edge_to("use", "other").is_none());
        assert_eq!(graph.edges_into("use").count(), 1);
        assert_eq!(graph.edges_into("make").count(), 0);
    }

    #[test]
    fn test_display() {
        let edge = Edge::new(SourceRef::step("a", "x"), PortRef::new("b", "in"));
        assert_eq!(edge.to_string(), "a.x -> b.in");
        assert_eq!(SourceRef::flow_input("n").to_string(), "inputs.n");
    }
}
