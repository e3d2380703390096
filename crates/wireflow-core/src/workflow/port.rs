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

use super::SourceRef;

/// The declared type of a port.
///
/// Types are structural: two ports are compatible based on the shape of their
/// types, not on where they were declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PortType {
    Boolean,
    Int,
    Float,
    String,
    /// A reference to a file-like artifact produced or consumed by a step.
    File,
    /// A homogeneous collection of `items`.
    Array { items: Box<PortType> },
    /// A named collection of typed fields.
    Record { fields: IndexMap<String, PortType> },
}

impl PortType {
    /// Create an array type over the given item type.
    pub fn array(items: PortType) -> Self {
        PortType::Array {
            items: Box::new(items),
        }
    }

    /// Create a record type from the given fields.
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, PortType)>,
        S: Into<String>,
    {
        PortType::Record {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, PortType::Array { .. })
    }

    /// The item type, if this is an array type.
    pub fn item_type(&self) -> Option<&PortType> {
        match self {
            PortType::Array { items } => Some(items),
            _ => None,
        }
    }
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortType::Boolean => write!(f, "boolean"),
            PortType::Int => write!(f, "int"),
            PortType::Float => write!(f, "float"),
            PortType::String => write!(f, "string"),
            PortType::File => write!(f, "file"),
            PortType::Array { items } => write!(f, "array<{items}>"),
            PortType::Record { fields } => {
                write!(f, "record{{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A named, typed input or output slot on a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Identifier for the port, unique within its step.
    pub id: String,

    /// The declared type of values flowing through this port.
    #[serde(rename = "type")]
    pub ty: PortType,

    /// Whether a value must be supplied. Defaults to true.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub required: bool,

    /// Fallback value used when the port is left unconnected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    /// Explicit wiring override. When set, edge inference binds this port to
    /// the named producer instead of searching for a compatible candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
}

impl Port {
    /// Create a required port with the given id and type.
    pub fn new(id: impl Into<String>, ty: PortType) -> Self {
        Port {
            id: id.into(),
            ty,
            required: true,
            default: None,
            source: None,
        }
    }

    /// Mark the port as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Attach a default value.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Attach an explicit wiring override.
    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.source = Some(source);
        self
    }

    /// Whether the port must receive an incoming edge.
    ///
    /// A port with a default is satisfied by that default even when required.
    pub fn needs_edge(&self) -> bool {
        self.required && self.default.is_none()
    }
}

/// A workflow-level input declaration.
///
/// Flow inputs participate in edge inference as producers declared before
/// every step. When the flow is embedded as a compound step, they become the
/// step's boundary input ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowInput {
    /// The declared type of the input.
    #[serde(rename = "type")]
    pub ty: PortType,

    /// Whether a value must be supplied. Defaults to true.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub required: bool,

    /// Fallback value used when the input is left unconnected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl FlowInput {
    pub fn new(ty: PortType) -> Self {
        FlowInput {
            ty,
            required: true,
            default: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}
