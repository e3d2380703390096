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

use thiserror::Error;

/// Structural failures found while validating a compiled graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate step id '{0}'")]
    DuplicateStepId(String),

    #[error("Step has empty id")]
    EmptyStepId,

    #[error("Graph contains a cycle involving steps: {}", steps.join(", "))]
    Cycle { steps: Vec<String> },

    #[error("Required input '{port}' of step '{step}' has no incoming edge")]
    UnsatisfiedPort { step: String, port: String },

    #[error("Input '{port}' of step '{step}' has {count} incoming edges")]
    DuplicateEdge {
        step: String,
        port: String,
        count: usize,
    },

    #[error("Edge references unknown step '{0}'")]
    UnknownStep(String),

    #[error("Edge references unknown port '{port}' on step '{step}'")]
    UnknownPort { step: String, port: String },

    #[error("Edge references unknown workflow input '{0}'")]
    UnknownFlowInput(String),

    #[error("Step '{0}' has an edge to itself")]
    SelfEdge(String),

    #[error("Edge from '{from}' to '{to}' runs against declaration order")]
    OrderViolation { from: String, to: String },

    #[error("Graphs expected to be equivalent are not isomorphic: {}", reasons.join("; "))]
    StructuralMismatch { reasons: Vec<String> },
}

pub type Result<T> = error_stack::Result<T, ValidationError>;
