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

/// Errors produced while compiling a workflow definition into a graph.
///
/// Every variant names the offending step and port so a failure can be acted
/// on without re-running the compiler under a debugger.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Duplicate step id '{0}'")]
    DuplicateStepId(String),

    #[error("Step has empty id")]
    EmptyStepId,

    #[error("No compatible producer for required input '{port}' of step '{step}'")]
    UnsatisfiedPort { step: String, port: String },

    #[error("Ambiguous producers for input '{port}' of step '{step}': {}", candidates.join(", "))]
    AmbiguousPort {
        step: String,
        port: String,
        candidates: Vec<String>,
    },

    #[error("Boundary port '{port}' of compound step '{step}' has no internal counterpart")]
    DanglingPort { step: String, port: String },

    #[error("Unknown source '{src}' for input '{port}' of step '{step}'")]
    UnknownSource {
        step: String,
        port: String,
        src: String,
    },

    #[error("Source '{src}' for input '{port}' of step '{step}' has incompatible type")]
    IncompatibleSource {
        step: String,
        port: String,
        src: String,
    },

    #[error("Step '{0}' cannot consume its own output")]
    SelfReference(String),

    #[error("Scatter directive on step '{step}' names unknown input port '{port}'")]
    UnknownScatterPort { step: String, port: String },

    #[error("Scatter directive on compound step '{0}' is not supported; scatter the steps inside it")]
    ScatterOnCompound(String),

    #[error("Scattered inputs of step '{step}' have mismatched lengths: {}", lengths.iter().map(|(p, n)| format!("{p}={n}")).collect::<Vec<_>>().join(", "))]
    ScatterLengthMismatch {
        step: String,
        lengths: Vec<(String, usize)>,
    },

    #[error("Workflow output '{output}' references unknown source '{src}'")]
    UnknownOutput { output: String, src: String },

    #[error("Workflow did not reach a fixed point after {0} expansion passes")]
    FixpointExceeded(usize),
}

pub type Result<T, E = error_stack::Report<CompileError>> = std::result::Result<T, E>;
