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

pub mod executor;
pub mod flow_schema;
pub mod workflow;

// Re-export commonly used types
pub use executor::{Executor, StepError, StepResult};
pub use workflow::{Edge, Flow, FlowBuilder, FlowInput, Graph, Port, PortRef, PortType, SourceRef, Step, StepKind};
