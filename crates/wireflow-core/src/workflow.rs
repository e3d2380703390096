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

//! The workflow data model: ports, steps, flows, and compiled graphs.

mod builders;
mod flow;
mod graph;
mod port;
mod step;

pub use builders::FlowBuilder;
pub use flow::Flow;
pub use graph::{Edge, Graph, PortRef, SourceRef};
pub use port::{FlowInput, Port, PortType};
pub use step::{Step, StepKind};
