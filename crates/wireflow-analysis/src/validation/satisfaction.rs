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

use error_stack::report;
use wireflow_core::workflow::Graph;

use crate::{Result, ValidationError};

/// Every required input port has exactly one incoming edge; no port has more
/// than one. Optional ports and ports with defaults may stay unconnected.
pub(crate) fn validate_satisfaction(graph: &Graph) -> Result<()> {
    for step in graph.steps() {
        for port in step.effective_inputs() {
            let count = graph
                .edges
                .iter()
                .filter(|e| e.to.step == step.id && e.to.port == port.id)
                .count();
            if count > 1 {
                return Err(report!(ValidationError::DuplicateEdge {
                    step: step.id.clone(),
                    port: port.id.clone(),
                    count,
                }));
            }
            if count == 0 && port.needs_edge() {
                return Err(report!(ValidationError::UnsatisfiedPort {
                    step: step.id.clone(),
                    port: port.id.clone(),
                }));
            }
        }
    }
    Ok(())
}
