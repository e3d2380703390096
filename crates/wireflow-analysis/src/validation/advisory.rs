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

use wireflow_core::workflow::Graph;

use crate::diagnostics::{DiagnosticMessage, Diagnostics};

/// Non-blocking findings: dead outputs and similar housekeeping.
pub(crate) fn collect_advisories(graph: &Graph, diagnostics: &mut Diagnostics) {
    for step in graph.steps() {
        for port in &step.outputs {
            let consumed = graph.edges.iter().any(|e| {
                e.from.step_id() == Some(step.id.as_str()) && e.from.port_name() == port.id
            });
            let exported = graph.outputs.values().any(|s| {
                s.step_id() == Some(step.id.as_str()) && s.port_name() == port.id
            });
            if !consumed && !exported {
                diagnostics.add(DiagnosticMessage::UnreferencedStepOutput {
                    step: step.id.clone(),
                    port: port.id.clone(),
                });
            }
        }
    }
}
