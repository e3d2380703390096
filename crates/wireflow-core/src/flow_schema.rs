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

//! Machine-readable schemas for workflow documents.
//!
//! External validators consume these schemas to check step and port
//! declarations before compilation. Generation is a pure function of the data
//! model; the returned document is the only effect.

use schemars::{Schema, schema_for};

use crate::workflow::{Flow, Graph};

/// The JSON Schema describing valid workflow definitions.
pub fn flow_schema() -> Schema {
    schema_for!(Flow)
}

/// The JSON Schema describing compiled graph artifacts.
pub fn graph_schema() -> Schema {
    schema_for!(Graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_schema_declares_model_types() {
        let schema = serde_json::to_value(flow_schema()).unwrap();
        let defs = schema
            .get("$defs")
            .and_then(|d| d.as_object())
            .expect("schema has definitions");
        assert!(defs.contains_key("Step"));
        assert!(defs.contains_key("Port"));
        assert!(defs.contains_key("PortType"));
    }

    #[test]
    fn test_schema_generation_is_deterministic() {
        let first = serde_json::to_value(flow_schema()).unwrap();
        let second = serde_json::to_value(flow_schema()).unwrap();
        assert_eq!(first, second);

        let first = serde_json::to_value(graph_schema()).unwrap();
        let second = serde_json::to_value(graph_schema()).unwrap();
        assert_eq!(first, second);
    }
}
