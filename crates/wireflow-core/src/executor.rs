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

//! The executor boundary.
//!
//! The compiler hands a validated [`Graph`](crate::workflow::Graph) to an
//! executor and receives one [`StepResult`] per step. Scheduling, retries, and
//! resource accounting live entirely on the executor side.

use std::borrow::Cow;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::workflow::Graph;

/// An error reported from a step execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepError {
    pub code: i64,
    pub message: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl StepError {
    pub fn new(code: i64, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data<D: serde::Serialize>(self, data: D) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_value(data)?;
        Ok(Self {
            data: Some(data),
            ..self
        })
    }
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error({}): {}", self.code, self.message)
    }
}

/// The result of executing one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum StepResult {
    /// # Success
    /// The step succeeded and produced the given output values, keyed by
    /// output port id.
    Success {
        outputs: IndexMap<String, serde_json::Value>,
    },
    /// # Skipped
    /// The step was skipped.
    Skipped,
    /// # Failed
    /// The step failed with the given error.
    Failed { error: StepError },
}

impl StepResult {
    pub fn success(outputs: IndexMap<String, serde_json::Value>) -> Self {
        StepResult::Success { outputs }
    }

    pub fn failed(error: StepError) -> Self {
        StepResult::Failed { error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepResult::Success { .. })
    }
}

/// Executes compiled graphs.
///
/// Implementations receive the validated artifact and an input document and
/// report one result per step, keyed by step id. The compiler does not consume
/// these results further.
pub trait Executor {
    type Error;

    fn execute(
        &mut self,
        graph: &Graph,
        inputs: &IndexMap<String, serde_json::Value>,
    ) -> Result<IndexMap<String, StepResult>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn test_step_result_serialization() {
        let success = StepResult::success(indexmap! {
            "out".to_string() => serde_json::json!("path/to/file"),
        });
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            serde_json::json!({"outcome": "success", "outputs": {"out": "path/to/file"}})
        );

        let skipped = StepResult::Skipped;
        assert_eq!(
            serde_json::to_value(&skipped).unwrap(),
            serde_json::json!({"outcome": "skipped"})
        );

        let failed = StepResult::failed(StepError::new(2, "tool exited nonzero"));
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["outcome"], "failed");
        assert_eq!(value["error"]["code"], 2);
    }

    #[test]
    fn test_step_result_round_trip() {
        let failed = StepResult::failed(
            StepError::new(1, "bad input")
                .with_data(serde_json::json!({"port": "in"}))
                .unwrap(),
        );
        let json = serde_json::to_string(&failed).unwrap();
        let back: StepResult = serde_json::from_str(&json).unwrap();
        assert_eq!(failed, back);
    }
}
