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

use serde::{Deserialize, Serialize};

/// The severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticLevel {
    /// Advisory; the artifact is still produced.
    Warning,
    /// Likely to fail at execution time.
    Error,
    /// The graph is structurally unusable.
    Fatal,
}

/// Advisory and non-blocking findings about a compiled graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum DiagnosticMessage {
    /// An output port no edge or workflow output consumes.
    #[error("Output '{port}' of step '{step}' is never consumed")]
    UnreferencedStepOutput { step: String, port: String },

    /// An isomorphism check ran out of its time budget. Not a failure; the
    /// comparison is reported as inconclusive.
    #[error("Isomorphism check inconclusive after {elapsed_ms}ms")]
    IsomorphismInconclusive { elapsed_ms: u64 },
}

impl DiagnosticMessage {
    pub fn level(&self) -> DiagnosticLevel {
        match self {
            DiagnosticMessage::UnreferencedStepOutput { .. } => DiagnosticLevel::Warning,
            DiagnosticMessage::IsomorphismInconclusive { .. } => DiagnosticLevel::Warning,
        }
    }
}

/// A single diagnostic with its context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// The diagnostic message and type.
    pub message: DiagnosticMessage,
    /// The severity level.
    pub level: DiagnosticLevel,
    /// Human-readable message text.
    pub text: String,
}

impl Diagnostic {
    /// Create a new diagnostic from a message.
    pub fn new(message: DiagnosticMessage) -> Self {
        let level = message.level();
        let text = message.to_string();
        Self {
            message,
            level,
            text,
        }
    }
}

/// Collection of diagnostics with utility methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// All diagnostics found.
    pub diagnostics: Vec<Diagnostic>,
    pub num_fatal: u32,
    pub num_error: u32,
    pub num_warning: u32,
}

impl Diagnostics {
    /// Create a new empty diagnostics collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic.
    pub fn add(&mut self, message: DiagnosticMessage) {
        match message.level() {
            DiagnosticLevel::Fatal => self.num_fatal += 1,
            DiagnosticLevel::Error => self.num_error += 1,
            DiagnosticLevel::Warning => self.num_warning += 1,
        }
        self.diagnostics.push(Diagnostic::new(message));
    }

    pub fn extend(&mut self, mut other: Diagnostics) {
        self.num_fatal += other.num_fatal;
        self.num_error += other.num_error;
        self.num_warning += other.num_warning;
        self.diagnostics.append(&mut other.diagnostics);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.diagnostics.iter()
    }

    /// Check if there are any fatal diagnostics.
    pub fn has_fatal(&self) -> bool {
        self.num_fatal > 0
    }

    /// Get all diagnostics at a specific level.
    pub fn at_level(&self, level: DiagnosticLevel) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.diagnostics.iter().filter(move |d| d.level == level)
    }

    /// Check if diagnostics are empty.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Get total count of diagnostics.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}
