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

//! Type compatibility between producer and consumer ports.
//!
//! Compatibility is structural and directional: a producer type satisfies a
//! consumer type, never the other way around. Records widen (a producer may
//! carry extra fields), arrays are covariant, and an array producer satisfies
//! a scalar consumer only under a scatter directive.

use wireflow_core::workflow::{PortType, SourceRef};

/// Whether a producer of `producer` can feed a consumer declared as
/// `consumer`.
///
/// `scatter` marks the consumer port as the target of a scatter directive, in
/// which case an array of the consumer's element type is accepted and iterated
/// over by the executor.
pub fn is_compatible(producer: &PortType, consumer: &PortType, scatter: bool) -> bool {
    if scatter {
        match producer.item_type() {
            Some(items) => assignable(items, consumer),
            None => false,
        }
    } else {
        assignable(producer, consumer)
    }
}

/// Structural assignability of a producer type to a consumer type.
fn assignable(producer: &PortType, consumer: &PortType) -> bool {
    match (producer, consumer) {
        (PortType::Array { items: p }, PortType::Array { items: c }) => assignable(p, c),
        (PortType::Record { fields: p }, PortType::Record { fields: c }) => c
            .iter()
            .all(|(name, cty)| p.get(name).is_some_and(|pty| assignable(pty, cty))),
        _ => producer == consumer,
    }
}

/// A producer port that could satisfy a consumer port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub source: SourceRef,
    /// Whether the producer port name equals the consumer port name.
    pub name_match: bool,
}

impl Candidate {
    /// Workflow inputs are a fallback: any step producer outranks them.
    /// Within each group, name matches come first.
    fn tier(&self) -> (bool, bool) {
        let from_step = matches!(self.source, SourceRef::StepOutput { .. });
        (!from_step, !self.name_match)
    }
}

/// Order compatible candidates from best to worst.
///
/// Candidates must be collected in visibility order: most recently declared
/// step first, ports in declaration order within a step, flow inputs last.
/// Ranking promotes step producers over workflow inputs and name matches
/// ahead of everything else within each group; otherwise the collection order
/// is preserved, so the result is total and deterministic.
pub fn rank(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    // Stable: ties keep their visibility order.
    candidates.sort_by_key(Candidate::tier);
    candidates
}

/// The candidates sharing the best rank tier.
///
/// Under the strict ambiguity policy, more than one candidate in this tier is
/// an error; the default policy binds the first.
pub fn best_tier(ranked: &[Candidate]) -> &[Candidate] {
    match ranked.first() {
        Some(best) => {
            let end = ranked
                .iter()
                .position(|c| c.tier() != best.tier())
                .unwrap_or(ranked.len());
            &ranked[..end]
        }
        None => &[],
    }
}
