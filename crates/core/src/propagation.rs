//! Propagation shape of a causal chain.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::PropagationPolicy;
use crate::correlation::CausalChainSegment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationPattern {
    /// Triggers walk the tier path in one direction.
    TieredPropagation,
    /// Many distinct servers fan out from a few triggers.
    RadialPropagation,
    Random,
    None,
}

impl PropagationPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationPattern::TieredPropagation => "tiered_propagation",
            PropagationPattern::RadialPropagation => "radial_propagation",
            PropagationPattern::Random => "random",
            PropagationPattern::None => "none",
        }
    }
}

/// Classify how an incident spread across tiers and servers.
///
/// Returns [`PropagationPattern::None`] exactly when the chain is empty.
pub fn analyze_propagation(
    chain: &[CausalChainSegment],
    policy: &PropagationPolicy,
) -> PropagationPattern {
    if chain.is_empty() {
        return PropagationPattern::None;
    }

    let tiers: Vec<usize> = chain
        .iter()
        .filter_map(|segment| segment.trigger_event.tier().index())
        .collect();
    if !tiers.is_empty() && is_monotonic(&tiers) {
        return PropagationPattern::TieredPropagation;
    }

    let mentions: Vec<&str> = chain
        .iter()
        .flat_map(|segment| {
            std::iter::once(segment.trigger_event.server_id.as_str()).chain(
                segment
                    .cascading_effects
                    .iter()
                    .map(|effect| effect.server_id.as_str()),
            )
        })
        .collect();
    let unique: HashSet<&str> = mentions.iter().copied().collect();
    let ratio = unique.len() as f64 / mentions.len() as f64;
    if unique.len() > policy.radial_min_servers && ratio > policy.radial_unique_ratio {
        return PropagationPattern::RadialPropagation;
    }

    PropagationPattern::Random
}

fn is_monotonic(values: &[usize]) -> bool {
    let non_decreasing = values.windows(2).all(|w| w[0] <= w[1]);
    let non_increasing = values.windows(2).all(|w| w[0] >= w[1]);
    non_decreasing || non_increasing
}
