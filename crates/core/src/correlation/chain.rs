//! Causal chain construction.
//!
//! Walks the chronological event list, and for every event that has related
//! events following it inside the correlation window, builds a
//! [`CausalChainSegment`] with inferred relationships and a timing/dependency
//! confidence score. A segment that cannot be computed is dropped on its own;
//! the rest of the chain is still returned.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::CorrelationPolicy;
use crate::correlation::event::{Event, EventType};
use crate::correlation::rules::{infer_relationships, CausalRelationship};
use crate::correlation::timeline::find_related_indices;
use crate::error::CoreError;

/// A trigger event plus its temporally correlated cascading effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalChainSegment {
    pub trigger_event: Event,
    pub cascading_effects: Vec<Event>,
    pub causal_relationship: Vec<CausalRelationship>,
    pub confidence_score: f64,
    /// Zero-based position in the final, sorted chain.
    pub timeline_position: usize,
}

/// Result of a chain build, including how many segments were dropped.
#[derive(Debug, Clone, Default)]
pub struct ChainBuild {
    pub chain: Vec<CausalChainSegment>,
    pub dropped_segments: usize,
}

pub struct CausalChainBuilder<'a> {
    policy: &'a CorrelationPolicy,
}

impl<'a> CausalChainBuilder<'a> {
    pub fn new(policy: &'a CorrelationPolicy) -> Self {
        Self { policy }
    }

    /// Build the optimised causal chain for a chronologically sorted event list.
    ///
    /// Cascading effects are the related events that do not precede the
    /// trigger. An event becomes a trigger only if it contributes at least
    /// one effect not already claimed by an earlier segment, so a burst of
    /// correlated events collapses into the segment of its earliest member.
    /// A trigger counts as claimed by its own segment.
    pub fn build(&self, events: &[Event]) -> ChainBuild {
        self.assemble(events, |trigger, effects| self.build_segment(trigger, effects))
    }

    /// Walk the events and build a segment per trigger with `make_segment`.
    ///
    /// A failed segment is logged and counted; its events stay unclaimed and
    /// the walk continues with the next event.
    fn assemble<F>(&self, events: &[Event], make_segment: F) -> ChainBuild
    where
        F: Fn(&Event, Vec<Event>) -> Result<CausalChainSegment, CoreError>,
    {
        let mut absorbed = vec![false; events.len()];
        let mut segments = Vec::new();
        let mut dropped_segments = 0;

        for (index, trigger) in events.iter().enumerate() {
            let forward: Vec<usize> = find_related_indices(index, events, self.policy.window_ms)
                .into_iter()
                .filter(|&j| events[j].timestamp >= trigger.timestamp)
                .collect();
            if forward.iter().all(|&j| absorbed[j]) {
                continue;
            }

            let effects: Vec<Event> = forward.iter().map(|&j| events[j].clone()).collect();
            match make_segment(trigger, effects) {
                Ok(segment) => {
                    absorbed[index] = true;
                    for &j in &forward {
                        absorbed[j] = true;
                    }
                    segments.push(segment);
                }
                Err(e) => {
                    dropped_segments += 1;
                    tracing::warn!(
                        server_id = %trigger.server_id,
                        event_type = trigger.event_type.as_str(),
                        error = %e,
                        "Dropping causal chain segment"
                    );
                }
            }
        }

        let built = segments.len();
        let chain = optimize(segments);
        tracing::debug!(
            events = events.len(),
            built,
            kept = chain.len(),
            dropped_segments,
            "Causal chain built"
        );

        ChainBuild {
            chain,
            dropped_segments,
        }
    }

    /// Build one segment. Fails when there are no effects or the timing
    /// score cannot be computed.
    pub fn build_segment(
        &self,
        trigger: &Event,
        effects: Vec<Event>,
    ) -> Result<CausalChainSegment, CoreError> {
        if effects.is_empty() {
            return Err(CoreError::SegmentComputation {
                server_id: trigger.server_id.clone(),
                reason: "trigger has no cascading effects".to_string(),
            });
        }

        let confidence_score = self.score(trigger, &effects);
        if !confidence_score.is_finite() {
            return Err(CoreError::SegmentComputation {
                server_id: trigger.server_id.clone(),
                reason: format!("non-finite confidence score {confidence_score}"),
            });
        }

        Ok(CausalChainSegment {
            causal_relationship: infer_relationships(trigger, &effects),
            trigger_event: trigger.clone(),
            cascading_effects: effects,
            confidence_score,
            timeline_position: 0,
        })
    }

    /// Timing and dependency confidence for a trigger and its effects,
    /// always within `[0, 1]`.
    pub fn score(&self, trigger: &Event, effects: &[Event]) -> f64 {
        let p = self.policy;
        let mut score = p.base_confidence;

        if let Some(mean_ms) = mean_abs_delta_ms(trigger, effects) {
            if mean_ms < p.tight_window_ms as f64 {
                score += p.tight_bonus;
            } else if mean_ms < p.loose_window_ms as f64 {
                score += p.loose_bonus;
            }
        }

        let trigger_tier = trigger.tier();
        if effects
            .iter()
            .any(|effect| trigger_tier.has_dependent(effect.tier()))
        {
            score += p.dependency_bonus;
        }

        score.clamp(0.0, 1.0)
    }
}

/// Mean absolute time distance between the trigger and its effects.
fn mean_abs_delta_ms(trigger: &Event, effects: &[Event]) -> Option<f64> {
    if effects.is_empty() {
        return None;
    }
    let total: f64 = effects
        .iter()
        .map(|e| (e.timestamp - trigger.timestamp).num_milliseconds().abs() as f64)
        .sum();
    Some(total / effects.len() as f64)
}

/// Drop segments whose trigger (server, event type) was already seen earlier
/// in time, then sort by timestamp ascending and confidence descending.
///
/// Output length never exceeds input length.
pub fn optimize(mut segments: Vec<CausalChainSegment>) -> Vec<CausalChainSegment> {
    segments.sort_by(|a, b| {
        a.trigger_event
            .timestamp
            .cmp(&b.trigger_event.timestamp)
            .then_with(|| b.confidence_score.total_cmp(&a.confidence_score))
    });

    let mut seen: HashSet<(String, EventType)> = HashSet::new();
    segments.retain(|segment| {
        let (server, event_type) = segment.trigger_event.key();
        seen.insert((server.to_string(), event_type))
    });

    for (position, segment) in segments.iter_mut().enumerate() {
        segment.timeline_position = position;
    }
    segments
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
