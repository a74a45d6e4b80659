//! Root-cause inference.
//!
//! Hypotheses are looked up from two fixed tables keyed on the earliest
//! trigger's event type and its server tier. The most confident hypothesis
//! becomes the primary root cause, its confidence discounted by chain
//! length.

use serde::{Deserialize, Serialize};

use crate::config::RootCausePolicy;
use crate::correlation::{CausalChainSegment, EventType};
use crate::propagation::PropagationPattern;
use crate::tier::ServiceTier;

pub const NO_INCIDENT_SUMMARY: &str = "no incident detected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCauseCategory {
    ResourceExhaustion,
    MemoryLeak,
    NetworkCongestion,
    StorageSaturation,
    ServiceFailure,
    DatabaseBottleneck,
    KubernetesIssue,
}

impl RootCauseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceExhaustion => "resource_exhaustion",
            Self::MemoryLeak => "memory_leak",
            Self::NetworkCongestion => "network_congestion",
            Self::StorageSaturation => "storage_saturation",
            Self::ServiceFailure => "service_failure",
            Self::DatabaseBottleneck => "database_bottleneck",
            Self::KubernetesIssue => "kubernetes_issue",
        }
    }

    fn technical_explanation(&self) -> &'static str {
        match self {
            Self::ResourceExhaustion => {
                "CPU saturation on the originating server starved request handling"
            }
            Self::MemoryLeak => {
                "Memory consumption kept growing until the server came under memory pressure"
            }
            Self::NetworkCongestion => {
                "Elevated network latency delayed traffic between dependent services"
            }
            Self::StorageSaturation => {
                "Disk I/O demand exceeded what the storage layer could serve"
            }
            Self::ServiceFailure => {
                "A required service stopped and its clients lost their backend"
            }
            Self::DatabaseBottleneck => {
                "The database tier became the bottleneck for every tier above it"
            }
            Self::KubernetesIssue => {
                "Cluster orchestration problems disrupted scheduled workloads"
            }
        }
    }

    fn probable_triggers(&self) -> &'static [&'static str] {
        match self {
            Self::ResourceExhaustion => {
                &["traffic surge", "runaway process", "inefficient batch job"]
            }
            Self::MemoryLeak => &["unreleased object references", "unbounded cache growth"],
            Self::NetworkCongestion => {
                &["bandwidth saturation", "packet loss", "misrouted traffic"]
            }
            Self::StorageSaturation => &["heavy write workload", "backup or compaction job"],
            Self::ServiceFailure => &["crash loop", "failed deployment", "dependency outage"],
            Self::DatabaseBottleneck => {
                &["slow queries", "lock contention", "connection pool exhaustion"]
            }
            Self::KubernetesIssue => {
                &["node pressure eviction", "pod scheduling failure", "control plane degradation"]
            }
        }
    }

    fn immediate_fix(&self) -> &'static str {
        match self {
            Self::ResourceExhaustion => "Scale out or throttle the heaviest workload",
            Self::MemoryLeak => "Restart the affected process and capture a heap profile",
            Self::NetworkCongestion => "Check link utilisation and reroute or rate-limit traffic",
            Self::StorageSaturation => "Pause background I/O jobs and add storage throughput",
            Self::ServiceFailure => "Restart the stopped service and review its last logs",
            Self::DatabaseBottleneck => "Kill long-running queries and review the slow query log",
            Self::KubernetesIssue => "Inspect node conditions and reschedule failing pods",
        }
    }

    /// Hypothesis and base confidence suggested by a trigger's event type.
    fn for_event_type(event_type: EventType) -> Option<(Self, f64)> {
        match event_type {
            EventType::HighCpu => Some((RootCauseCategory::ResourceExhaustion, 0.85)),
            EventType::MemoryPressure => Some((RootCauseCategory::MemoryLeak, 0.8)),
            EventType::MemoryLeak => Some((RootCauseCategory::MemoryLeak, 0.9)),
            EventType::NetworkLatency => Some((RootCauseCategory::NetworkCongestion, 0.75)),
            EventType::DiskIoBottleneck => Some((RootCauseCategory::StorageSaturation, 0.8)),
            EventType::ServiceDown => Some((RootCauseCategory::ServiceFailure, 0.85)),
            EventType::DiskPressure
            | EventType::CpuSpike
            | EventType::CpuDeviation
            | EventType::MemoryDeviation
            | EventType::DiskDeviation
            | EventType::ConnectionTimeout
            | EventType::NetworkErrors => None,
        }
    }

    /// Hypothesis and base confidence suggested by a trigger's tier.
    fn for_tier(tier: ServiceTier) -> Option<(Self, f64)> {
        match tier {
            ServiceTier::Database => Some((RootCauseCategory::DatabaseBottleneck, 0.8)),
            ServiceTier::Orchestration => Some((RootCauseCategory::KubernetesIssue, 0.7)),
            ServiceTier::Cache
            | ServiceTier::Application
            | ServiceTier::Api
            | ServiceTier::Web
            | ServiceTier::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseHypothesis {
    pub category: RootCauseCategory,
    pub technical_explanation: String,
    pub confidence: f64,
    pub probable_triggers: Vec<String>,
    pub immediate_fix: String,
}

impl RootCauseHypothesis {
    pub fn new(category: RootCauseCategory, confidence: f64) -> Self {
        Self {
            category,
            technical_explanation: category.technical_explanation().to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            probable_triggers: category
                .probable_triggers()
                .iter()
                .map(|t| t.to_string())
                .collect(),
            immediate_fix: category.immediate_fix().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    /// No causal chain in range.
    Stable,
    Identified,
    /// A chain exists but no hypothesis matched its earliest trigger.
    Undetermined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseAnalysis {
    pub primary_root_cause: Option<RootCauseHypothesis>,
    pub confidence: f64,
    pub propagation_pattern: PropagationPattern,
    pub status: IncidentStatus,
    pub summary: String,
    pub alternative_hypotheses: Vec<RootCauseHypothesis>,
}

/// Candidate hypotheses for a trigger, event-type table first.
pub fn gather_hypotheses(event_type: EventType, tier: ServiceTier) -> Vec<RootCauseHypothesis> {
    let mut hypotheses: Vec<RootCauseHypothesis> = Vec::with_capacity(2);
    for (category, confidence) in [
        RootCauseCategory::for_event_type(event_type),
        RootCauseCategory::for_tier(tier),
    ]
    .into_iter()
    .flatten()
    {
        if hypotheses.iter().all(|h| h.category != category) {
            hypotheses.push(RootCauseHypothesis::new(category, confidence));
        }
    }
    hypotheses
}

/// Highest-confidence hypothesis; the first one wins ties.
pub fn select_most_likely(hypotheses: &[RootCauseHypothesis]) -> Option<&RootCauseHypothesis> {
    hypotheses.iter().fold(None, |best, h| match best {
        Some(b) if b.confidence >= h.confidence => Some(b),
        _ => Some(h),
    })
}

/// `base * max(min_factor, 1 - discount * chain_length)`, clamped to `[0, 1]`.
pub fn final_confidence(base: f64, chain_length: usize, policy: &RootCausePolicy) -> f64 {
    let factor = (1.0 - policy.discount_per_segment * chain_length as f64)
        .max(policy.min_discount_factor);
    (base * factor).clamp(0.0, 1.0)
}

/// Infer the root cause of a sorted causal chain.
pub fn infer_root_cause(
    chain: &[CausalChainSegment],
    propagation_pattern: PropagationPattern,
    policy: &RootCausePolicy,
) -> RootCauseAnalysis {
    let Some(earliest) = chain.iter().min_by_key(|s| s.trigger_event.timestamp) else {
        return RootCauseAnalysis {
            primary_root_cause: None,
            confidence: 0.0,
            propagation_pattern,
            status: IncidentStatus::Stable,
            summary: NO_INCIDENT_SUMMARY.to_string(),
            alternative_hypotheses: Vec::new(),
        };
    };

    let trigger = &earliest.trigger_event;
    let mut hypotheses = gather_hypotheses(trigger.event_type, trigger.tier());

    let Some(primary) = select_most_likely(&hypotheses).cloned() else {
        tracing::debug!(
            server_id = %trigger.server_id,
            event_type = trigger.event_type.as_str(),
            "No root-cause hypothesis for earliest trigger"
        );
        return RootCauseAnalysis {
            primary_root_cause: None,
            confidence: 0.0,
            propagation_pattern,
            status: IncidentStatus::Undetermined,
            summary: format!(
                "root cause undetermined: {} on {} matches no known hypothesis",
                trigger.event_type.as_str(),
                trigger.server_id
            ),
            alternative_hypotheses: Vec::new(),
        };
    };

    hypotheses.retain(|h| h.category != primary.category);
    let confidence = final_confidence(primary.confidence, chain.len(), policy);
    let summary = format!(
        "{} originating at {} ({}), {} propagation across {} segment(s)",
        primary.category.as_str(),
        trigger.server_id,
        trigger.event_type.as_str(),
        propagation_pattern.as_str(),
        chain.len()
    );

    RootCauseAnalysis {
        primary_root_cause: Some(primary),
        confidence,
        propagation_pattern,
        status: IncidentStatus::Identified,
        summary,
        alternative_hypotheses: hypotheses,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::alert::Severity;
    use crate::correlation::Event;

    fn segment(server: &str, event_type: EventType, offset_secs: i64) -> CausalChainSegment {
        let at = |s: &str, t: i64| Event {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(t),
            server_id: s.to_string(),
            event_type,
            severity: Severity::Critical,
            metric_values: BTreeMap::new(),
            description: String::new(),
        };
        CausalChainSegment {
            trigger_event: at(server, offset_secs),
            cascading_effects: vec![at("web-01", offset_secs + 30)],
            causal_relationship: Vec::new(),
            confidence_score: 0.8,
            timeline_position: 0,
        }
    }

    // -- confidence discount --

    #[test]
    fn four_segment_chain_discounts_to_eighty_percent() {
        let c = final_confidence(0.9, 4, &RootCausePolicy::default());
        assert!((c - 0.72).abs() < 1e-9);
    }

    #[test]
    fn discount_factor_never_drops_below_half() {
        let c = final_confidence(0.8, 40, &RootCausePolicy::default());
        assert!((c - 0.4).abs() < 1e-9);
    }

    // -- hypothesis tables --

    #[test]
    fn database_cpu_trigger_yields_two_hypotheses() {
        let hyps = gather_hypotheses(EventType::HighCpu, ServiceTier::Database);
        let cats: Vec<_> = hyps.iter().map(|h| h.category).collect();
        assert_eq!(
            cats,
            vec![
                RootCauseCategory::ResourceExhaustion,
                RootCauseCategory::DatabaseBottleneck
            ]
        );
        assert_eq!(
            select_most_likely(&hyps).map(|h| h.category),
            Some(RootCauseCategory::ResourceExhaustion)
        );
    }

    #[test]
    fn ties_keep_the_first_hypothesis() {
        let hyps = gather_hypotheses(EventType::MemoryPressure, ServiceTier::Database);
        assert_eq!(hyps[0].confidence, hyps[1].confidence);
        assert_eq!(
            select_most_likely(&hyps).map(|h| h.category),
            Some(RootCauseCategory::MemoryLeak)
        );
    }

    #[test]
    fn leak_trigger_is_more_confident_than_pressure() {
        let leak = gather_hypotheses(EventType::MemoryLeak, ServiceTier::Application);
        let pressure = gather_hypotheses(EventType::MemoryPressure, ServiceTier::Application);
        assert_eq!(leak[0].category, pressure[0].category);
        assert_eq!(leak[0].confidence, 0.9);
        assert_eq!(pressure[0].confidence, 0.8);
    }

    #[test]
    fn unmatched_trigger_has_no_hypotheses() {
        assert!(gather_hypotheses(EventType::CpuDeviation, ServiceTier::Web).is_empty());
        assert!(select_most_likely(&[]).is_none());
    }

    // -- infer_root_cause --

    #[test]
    fn empty_chain_is_stable() {
        let rca = infer_root_cause(&[], PropagationPattern::None, &RootCausePolicy::default());
        assert_eq!(rca.status, IncidentStatus::Stable);
        assert!(rca.primary_root_cause.is_none());
        assert_eq!(rca.confidence, 0.0);
        assert_eq!(rca.summary, NO_INCIDENT_SUMMARY);
    }

    #[test]
    fn earliest_trigger_drives_the_primary_cause() {
        let chain = vec![
            segment("app-01", EventType::MemoryLeak, 120),
            segment("db-01", EventType::HighCpu, 0),
        ];
        let rca = infer_root_cause(
            &chain,
            PropagationPattern::TieredPropagation,
            &RootCausePolicy::default(),
        );
        assert_eq!(rca.status, IncidentStatus::Identified);
        let primary = rca.primary_root_cause.as_ref().unwrap();
        assert_eq!(primary.category, RootCauseCategory::ResourceExhaustion);
        assert!(!primary.immediate_fix.is_empty());
        assert!((rca.confidence - 0.85 * 0.9).abs() < 1e-9);
        assert_eq!(rca.alternative_hypotheses.len(), 1);
        assert_eq!(
            rca.alternative_hypotheses[0].category,
            RootCauseCategory::DatabaseBottleneck
        );
        assert!(rca.summary.contains("db-01"));
    }

    #[test]
    fn unmatched_chain_is_undetermined() {
        let chain = vec![segment("web-01", EventType::ConnectionTimeout, 0)];
        let rca = infer_root_cause(&chain, PropagationPattern::Random, &RootCausePolicy::default());
        assert_eq!(rca.status, IncidentStatus::Undetermined);
        assert_eq!(rca.confidence, 0.0);
        assert!(rca.primary_root_cause.is_none());
    }

    #[test]
    fn serializes_categories_in_snake_case() {
        let hyps = gather_hypotheses(EventType::CpuSpike, ServiceTier::Orchestration);
        let json = serde_json::to_value(&hyps[0]).unwrap();
        assert_eq!(json["category"], "kubernetes_issue");
        assert_eq!(json["confidence"], 0.7);
    }
}
