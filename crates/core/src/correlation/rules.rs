//! Causal relationship rule table.
//!
//! Each rule matches a (trigger, effect) pair by tier and/or event type and
//! carries a fixed base confidence. Rules are independent hypotheses: every
//! rule that matches at least one effect contributes exactly one
//! relationship to the segment, and confidences are never combined.

use serde::{Deserialize, Serialize};

use crate::correlation::event::{Event, EventType};
use crate::tier::ServiceTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipRule {
    DatabaseDependency,
    CacheDependency,
    ApplicationDependency,
    ApiDependency,
    OrchestrationCascade,
    ResourceCompetition,
    NetworkPropagation,
    MemoryExhaustion,
    IoContention,
    ServiceUnavailability,
}

impl RelationshipRule {
    /// Every rule, in evaluation order.
    pub const ALL: [RelationshipRule; 10] = [
        RelationshipRule::DatabaseDependency,
        RelationshipRule::CacheDependency,
        RelationshipRule::ApplicationDependency,
        RelationshipRule::ApiDependency,
        RelationshipRule::OrchestrationCascade,
        RelationshipRule::ResourceCompetition,
        RelationshipRule::NetworkPropagation,
        RelationshipRule::MemoryExhaustion,
        RelationshipRule::IoContention,
        RelationshipRule::ServiceUnavailability,
    ];

    pub fn base_confidence(&self) -> f64 {
        match self {
            RelationshipRule::DatabaseDependency => 0.9,
            RelationshipRule::CacheDependency => 0.8,
            RelationshipRule::ApplicationDependency => 0.8,
            RelationshipRule::ApiDependency => 0.8,
            RelationshipRule::OrchestrationCascade => 0.85,
            RelationshipRule::ResourceCompetition => 0.8,
            RelationshipRule::NetworkPropagation => 0.85,
            RelationshipRule::MemoryExhaustion => 0.9,
            RelationshipRule::IoContention => 0.8,
            RelationshipRule::ServiceUnavailability => 0.85,
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            RelationshipRule::DatabaseDependency => {
                "Database degradation slows every query issued by dependent tiers"
            }
            RelationshipRule::CacheDependency => {
                "Cache degradation pushes load onto slower backends for dependent tiers"
            }
            RelationshipRule::ApplicationDependency => {
                "Application tier slowness surfaces as latency in the API and web tiers"
            }
            RelationshipRule::ApiDependency => "API slowness propagates to web frontends",
            RelationshipRule::OrchestrationCascade => {
                "Cluster-level disruption affects workloads scheduled on it"
            }
            RelationshipRule::ResourceCompetition => {
                "CPU-bound work on the tier competes for memory and forces pressure"
            }
            RelationshipRule::NetworkPropagation => {
                "Network latency exhausts client timeouts and causes connection failures"
            }
            RelationshipRule::MemoryExhaustion => {
                "Sustained memory growth exhausts available memory on the server"
            }
            RelationshipRule::IoContention => {
                "Disk I/O saturation stalls request processing and raises CPU wait"
            }
            RelationshipRule::ServiceUnavailability => {
                "A stopped service leaves its clients waiting until they time out"
            }
        }
    }

    /// Whether this rule links `trigger` to `effect`.
    pub fn matches(&self, trigger: &Event, effect: &Event) -> bool {
        let (t_tier, e_tier) = (trigger.tier(), effect.tier());
        match self {
            RelationshipRule::DatabaseDependency => {
                t_tier == ServiceTier::Database && t_tier.has_dependent(e_tier)
            }
            RelationshipRule::CacheDependency => {
                t_tier == ServiceTier::Cache && t_tier.has_dependent(e_tier)
            }
            RelationshipRule::ApplicationDependency => {
                t_tier == ServiceTier::Application && t_tier.has_dependent(e_tier)
            }
            RelationshipRule::ApiDependency => {
                t_tier == ServiceTier::Api && e_tier == ServiceTier::Web
            }
            RelationshipRule::OrchestrationCascade => {
                t_tier == ServiceTier::Orchestration && effect.server_id != trigger.server_id
            }
            RelationshipRule::ResourceCompetition => {
                matches!(trigger.event_type, EventType::HighCpu | EventType::CpuSpike)
                    && effect.event_type == EventType::MemoryPressure
                    && t_tier == e_tier
            }
            RelationshipRule::NetworkPropagation => {
                trigger.event_type == EventType::NetworkLatency
                    && effect.event_type == EventType::ConnectionTimeout
            }
            RelationshipRule::MemoryExhaustion => {
                trigger.event_type == EventType::MemoryLeak
                    && effect.event_type == EventType::MemoryPressure
                    && trigger.server_id == effect.server_id
            }
            RelationshipRule::IoContention => {
                trigger.event_type == EventType::DiskIoBottleneck
                    && matches!(
                        effect.event_type,
                        EventType::HighCpu | EventType::NetworkLatency
                    )
            }
            RelationshipRule::ServiceUnavailability => {
                trigger.event_type == EventType::ServiceDown
                    && effect.event_type == EventType::ConnectionTimeout
            }
        }
    }
}

/// One inferred causal link between a trigger and its cascading effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalRelationship {
    #[serde(rename = "type")]
    pub rule: RelationshipRule,
    pub explanation: String,
    pub confidence: f64,
    /// Servers whose events matched the rule.
    pub affected_servers: Vec<String>,
}

/// Evaluate the rule table for a trigger and its effects.
pub fn infer_relationships(trigger: &Event, effects: &[Event]) -> Vec<CausalRelationship> {
    RelationshipRule::ALL
        .iter()
        .filter_map(|rule| {
            let mut servers: Vec<String> = effects
                .iter()
                .filter(|effect| rule.matches(trigger, effect))
                .map(|effect| effect.server_id.clone())
                .collect();
            if servers.is_empty() {
                return None;
            }
            servers.sort();
            servers.dedup();
            Some(CausalRelationship {
                rule: *rule,
                explanation: rule.explanation().to_string(),
                confidence: rule.base_confidence().clamp(0.0, 1.0),
                affected_servers: servers,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
