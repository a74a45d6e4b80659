//! Business impact scoring over a causal chain.
//!
//! Bucket and band boundaries come from [`ImpactPolicy`] and are placeholder
//! policy, not a validated revenue model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::alert::Severity;
use crate::config::ImpactPolicy;
use crate::correlation::CausalChainSegment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueImpact {
    Severe,
    Significant,
    Minor,
    Negligible,
}

impl RevenueImpact {
    pub fn from_score(score: f64, policy: &ImpactPolicy) -> Self {
        if score > policy.severe_revenue_above {
            RevenueImpact::Severe
        } else if score > policy.significant_revenue_above {
            RevenueImpact::Significant
        } else if score > policy.minor_revenue_above {
            RevenueImpact::Minor
        } else {
            RevenueImpact::Negligible
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserImpact {
    NoImpact,
    SevereOutage,
    BroadDegradation,
    ResponseTimeImpact,
    MinorLocalizedImpact,
}

impl UserImpact {
    pub fn assess(score: f64, metrics: &ImpactMetrics, policy: &ImpactPolicy) -> Self {
        if score <= 0.0 {
            UserImpact::NoImpact
        } else if metrics.service_availability < policy.severe_outage_below_availability {
            UserImpact::SevereOutage
        } else if metrics.service_availability < policy.broad_degradation_below_availability {
            UserImpact::BroadDegradation
        } else if metrics.response_time_degradation
            >= policy.response_time_impact_from_degradation
        {
            UserImpact::ResponseTimeImpact
        } else {
            UserImpact::MinorLocalizedImpact
        }
    }
}

/// Percentages, both within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactMetrics {
    pub service_availability: f64,
    pub response_time_degradation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessImpact {
    pub total_impact_score: f64,
    pub affected_services: BTreeSet<String>,
    pub metrics: ImpactMetrics,
    pub revenue_impact_bucket: RevenueImpact,
    pub user_impact_assessment: UserImpact,
}

/// Score the chain's triggers and collect every server it touches.
pub fn calculate_business_impact(
    chain: &[CausalChainSegment],
    policy: &ImpactPolicy,
) -> BusinessImpact {
    let mut score = 0.0;
    let mut critical_triggers = 0usize;
    let mut warning_triggers = 0usize;
    let mut affected_services = BTreeSet::new();

    for segment in chain {
        match segment.trigger_event.severity {
            Severity::Critical => {
                critical_triggers += 1;
                score += policy.critical_trigger_score;
            }
            Severity::Warning => {
                warning_triggers += 1;
                score += policy.warning_trigger_score;
            }
        }
        affected_services.insert(segment.trigger_event.server_id.clone());
        affected_services.extend(
            segment
                .cascading_effects
                .iter()
                .map(|effect| effect.server_id.clone()),
        );
    }

    let total_impact_score = score.min(policy.max_score);
    let metrics = ImpactMetrics {
        service_availability: (100.0 - policy.availability_penalty * critical_triggers as f64)
            .max(0.0),
        response_time_degradation: (policy.degradation_per_warning * warning_triggers as f64)
            .min(100.0),
    };

    BusinessImpact {
        total_impact_score,
        revenue_impact_bucket: RevenueImpact::from_score(total_impact_score, policy),
        user_impact_assessment: UserImpact::assess(total_impact_score, &metrics, policy),
        affected_services,
        metrics,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::correlation::{Event, EventType};

    fn event(server: &str, severity: Severity) -> Event {
        Event {
            timestamp: Utc::now(),
            server_id: server.to_string(),
            event_type: EventType::HighCpu,
            severity,
            metric_values: BTreeMap::new(),
            description: String::new(),
        }
    }

    fn segment(trigger: &str, severity: Severity, effects: &[&str]) -> CausalChainSegment {
        CausalChainSegment {
            trigger_event: event(trigger, severity),
            cascading_effects: effects.iter().map(|s| event(s, Severity::Warning)).collect(),
            causal_relationship: Vec::new(),
            confidence_score: 0.9,
            timeline_position: 0,
        }
    }

    #[test]
    fn empty_chain_has_no_impact() {
        let impact = calculate_business_impact(&[], &ImpactPolicy::default());
        assert_eq!(impact.total_impact_score, 0.0);
        assert!(impact.affected_services.is_empty());
        assert_eq!(impact.metrics.service_availability, 100.0);
        assert_eq!(impact.revenue_impact_bucket, RevenueImpact::Negligible);
        assert_eq!(impact.user_impact_assessment, UserImpact::NoImpact);
    }

    #[test]
    fn single_critical_trigger() {
        let chain = vec![segment("db-01", Severity::Critical, &["web-01", "web-02"])];
        let impact = calculate_business_impact(&chain, &ImpactPolicy::default());
        assert_eq!(impact.total_impact_score, 30.0);
        assert_eq!(
            impact.affected_services.iter().collect::<Vec<_>>(),
            vec!["db-01", "web-01", "web-02"]
        );
        assert_eq!(impact.metrics.service_availability, 85.0);
        assert_eq!(impact.revenue_impact_bucket, RevenueImpact::Minor);
        assert_eq!(impact.user_impact_assessment, UserImpact::MinorLocalizedImpact);
    }

    #[test]
    fn score_is_capped_and_availability_floored() {
        let chain: Vec<_> = (0..8)
            .map(|i| segment(&format!("db-0{i}"), Severity::Critical, &["web-01"]))
            .collect();
        let impact = calculate_business_impact(&chain, &ImpactPolicy::default());
        assert_eq!(impact.total_impact_score, 100.0);
        assert_eq!(impact.metrics.service_availability, 0.0);
        assert_eq!(impact.affected_services.len(), 9);
        assert_eq!(impact.revenue_impact_bucket, RevenueImpact::Severe);
        assert_eq!(impact.user_impact_assessment, UserImpact::SevereOutage);
    }

    #[test]
    fn warnings_degrade_response_time() {
        let chain = vec![
            segment("app-01", Severity::Warning, &["web-01"]),
            segment("app-02", Severity::Warning, &["web-02"]),
        ];
        let impact = calculate_business_impact(&chain, &ImpactPolicy::default());
        assert_eq!(impact.total_impact_score, 20.0);
        assert_eq!(impact.metrics.response_time_degradation, 20.0);
        assert_eq!(impact.revenue_impact_bucket, RevenueImpact::Negligible);
        assert_eq!(impact.user_impact_assessment, UserImpact::ResponseTimeImpact);
    }

    #[test]
    fn two_criticals_are_broad_degradation() {
        let chain = vec![
            segment("db-01", Severity::Critical, &["web-01"]),
            segment("cache-01", Severity::Critical, &["web-01"]),
        ];
        let impact = calculate_business_impact(&chain, &ImpactPolicy::default());
        assert_eq!(impact.metrics.service_availability, 70.0);
        assert_eq!(impact.revenue_impact_bucket, RevenueImpact::Significant);
        assert_eq!(impact.user_impact_assessment, UserImpact::BroadDegradation);
    }

    #[test]
    fn revenue_buckets_use_strict_boundaries() {
        let policy = ImpactPolicy::default();
        assert_eq!(RevenueImpact::from_score(80.0, &policy), RevenueImpact::Significant);
        assert_eq!(RevenueImpact::from_score(50.0, &policy), RevenueImpact::Minor);
        assert_eq!(RevenueImpact::from_score(20.0, &policy), RevenueImpact::Negligible);
        assert_eq!(RevenueImpact::from_score(80.5, &policy), RevenueImpact::Severe);
    }
}
