//! Service tiers inferred from server-id prefixes.
//!
//! Tiers drive the dependency heuristics used by chain scoring, relationship
//! inference, propagation classification and root-cause lookup.

use serde::{Deserialize, Serialize};

/// Coarse service category of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTier {
    Database,
    Cache,
    Application,
    Api,
    Web,
    Orchestration,
    Unknown,
}

/// Recognised server-id prefixes, most specific first.
const PREFIXES: &[(&str, ServiceTier)] = &[
    ("db-", ServiceTier::Database),
    ("database-", ServiceTier::Database),
    ("postgres-", ServiceTier::Database),
    ("mysql-", ServiceTier::Database),
    ("cache-", ServiceTier::Cache),
    ("redis-", ServiceTier::Cache),
    ("memcached-", ServiceTier::Cache),
    ("app-", ServiceTier::Application),
    ("worker-", ServiceTier::Application),
    ("api-", ServiceTier::Api),
    ("gateway-", ServiceTier::Api),
    ("web-", ServiceTier::Web),
    ("frontend-", ServiceTier::Web),
    ("nginx-", ServiceTier::Web),
    ("k8s-", ServiceTier::Orchestration),
    ("kube-", ServiceTier::Orchestration),
];

impl ServiceTier {
    /// Classify a server by its id prefix (case-insensitive).
    pub fn from_server_id(server_id: &str) -> Self {
        let lower = server_id.to_ascii_lowercase();
        PREFIXES
            .iter()
            .find(|(prefix, _)| lower.starts_with(prefix))
            .map(|(_, tier)| *tier)
            .unwrap_or(ServiceTier::Unknown)
    }

    /// Position in the request path, database first. Orchestration and
    /// unknown servers sit outside the path and have no index.
    pub fn index(&self) -> Option<usize> {
        match self {
            ServiceTier::Database => Some(0),
            ServiceTier::Cache => Some(1),
            ServiceTier::Application => Some(2),
            ServiceTier::Api => Some(3),
            ServiceTier::Web => Some(4),
            ServiceTier::Orchestration | ServiceTier::Unknown => None,
        }
    }

    /// Tiers whose servers depend on this tier being healthy.
    pub fn dependents(&self) -> &'static [ServiceTier] {
        match self {
            ServiceTier::Database => &[
                ServiceTier::Cache,
                ServiceTier::Application,
                ServiceTier::Api,
                ServiceTier::Web,
            ],
            ServiceTier::Cache => &[ServiceTier::Application, ServiceTier::Api, ServiceTier::Web],
            ServiceTier::Application => &[ServiceTier::Api, ServiceTier::Web],
            ServiceTier::Api => &[ServiceTier::Web],
            ServiceTier::Orchestration => &[
                ServiceTier::Database,
                ServiceTier::Cache,
                ServiceTier::Application,
                ServiceTier::Api,
                ServiceTier::Web,
                ServiceTier::Unknown,
            ],
            ServiceTier::Web | ServiceTier::Unknown => &[],
        }
    }

    /// Whether `other` depends on this tier.
    pub fn has_dependent(&self, other: ServiceTier) -> bool {
        self.dependents().contains(&other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceTier::Database => "database",
            ServiceTier::Cache => "cache",
            ServiceTier::Application => "application",
            ServiceTier::Api => "api",
            ServiceTier::Web => "web",
            ServiceTier::Orchestration => "orchestration",
            ServiceTier::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_prefixes() {
        assert_eq!(ServiceTier::from_server_id("db-01"), ServiceTier::Database);
        assert_eq!(ServiceTier::from_server_id("redis-2"), ServiceTier::Cache);
        assert_eq!(ServiceTier::from_server_id("app-7"), ServiceTier::Application);
        assert_eq!(ServiceTier::from_server_id("api-gw"), ServiceTier::Api);
        assert_eq!(ServiceTier::from_server_id("WEB-01"), ServiceTier::Web);
        assert_eq!(ServiceTier::from_server_id("k8s-node-3"), ServiceTier::Orchestration);
    }

    #[test]
    fn unknown_prefix_has_no_index() {
        let tier = ServiceTier::from_server_id("mailer-1");
        assert_eq!(tier, ServiceTier::Unknown);
        assert_eq!(tier.index(), None);
    }

    #[test]
    fn path_indices_are_ordered() {
        assert_eq!(ServiceTier::Database.index(), Some(0));
        assert_eq!(ServiceTier::Web.index(), Some(4));
        assert_eq!(ServiceTier::Orchestration.index(), None);
    }

    #[test]
    fn web_depends_on_database_but_not_the_reverse() {
        assert!(ServiceTier::Database.has_dependent(ServiceTier::Web));
        assert!(!ServiceTier::Web.has_dependent(ServiceTier::Database));
    }
}
