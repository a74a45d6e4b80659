//! Bounded rolling metric history.
//!
//! Holds the most recent snapshots of every server, oldest evicted first.
//! Ingestion is the only writer; analysis runs take a copy of the range they
//! need and never hold the lock while computing.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use kestrel_core::snapshot::{MetricSnapshot, TimeRange};
use kestrel_core::types::{ServerId, Timestamp};
use tokio::sync::RwLock;

pub type SharedHistory = Arc<RwLock<MetricHistory>>;

#[derive(Debug)]
pub struct MetricHistory {
    capacity: usize,
    servers: HashMap<ServerId, VecDeque<MetricSnapshot>>,
}

impl MetricHistory {
    /// `capacity` is the number of snapshots kept per server (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            servers: HashMap::new(),
        }
    }

    pub fn shared(capacity: usize) -> SharedHistory {
        Arc::new(RwLock::new(Self::new(capacity)))
    }

    /// Insert a snapshot in timestamp order.
    ///
    /// A snapshot with the same timestamp as a stored one for that server
    /// replaces it. Returns `false` when the snapshot is older than
    /// everything retained for a full server, since it would be evicted
    /// immediately.
    pub fn ingest(&mut self, snapshot: MetricSnapshot) -> bool {
        let capacity = self.capacity;
        let series = self.servers.entry(snapshot.server_id.clone()).or_default();

        if series.len() >= capacity
            && series
                .front()
                .is_some_and(|oldest| snapshot.timestamp < oldest.timestamp)
        {
            return false;
        }

        let position = series.partition_point(|s| s.timestamp < snapshot.timestamp);
        let replaces = series
            .get(position)
            .is_some_and(|existing| existing.timestamp == snapshot.timestamp);
        if replaces {
            series[position] = snapshot;
        } else {
            series.insert(position, snapshot);
        }

        while series.len() > capacity {
            series.pop_front();
        }
        true
    }

    /// Insert many snapshots; returns how many were kept.
    pub fn ingest_all<I>(&mut self, snapshots: I) -> usize
    where
        I: IntoIterator<Item = MetricSnapshot>,
    {
        let mut kept = 0;
        for snapshot in snapshots {
            if self.ingest(snapshot) {
                kept += 1;
            }
        }
        kept
    }

    /// Timestamp of the newest retained snapshot of `server_id`.
    pub fn latest_timestamp(&self, server_id: &str) -> Option<Timestamp> {
        self.servers.get(server_id)?.back().map(|s| s.timestamp)
    }

    /// Copy of every snapshot inside `[range.start, range.end)`, ordered by
    /// timestamp and then server id.
    pub fn snapshots_in(&self, range: &TimeRange) -> Vec<MetricSnapshot> {
        let mut out: Vec<MetricSnapshot> = self
            .servers
            .values()
            .flat_map(|series| series.iter().filter(|s| range.contains(s.timestamp)))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.server_id.cmp(&b.server_id))
        });
        out
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Total snapshots retained across all servers.
    pub fn len(&self) -> usize {
        self.servers.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn at(mins: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(mins)
    }

    fn snap(server: &str, mins: i64) -> MetricSnapshot {
        MetricSnapshot::new(server, at(mins)).with_cpu(mins as f64)
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut history = MetricHistory::new(3);
        for m in 0..5 {
            assert!(history.ingest(snap("db-01", m)));
        }
        assert_eq!(history.len(), 3);
        let range = TimeRange::new(at(0), at(60)).unwrap();
        let kept: Vec<_> = history
            .snapshots_in(&range)
            .iter()
            .map(|s| s.timestamp)
            .collect();
        assert_eq!(kept, vec![at(2), at(3), at(4)]);
    }

    #[test]
    fn capacity_is_per_server() {
        let mut history = MetricHistory::new(2);
        history.ingest_all([
            snap("db-01", 0),
            snap("db-01", 1),
            snap("web-01", 0),
            snap("web-01", 1),
        ]);
        assert_eq!(history.len(), 4);
        assert_eq!(history.server_count(), 2);
    }

    #[test]
    fn out_of_order_points_are_sorted_and_duplicates_replaced() {
        let mut history = MetricHistory::new(10);
        history.ingest(snap("db-01", 5));
        history.ingest(snap("db-01", 1));
        history.ingest(MetricSnapshot::new("db-01", at(5)).with_cpu(99.0));

        let range = TimeRange::new(at(0), at(10)).unwrap();
        let snaps = history.snapshots_in(&range);
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].timestamp, at(1));
        assert_eq!(snaps[1].cpu_usage(), Some(99.0));
        assert_eq!(history.latest_timestamp("db-01"), Some(at(5)));
    }

    #[test]
    fn stale_point_for_full_server_is_rejected() {
        let mut history = MetricHistory::new(2);
        history.ingest_all([snap("db-01", 10), snap("db-01", 11)]);
        assert!(!history.ingest(snap("db-01", 1)));
        assert_eq!(history.latest_timestamp("db-01"), Some(at(11)));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn range_query_is_half_open_and_ordered_across_servers() {
        let mut history = MetricHistory::new(10);
        history.ingest_all([
            snap("web-01", 0),
            snap("db-01", 0),
            snap("db-01", 10),
            snap("app-01", 5),
        ]);
        let snaps = history.snapshots_in(&TimeRange::new(at(0), at(10)).unwrap());
        let ids: Vec<_> = snaps.iter().map(|s| s.server_id.as_str()).collect();
        assert_eq!(ids, vec!["db-01", "web-01", "app-01"]);
        assert!(history.latest_timestamp("cache-01").is_none());
    }
}
