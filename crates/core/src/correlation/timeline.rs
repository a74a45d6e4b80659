//! Global chronological event list and correlation-window lookups.

use chrono::{DateTime, Utc};

use crate::correlation::event::Event;

/// Flatten per-server event lists into one list sorted by timestamp.
///
/// Ties are broken by server id and then event type so that the order is
/// deterministic regardless of how the per-server lists were produced.
pub fn build_chronological_event_map<I>(per_server: I) -> Vec<Event>
where
    I: IntoIterator<Item = Vec<Event>>,
{
    let mut events: Vec<Event> = per_server.into_iter().flatten().collect();
    events.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.server_id.cmp(&b.server_id))
            .then_with(|| a.event_type.cmp(&b.event_type))
    });
    events
}

/// Indices of every event within `window_ms` of `events[index]`, excluding
/// `index` itself.
///
/// `events` must be sorted chronologically (as returned by
/// [`build_chronological_event_map`]); the window bounds are found by binary
/// search. Out-of-range indices yield an empty result. Window bounds that
/// fall outside the representable time span saturate.
pub fn find_related_indices(index: usize, events: &[Event], window_ms: i64) -> Vec<usize> {
    let Some(anchor) = events.get(index) else {
        return Vec::new();
    };
    let window = chrono::Duration::try_milliseconds(window_ms.saturating_abs())
        .unwrap_or(chrono::Duration::MAX);
    let lower = anchor
        .timestamp
        .checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let upper = anchor
        .timestamp
        .checked_add_signed(window)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let from = events.partition_point(|e| e.timestamp < lower);
    let to = events.partition_point(|e| e.timestamp <= upper);

    (from..to).filter(|&i| i != index).collect()
}

/// Every event within `window_ms` of `events[index]`, excluding the event
/// itself. The relation is symmetric.
pub fn find_related_events(index: usize, events: &[Event], window_ms: i64) -> Vec<&Event> {
    find_related_indices(index, events, window_ms)
        .into_iter()
        .map(|i| &events[i])
        .collect()
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
    use crate::correlation::event::EventType;

    const WINDOW_MS: i64 = 300_000;

    fn event(server: &str, offset_secs: i64) -> Event {
        Event {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
                + Duration::seconds(offset_secs),
            server_id: server.to_string(),
            event_type: EventType::HighCpu,
            severity: Severity::Warning,
            metric_values: BTreeMap::new(),
            description: String::new(),
        }
    }

    #[test]
    fn flattens_and_sorts_across_servers() {
        let events = build_chronological_event_map(vec![
            vec![event("web-01", 120), event("web-01", 600)],
            vec![event("db-01", 0), event("db-01", 600)],
        ]);
        let order: Vec<_> = events
            .iter()
            .map(|e| (e.server_id.as_str(), (e.timestamp.timestamp() % 3600)))
            .collect();
        assert_eq!(
            order,
            vec![("db-01", 0), ("web-01", 120), ("db-01", 600), ("web-01", 600)]
        );
    }

    #[test]
    fn empty_input_gives_empty_map() {
        assert!(build_chronological_event_map(Vec::<Vec<Event>>::new()).is_empty());
    }

    #[test]
    fn related_events_respect_window_inclusively() {
        let events = build_chronological_event_map(vec![vec![
            event("db-01", 0),
            event("web-01", 300),
            event("web-02", 301),
        ]]);
        assert_eq!(find_related_indices(0, &events, WINDOW_MS), vec![1]);
        assert_eq!(find_related_indices(1, &events, WINDOW_MS), vec![0, 2]);
    }

    #[test]
    fn oversized_window_saturates_instead_of_overflowing() {
        let events = build_chronological_event_map(vec![vec![
            event("db-01", 0),
            event("web-01", 86_400 * 365),
        ]]);
        assert_eq!(find_related_indices(0, &events, i64::MAX / 2), vec![1]);
        assert_eq!(find_related_indices(1, &events, i64::MAX), vec![0]);
        assert_eq!(find_related_indices(1, &events, i64::MIN), vec![0]);
    }

    #[test]
    fn never_includes_itself() {
        let events =
            build_chronological_event_map(vec![vec![event("db-01", 0), event("db-02", 0)]]);
        for i in 0..events.len() {
            assert!(!find_related_indices(i, &events, WINDOW_MS).contains(&i));
        }
    }

    #[test]
    fn relation_is_symmetric() {
        let offsets = [0, 30, 200, 450, 460, 900, 1150, 1500];
        let events = build_chronological_event_map(vec![offsets
            .iter()
            .enumerate()
            .map(|(i, o)| event(&format!("app-{i}"), *o))
            .collect()]);
        for a in 0..events.len() {
            for b in find_related_indices(a, &events, WINDOW_MS) {
                assert!(
                    find_related_indices(b, &events, WINDOW_MS).contains(&a),
                    "{a} relates to {b} but not vice versa"
                );
            }
        }
    }

    #[test]
    fn isolated_event_has_no_relations() {
        let events =
            build_chronological_event_map(vec![vec![event("db-01", 0), event("web-01", 3600)]]);
        assert!(find_related_events(0, &events, WINDOW_MS).is_empty());
        assert!(find_related_events(5, &events, WINDOW_MS).is_empty());
    }
}
