use chrono::{DateTime, Utc};
use dashmap::DashMap;

use uf_common::{InterestKind, Producer};

#[derive(Debug, Clone, Copy)]
struct InterestLiveness {
    last_message: DateTime<Utc>,
    last_alive: Option<DateTime<Utc>>,
}

/// Liveness bookkeeping per producer and interest kind.
///
/// Replayed traffic carries historical timestamps, so all watermarks are
/// monotonic. A producer counts as behind only when its freshest alive
/// across every kind is stale; the replay start (`gap_start`) uses the
/// oldest alive instead, the least-advanced session defines what to
/// request again.
pub struct TimestampTracker {
    liveness: DashMap<(u16, InterestKind), InterestLiveness>,
    /// Bootstrap watermarks from `set_known_timestamp`, cleared once a
    /// recovery covering them completes.
    seeds: DashMap<u16, DateTime<Utc>>,
}

impl TimestampTracker {
    pub fn new() -> Self {
        Self {
            liveness: DashMap::new(),
            seeds: DashMap::new(),
        }
    }

    pub fn record_message(
        &self,
        kind: InterestKind,
        producer_id: u16,
        timestamp: DateTime<Utc>,
        is_alive: bool,
    ) {
        let mut entry = self
            .liveness
            .entry((producer_id, kind))
            .or_insert(InterestLiveness {
                last_message: timestamp,
                last_alive: None,
            });
        let state = entry.value_mut();
        if timestamp > state.last_message {
            state.last_message = timestamp;
        }
        if is_alive && state.last_alive.map_or(true, |existing| timestamp > existing) {
            state.last_alive = Some(timestamp);
        }
    }

    pub fn seed(&self, producer_id: u16, timestamp: DateTime<Utc>) {
        self.seeds.insert(producer_id, timestamp);
    }

    pub fn clear_seed(&self, producer_id: u16) {
        self.seeds.remove(&producer_id);
    }

    /// `None` until any liveness data (alive or seed) exists for the
    /// producer; afterwards whether its freshest alive is older than the
    /// producer's inactivity threshold. A single fresh kind keeps the
    /// producer healthy; per-kind staleness is a channel concern.
    pub fn is_behind(&self, producer: &Producer, now: DateTime<Utc>) -> Option<bool> {
        let freshest = self.freshest_alive(producer.id)?;
        Some(now - freshest > producer.inactivity())
    }

    /// Per-interest liveness probe. `None` until the kind has seen an alive.
    pub fn is_interest_behind(
        &self,
        producer: &Producer,
        kind: InterestKind,
        now: DateTime<Utc>,
    ) -> Option<bool> {
        let alive = self
            .liveness
            .get(&(producer.id, kind))
            .and_then(|entry| entry.last_alive)?;
        Some(now - alive > producer.inactivity())
    }

    /// Conservative replay start: the oldest recorded alive across kinds,
    /// folded with the bootstrap seed.
    pub fn gap_start(&self, producer_id: u16) -> Option<DateTime<Utc>> {
        let mut oldest = self.seeds.get(&producer_id).map(|seed| *seed);
        for entry in self.liveness.iter() {
            if entry.key().0 != producer_id {
                continue;
            }
            if let Some(alive) = entry.last_alive {
                oldest = Some(oldest.map_or(alive, |current| current.min(alive)));
            }
        }
        oldest
    }

    fn freshest_alive(&self, producer_id: u16) -> Option<DateTime<Utc>> {
        let mut freshest = self.seeds.get(&producer_id).map(|seed| *seed);
        for entry in self.liveness.iter() {
            if entry.key().0 != producer_id {
                continue;
            }
            if let Some(alive) = entry.last_alive {
                freshest = Some(freshest.map_or(alive, |current| current.max(alive)));
            }
        }
        freshest
    }
}

impl Default for TimestampTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uf_common::ProducerScope;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn producer() -> Producer {
        Producer {
            id: 1,
            name: "liveodds".to_string(),
            api_url: "liveodds".to_string(),
            scope: ProducerScope::Live,
            active: true,
            inactivity_seconds: 20,
            max_recovery_time_seconds: 3600,
            stateful_recovery_window_minutes: None,
        }
    }

    #[test]
    fn no_liveness_data_yields_none() {
        let tracker = TimestampTracker::new();
        let p = producer();
        assert_eq!(tracker.is_behind(&p, at(100)), None);
        assert_eq!(tracker.is_interest_behind(&p, InterestKind::All, at(100)), None);
        assert_eq!(tracker.gap_start(p.id), None);
    }

    #[test]
    fn freshest_kind_decides_behind_oldest_decides_gap_start() {
        let tracker = TimestampTracker::new();
        let p = producer();
        tracker.record_message(InterestKind::System, p.id, at(0), true);
        tracker.record_message(InterestKind::All, p.id, at(30), true);

        // One kind is stale, another is fresh: not behind overall.
        assert_eq!(tracker.is_behind(&p, at(40)), Some(false));
        assert_eq!(
            tracker.is_interest_behind(&p, InterestKind::System, at(40)),
            Some(true)
        );
        assert_eq!(tracker.gap_start(p.id), Some(at(0)));

        assert_eq!(tracker.is_behind(&p, at(51)), Some(true));
    }

    #[test]
    fn non_alive_messages_do_not_count_as_liveness() {
        let tracker = TimestampTracker::new();
        let p = producer();
        tracker.record_message(InterestKind::All, p.id, at(0), false);
        assert_eq!(tracker.is_behind(&p, at(5)), None);
    }

    #[test]
    fn watermarks_ignore_historical_replay_timestamps() {
        let tracker = TimestampTracker::new();
        let p = producer();
        tracker.record_message(InterestKind::All, p.id, at(100), true);
        tracker.record_message(InterestKind::All, p.id, at(40), true);

        assert_eq!(tracker.is_behind(&p, at(110)), Some(false));
        assert_eq!(tracker.gap_start(p.id), Some(at(100)));
    }

    #[test]
    fn seed_supplies_liveness_until_cleared() {
        let tracker = TimestampTracker::new();
        let p = producer();
        tracker.seed(p.id, at(0));

        assert_eq!(tracker.is_behind(&p, at(30)), Some(true));
        assert_eq!(tracker.gap_start(p.id), Some(at(0)));

        tracker.record_message(InterestKind::System, p.id, at(60), true);
        assert_eq!(tracker.gap_start(p.id), Some(at(0)));

        tracker.clear_seed(p.id);
        assert_eq!(tracker.gap_start(p.id), Some(at(60)));
        assert_eq!(tracker.is_behind(&p, at(70)), Some(false));
    }
}
