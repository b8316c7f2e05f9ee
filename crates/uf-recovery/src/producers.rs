use std::collections::HashMap;
use std::ops::RangeInclusive;

use tracing::{info, warn};

use uf_common::settings::{INACTIVITY_SECONDS_RANGE, MAX_RECOVERY_TIME_SECONDS_RANGE};
use uf_common::{Producer, RecoverySettings};

use crate::api::{ApiClient, ProducerListing};
use crate::Result;

/// Immutable producer registry, built once at startup.
pub struct ProducerManager {
    producers: HashMap<u16, Producer>,
}

impl ProducerManager {
    pub fn new(producers: Vec<Producer>) -> Self {
        Self {
            producers: producers.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    /// Fetches the producers listing and merges per-producer thresholds
    /// with the configured defaults.
    pub async fn bootstrap(api: &ApiClient, settings: &RecoverySettings) -> Result<Self> {
        let listing = api.fetch_producers().await?;
        let producers: Vec<Producer> = listing
            .into_iter()
            .map(|entry| merge_entry(entry, settings))
            .collect();

        info!(
            total = producers.len(),
            active = producers.iter().filter(|p| p.active).count(),
            "Producers bootstrapped"
        );
        Ok(Self::new(producers))
    }

    pub fn get(&self, id: u16) -> Option<&Producer> {
        self.producers.get(&id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Producer> {
        self.producers.values()
    }

    /// Producers under liveness supervision. Inactive ones are listed but
    /// never supervised.
    pub fn active(&self) -> impl Iterator<Item = &Producer> {
        self.producers.values().filter(|p| p.active)
    }
}

fn merge_entry(entry: ProducerListing, settings: &RecoverySettings) -> Producer {
    let inactivity_seconds = merge_threshold(
        "inactivitySeconds",
        &entry.name,
        entry.inactivity_seconds,
        &INACTIVITY_SECONDS_RANGE,
        settings.inactivity_seconds,
    );
    let max_recovery_time_seconds = merge_threshold(
        "maxRecoveryTimeSeconds",
        &entry.name,
        entry.max_recovery_time_seconds,
        &MAX_RECOVERY_TIME_SECONDS_RANGE,
        settings.max_recovery_time_seconds,
    );

    Producer {
        id: entry.id,
        name: entry.name,
        api_url: entry.api_url,
        scope: entry.scope,
        active: entry.active,
        inactivity_seconds,
        max_recovery_time_seconds,
        stateful_recovery_window_minutes: entry.stateful_recovery_window_minutes,
    }
}

/// Listing overrides obey the same bounds as the configured defaults; an
/// out-of-range value is reported and the default kept.
fn merge_threshold(
    field: &str,
    producer: &str,
    value: Option<u64>,
    range: &RangeInclusive<u64>,
    default: u64,
) -> u64 {
    match value {
        None => default,
        Some(v) if range.contains(&v) => v,
        Some(v) => {
            warn!(
                producer,
                field,
                value = v,
                min = *range.start(),
                max = *range.end(),
                "Listing threshold out of range, keeping the configured default"
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uf_common::ProducerScope;

    #[test]
    fn listing_overrides_win_over_defaults() {
        let settings = RecoverySettings::default();

        let merged = merge_entry(
            ProducerListing {
                id: 1,
                name: "liveodds".to_string(),
                api_url: "liveodds".to_string(),
                scope: ProducerScope::Live,
                active: true,
                inactivity_seconds: Some(30),
                max_recovery_time_seconds: None,
                stateful_recovery_window_minutes: Some(90),
            },
            &settings,
        );

        assert_eq!(merged.inactivity_seconds, 30);
        assert_eq!(merged.max_recovery_time_seconds, settings.max_recovery_time_seconds);
        assert_eq!(merged.stateful_recovery_window_minutes, Some(90));
    }

    #[test]
    fn out_of_range_listing_overrides_keep_the_defaults() {
        let settings = RecoverySettings::default();

        let merged = merge_entry(
            ProducerListing {
                id: 1,
                name: "liveodds".to_string(),
                api_url: "liveodds".to_string(),
                scope: ProducerScope::Live,
                active: true,
                inactivity_seconds: Some(5),
                max_recovery_time_seconds: Some(u64::MAX),
                stateful_recovery_window_minutes: None,
            },
            &settings,
        );

        assert_eq!(merged.inactivity_seconds, settings.inactivity_seconds);
        assert_eq!(merged.max_recovery_time_seconds, settings.max_recovery_time_seconds);

        // Boundary values are overrides, not violations.
        let merged = merge_entry(
            ProducerListing {
                id: 1,
                name: "liveodds".to_string(),
                api_url: "liveodds".to_string(),
                scope: ProducerScope::Live,
                active: true,
                inactivity_seconds: Some(180),
                max_recovery_time_seconds: Some(600),
                stateful_recovery_window_minutes: None,
            },
            &settings,
        );

        assert_eq!(merged.inactivity_seconds, 180);
        assert_eq!(merged.max_recovery_time_seconds, 600);
    }

    #[test]
    fn active_filters_out_inactive_producers() {
        let live = Producer {
            id: 1,
            name: "liveodds".to_string(),
            api_url: "liveodds".to_string(),
            scope: ProducerScope::Live,
            active: true,
            inactivity_seconds: 20,
            max_recovery_time_seconds: 3600,
            stateful_recovery_window_minutes: None,
        };
        let retired = Producer {
            id: 2,
            name: "retired".to_string(),
            active: false,
            ..live.clone()
        };

        let manager = ProducerManager::new(vec![live, retired]);
        assert_eq!(manager.all().count(), 2);
        assert_eq!(manager.active().count(), 1);
        assert_eq!(manager.active().next().map(|p| p.id), Some(1));
        assert!(manager.get(2).is_some());
        assert!(manager.get(3).is_none());
    }
}
