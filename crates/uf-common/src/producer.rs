use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::settings::{INACTIVITY_SECONDS_RANGE, MAX_RECOVERY_TIME_SECONDS_RANGE};

/// Whether a producer feeds pre-match or live odds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducerScope {
    Live,
    Prematch,
}

/// Immutable description of one upstream source, built once at bootstrap
/// from the producers listing merged with configured defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Producer {
    pub id: u16,
    pub name: String,
    /// Path segment used when addressing this producer's recovery endpoint.
    pub api_url: String,
    pub scope: ProducerScope,
    pub active: bool,
    /// Longest tolerated silence before the producer counts as behind.
    pub inactivity_seconds: u64,
    /// Oldest replayable gap; also bounds how long one recovery may run.
    pub max_recovery_time_seconds: u64,
    pub stateful_recovery_window_minutes: Option<u64>,
}

impl Producer {
    /// Inactivity threshold as a duration, capped at the allowed maximum.
    /// The listing merge rejects out-of-range overrides; the cap keeps the
    /// conversion total for producers built some other way.
    pub fn inactivity(&self) -> Duration {
        Duration::seconds(self.inactivity_seconds.min(*INACTIVITY_SECONDS_RANGE.end()) as i64)
    }

    /// Recovery window as a duration, capped at the allowed maximum.
    pub fn max_recovery_time(&self) -> Duration {
        Duration::seconds(
            self.max_recovery_time_seconds
                .min(*MAX_RECOVERY_TIME_SECONDS_RANGE.end()) as i64,
        )
    }

    /// `None` when the producer has no window, or the listed value is not
    /// representable as a duration.
    pub fn stateful_recovery_window(&self) -> Option<Duration> {
        self.stateful_recovery_window_minutes
            .and_then(|m| i64::try_from(m).ok())
            .and_then(Duration::try_minutes)
    }
}

/// Lifecycle of one supervised producer. There is no terminal state; a
/// recovered producer returns to `Started`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerStatus {
    /// No liveness data observed yet.
    NotStarted,
    /// Healthy and flowing.
    Started,
    /// Behind on liveness, grace period running.
    Delayed,
    /// Confirmed down; consumers were notified.
    Disconnected,
    /// Down with a recovery request in flight.
    RecoveryPending,
}

impl ProducerStatus {
    /// True for the states in which consumers have been told the producer
    /// is down and an `up` notification is still owed.
    pub fn is_down(&self) -> bool {
        matches!(self, ProducerStatus::Disconnected | ProducerStatus::RecoveryPending)
    }
}

/// Why a producer was reported down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerDownReason {
    /// Liveness gap: no alive inside the producer's inactivity window.
    AliveIntervalViolation,
    /// The broker connection itself was lost.
    ConnectionDown,
}
