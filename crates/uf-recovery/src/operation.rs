use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use uf_common::Producer;

/// Issues one recovery request against the producer's REST endpoint and
/// returns the request id it was issued under.
#[async_trait]
pub trait RecoveryRequestIssuer: Send + Sync {
    async fn issue(
        &self,
        producer: &Producer,
        after: DateTime<Utc>,
        node_id: u32,
        scope: RecoveryScope,
    ) -> anyhow::Result<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryScope {
    FullReplay,
    StatefulOnly,
}

/// Decides replay scope and may tighten the effective `after` before a
/// request goes out.
pub trait RecoveryScopePolicy: Send + Sync {
    fn plan(
        &self,
        producer: &Producer,
        after: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> (RecoveryScope, DateTime<Utc>);
}

/// Always requests the full missed window.
pub struct FullReplayPolicy;

impl RecoveryScopePolicy for FullReplayPolicy {
    fn plan(
        &self,
        _producer: &Producer,
        after: DateTime<Utc>,
        _now: DateTime<Utc>,
    ) -> (RecoveryScope, DateTime<Utc>) {
        (RecoveryScope::FullReplay, after)
    }
}

/// Narrows the replay to the producer's stateful window when the gap
/// exceeds it. Producers without a window always replay in full.
pub struct StatefulWindowPolicy;

impl RecoveryScopePolicy for StatefulWindowPolicy {
    fn plan(
        &self,
        producer: &Producer,
        after: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> (RecoveryScope, DateTime<Utc>) {
        match producer.stateful_recovery_window() {
            Some(window) if now - after > window => (RecoveryScope::StatefulOnly, now - window),
            _ => (RecoveryScope::FullReplay, after),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryRequestStatus {
    Pending,
    Completed,
    TimedOut,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryRequest {
    pub id: u64,
    pub producer_id: u16,
    pub after: DateTime<Utc>,
    pub node_id: u32,
    pub requested_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RecoveryRequestStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRecoveryOutcome {
    Started(u64),
    AlreadyPending,
    Throttled,
}

/// Single-slot recovery request driver for one producer. Owned by the
/// producer's state-machine lock, which provides all synchronization; at
/// most one request is ever pending.
pub struct RecoveryOperation {
    node_id: u32,
    min_interval: Duration,
    issuer: Arc<dyn RecoveryRequestIssuer>,
    scope_policy: Arc<dyn RecoveryScopePolicy>,
    pending: Option<RecoveryRequest>,
    last_attempt: Option<DateTime<Utc>>,
    last_finished: Option<RecoveryRequest>,
}

impl RecoveryOperation {
    pub fn new(
        node_id: u32,
        min_interval: Duration,
        issuer: Arc<dyn RecoveryRequestIssuer>,
        scope_policy: Arc<dyn RecoveryScopePolicy>,
    ) -> Self {
        Self {
            node_id,
            min_interval,
            issuer,
            scope_policy,
            pending: None,
            last_attempt: None,
            last_finished: None,
        }
    }

    /// Issues a new recovery request unless one is pending or the previous
    /// attempt is too recent. `after` is the gap start clamped into
    /// `[now - max_recovery_time, now]`; with no gap start the full window
    /// is requested. The attempt time is recorded before the call goes out,
    /// so a failed request is throttled like a successful one.
    pub async fn start_recovery(
        &mut self,
        producer: &Producer,
        gap_start: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<StartRecoveryOutcome> {
        if self.pending.is_some() {
            return Ok(StartRecoveryOutcome::AlreadyPending);
        }
        if let Some(last) = self.last_attempt {
            if now - last < self.min_interval {
                return Ok(StartRecoveryOutcome::Throttled);
            }
        }

        let floor = now - producer.max_recovery_time();
        let after = gap_start.map_or(floor, |gap| gap.clamp(floor, now));
        let (scope, after) = self.scope_policy.plan(producer, after, now);

        self.last_attempt = Some(now);
        let request_id = self.issuer.issue(producer, after, self.node_id, scope).await?;

        self.pending = Some(RecoveryRequest {
            id: request_id,
            producer_id: producer.id,
            after,
            node_id: self.node_id,
            requested_at: now,
            finished_at: None,
            status: RecoveryRequestStatus::Pending,
        });
        Ok(StartRecoveryOutcome::Started(request_id))
    }

    pub fn pending(&self) -> Option<&RecoveryRequest> {
        self.pending.as_ref()
    }

    pub fn matches_pending(&self, request_id: u64) -> bool {
        self.pending.as_ref().map_or(false, |req| req.id == request_id)
    }

    /// Finishes the matching pending request; ids that match nothing are
    /// ignored (late or duplicate confirmations). Returns whether the slot
    /// was freed.
    pub fn complete(&mut self, request_id: u64, success: bool, now: DateTime<Utc>) -> bool {
        if !self.matches_pending(request_id) {
            return false;
        }
        self.finish(
            if success {
                RecoveryRequestStatus::Completed
            } else {
                RecoveryRequestStatus::TimedOut
            },
            now,
        )
    }

    /// Times out a pending request older than the producer's
    /// `max_recovery_time`. Returns whether it fired.
    pub fn check_timeout(&mut self, producer: &Producer, now: DateTime<Utc>) -> bool {
        let expired = self
            .pending
            .as_ref()
            .map_or(false, |req| now - req.requested_at > producer.max_recovery_time());
        if !expired {
            return false;
        }
        self.finish(RecoveryRequestStatus::TimedOut, now)
    }

    /// Abandons a pending request when the machine leaves the disconnected
    /// family for another reason, e.g. connection loss.
    pub fn interrupt(&mut self, now: DateTime<Utc>) -> bool {
        if self.pending.is_none() {
            return false;
        }
        self.finish(RecoveryRequestStatus::Interrupted, now)
    }

    pub fn last_finished(&self) -> Option<&RecoveryRequest> {
        self.last_finished.as_ref()
    }

    fn finish(&mut self, status: RecoveryRequestStatus, now: DateTime<Utc>) -> bool {
        match self.pending.take() {
            Some(mut request) => {
                request.status = status;
                request.finished_at = Some(now);
                self.last_finished = Some(request);
                true
            }
            None => false,
        }
    }
}
