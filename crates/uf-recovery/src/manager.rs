use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use uf_common::{FeedMessage, InterestKind, Producer, ProducerDownReason, ProducerStatus};

use crate::listener::FeedStatusListener;
use crate::operation::{RecoveryOperation, StartRecoveryOutcome};
use crate::tracker::TimestampTracker;
use crate::{RecoveryError, Result};

struct ProducerState {
    status: ProducerStatus,
    operation: RecoveryOperation,
}

/// The per-producer state machine:
/// `NotStarted -> Started -> Delayed -> Disconnected -> RecoveryPending -> Started`.
///
/// All mutable state lives behind one async mutex; the status tick and
/// inbound messages take it for their whole transition, and it is held
/// across the recovery issuer call, which is what makes duplicate issue
/// attempts impossible. Listener callbacks fire under the lock so they
/// observe transitions in order, at most once per actual transition.
pub struct ProducerRecoveryManager {
    producer: Producer,
    tracker: Arc<TimestampTracker>,
    listener: Arc<dyn FeedStatusListener>,
    state: Mutex<ProducerState>,
    feed_opened: AtomicBool,
}

impl ProducerRecoveryManager {
    pub fn new(
        producer: Producer,
        tracker: Arc<TimestampTracker>,
        listener: Arc<dyn FeedStatusListener>,
        operation: RecoveryOperation,
    ) -> Self {
        Self {
            producer,
            tracker,
            listener,
            state: Mutex::new(ProducerState {
                status: ProducerStatus::NotStarted,
                operation,
            }),
            feed_opened: AtomicBool::new(false),
        }
    }

    pub fn producer(&self) -> &Producer {
        &self.producer
    }

    pub async fn status(&self) -> ProducerStatus {
        self.state.lock().await.status
    }

    /// Blocks further `set_known_timestamp` calls. Called when the owning
    /// feed opens.
    pub fn mark_opened(&self) {
        self.feed_opened.store(true, Ordering::SeqCst);
    }

    /// Seeds the liveness watermark so the ordinary tick machinery drives a
    /// bootstrap recovery from `timestamp` if it is stale. Only permitted
    /// before the feed opens; the timestamp must lie within the last 24h.
    pub fn set_known_timestamp(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
        if self.feed_opened.load(Ordering::SeqCst) {
            return Err(RecoveryError::FeedAlreadyOpened);
        }
        if timestamp > now {
            return Err(RecoveryError::validation("known timestamp is in the future"));
        }
        if now - timestamp > Duration::hours(24) {
            return Err(RecoveryError::validation(
                "known timestamp is older than 24 hours",
            ));
        }
        self.tracker.seed(self.producer.id, timestamp);
        Ok(())
    }

    /// One supervision pass, driven by the feed's status tick.
    pub async fn check_status(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        match state.status {
            ProducerStatus::NotStarted | ProducerStatus::Started | ProducerStatus::Delayed => {
                match self.tracker.is_behind(&self.producer, now) {
                    None => {}
                    Some(false) => {
                        if state.status == ProducerStatus::Delayed {
                            debug!(
                                producer = %self.producer.name,
                                "Producer caught up inside the grace period"
                            );
                            state.status = ProducerStatus::Started;
                        }
                    }
                    Some(true) => {
                        if state.status == ProducerStatus::Delayed {
                            warn!(
                                producer = %self.producer.name,
                                inactivity_seconds = self.producer.inactivity_seconds,
                                "Producer is down, alive interval violated"
                            );
                            state.status = ProducerStatus::Disconnected;
                            self.listener.on_producer_down(
                                &self.producer,
                                ProducerDownReason::AliveIntervalViolation,
                            );
                            self.try_start_recovery(&mut state, now).await;
                        } else {
                            info!(
                                producer = %self.producer.name,
                                "Producer is behind, entering grace period"
                            );
                            state.status = ProducerStatus::Delayed;
                        }
                    }
                }
            }
            ProducerStatus::Disconnected => {
                self.try_start_recovery(&mut state, now).await;
            }
            ProducerStatus::RecoveryPending => {
                if state.operation.check_timeout(&self.producer, now) {
                    warn!(
                        producer = %self.producer.name,
                        "Recovery timed out, requesting a fresh replay"
                    );
                    state.status = ProducerStatus::Disconnected;
                    self.try_start_recovery(&mut state, now).await;
                }
            }
        }
    }

    /// Handles one decoded message for this producer, from any session.
    /// Liveness is recorded first; confirmations then complete a pending
    /// recovery, while plain heartbeats only drive the quiet transitions.
    pub async fn process_message(
        &self,
        message: &FeedMessage,
        kind: InterestKind,
        now: DateTime<Utc>,
    ) {
        self.tracker.record_message(
            kind,
            self.producer.id,
            message.timestamp(),
            message.is_alive(),
        );

        match message {
            FeedMessage::Alive(alive) => {
                let mut state = self.state.lock().await;
                if alive.subscribed {
                    if let Some(request_id) = alive.request_id {
                        if state.operation.matches_pending(request_id) {
                            self.finish_recovery(&mut state, request_id, now);
                            return;
                        }
                    }
                }
                self.note_heartbeat(&mut state);
            }
            FeedMessage::SnapshotComplete(snapshot) => {
                let mut state = self.state.lock().await;
                if state.operation.matches_pending(snapshot.request_id) {
                    self.finish_recovery(&mut state, snapshot.request_id, now);
                } else {
                    debug!(
                        producer = %self.producer.name,
                        request_id = snapshot.request_id,
                        "Ignoring unmatched snapshot complete"
                    );
                }
            }
            _ => {}
        }
    }

    /// The broker connection was lost: abandon any pending recovery and
    /// take the producer down without a duplicate callback.
    pub async fn connection_down(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        if state.operation.interrupt(now) {
            info!(
                producer = %self.producer.name,
                "Pending recovery interrupted by connection loss"
            );
        }
        match state.status {
            ProducerStatus::Started | ProducerStatus::Delayed => {
                warn!(producer = %self.producer.name, "Producer is down, connection lost");
                state.status = ProducerStatus::Disconnected;
                self.listener
                    .on_producer_down(&self.producer, ProducerDownReason::ConnectionDown);
            }
            ProducerStatus::RecoveryPending => {
                state.status = ProducerStatus::Disconnected;
            }
            ProducerStatus::NotStarted | ProducerStatus::Disconnected => {}
        }
    }

    async fn try_start_recovery(&self, state: &mut ProducerState, now: DateTime<Utc>) {
        let gap_start = self.tracker.gap_start(self.producer.id);
        match state.operation.start_recovery(&self.producer, gap_start, now).await {
            Ok(StartRecoveryOutcome::Started(request_id)) => {
                if let Some(request) = state.operation.pending() {
                    info!(
                        producer = %self.producer.name,
                        request_id,
                        after = %request.after,
                        "Recovery requested"
                    );
                }
                state.status = ProducerStatus::RecoveryPending;
            }
            Ok(StartRecoveryOutcome::AlreadyPending) => {}
            Ok(StartRecoveryOutcome::Throttled) => {
                debug!(producer = %self.producer.name, "Recovery attempt throttled");
            }
            Err(e) => {
                warn!(
                    producer = %self.producer.name,
                    error = %e,
                    "Recovery request failed, will retry after the throttle interval"
                );
            }
        }
    }

    fn finish_recovery(&self, state: &mut ProducerState, request_id: u64, now: DateTime<Utc>) {
        if !state.operation.complete(request_id, true, now) {
            return;
        }
        self.tracker.clear_seed(self.producer.id);
        state.status = ProducerStatus::Started;
        info!(
            producer = %self.producer.name,
            request_id,
            "Recovery completed, producer is up"
        );
        self.listener.on_producer_up(&self.producer);
    }

    fn note_heartbeat(&self, state: &mut ProducerState) {
        match state.status {
            ProducerStatus::NotStarted => {
                debug!(producer = %self.producer.name, "First liveness data, producer started");
                state.status = ProducerStatus::Started;
            }
            ProducerStatus::Delayed => {
                debug!(producer = %self.producer.name, "Producer caught up");
                state.status = ProducerStatus::Started;
            }
            // Heartbeats never resurrect a down producer; only a completed
            // recovery does.
            _ => {}
        }
    }
}
