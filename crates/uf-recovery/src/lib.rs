//! Producer liveness supervision and recovery orchestration.
//!
//! [`FeedRecoveryManager`] owns one [`ProducerRecoveryManager`] per active
//! producer and drives them from a periodic status tick plus the liveness
//! traffic of a dedicated system session. When a producer stalls, its state
//! machine walks `Started -> Delayed -> Disconnected`, notifies the
//! [`FeedStatusListener`] and triggers a bounded REST replay through
//! [`RecoveryOperation`]; a confirming alive or snapshot-complete marker on
//! the feed completes the replay and brings the producer back up.

pub mod api;
pub mod chain;
pub mod error;
pub mod feed;
pub mod listener;
pub mod manager;
pub mod operation;
pub mod producers;
pub mod session;
pub mod tracker;

pub use api::{ApiClient, HttpRecoveryIssuer, ProducerListing};
pub use chain::{CompositeMessageProcessor, MessageProcessor};
pub use error::RecoveryError;
pub use feed::FeedRecoveryManager;
pub use listener::FeedStatusListener;
pub use manager::ProducerRecoveryManager;
pub use operation::{
    FullReplayPolicy, RecoveryOperation, RecoveryRequest, RecoveryRequestIssuer,
    RecoveryRequestStatus, RecoveryScope, RecoveryScopePolicy, StartRecoveryOutcome,
    StatefulWindowPolicy,
};
pub use producers::ProducerManager;
pub use session::FeedSession;
pub use tracker::TimestampTracker;

pub type Result<T> = std::result::Result<T, RecoveryError>;
