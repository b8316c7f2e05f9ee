//! UnifiedFeed shared types
//!
//! This crate holds everything the broker layer and the recovery core share:
//! - FeedMessage: the wire message model and its JSON codec
//! - MessageInterest: session filters and their routing keys
//! - Producer: immutable upstream-source metadata and lifecycle status types
//! - FeedSettings: validated configuration for broker, recovery and API access

pub mod error;
pub mod interest;
pub mod message;
pub mod producer;
pub mod settings;

pub use error::FeedError;
pub use interest::{InterestKind, MessageInterest};
pub use message::{AliveMessage, EventMessage, FeedMessage, SnapshotCompleteMessage};
pub use producer::{Producer, ProducerDownReason, ProducerScope, ProducerStatus};
pub use settings::{ApiSettings, BrokerSettings, FeedSettings, RecoverySettings};

pub type Result<T> = std::result::Result<T, FeedError>;
