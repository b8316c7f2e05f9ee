//! Broker-channel lifecycle over AMQP 0.9.1.
//!
//! One [`ChannelFactory`] owns the single connection; each session holds a
//! [`BrokerChannel`] that declares its own exclusive queue, binds the
//! session's routing keys, and keeps itself alive through a periodic health
//! check. Deliveries are pushed into the session's inbound queue as
//! [`InboundMessage`]s.

pub mod channel;
pub mod error;
pub mod factory;
pub mod scrub;

pub use channel::{BrokerChannel, InboundMessage};
pub use error::BrokerError;
pub use factory::ChannelFactory;

pub type Result<T> = std::result::Result<T, BrokerError>;
