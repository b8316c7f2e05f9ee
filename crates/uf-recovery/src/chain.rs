use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use uf_common::{FeedMessage, InterestKind};

use crate::manager::ProducerRecoveryManager;

/// One stage of a session's processing chain.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    fn name(&self) -> &str;

    async fn process(
        &self,
        message: &FeedMessage,
        interest: InterestKind,
        received_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}

/// Runs processors in order. A failing processor is logged and skipped;
/// the rest of the chain still sees the message.
pub struct CompositeMessageProcessor {
    processors: Vec<Arc<dyn MessageProcessor>>,
}

impl CompositeMessageProcessor {
    pub fn new(processors: Vec<Arc<dyn MessageProcessor>>) -> Self {
        Self { processors }
    }

    pub async fn process(
        &self,
        message: &FeedMessage,
        interest: InterestKind,
        received_at: DateTime<Utc>,
    ) {
        for processor in &self.processors {
            if let Err(e) = processor.process(message, interest, received_at).await {
                warn!(
                    processor = processor.name(),
                    error = %e,
                    "Message processor failed, continuing with the rest of the chain"
                );
            }
        }
    }
}

/// Recovery bookkeeping stage: routes each message to its producer's state
/// machine. Messages from unknown producers are dropped.
pub(crate) struct RecoveryMessageProcessor {
    managers: Arc<DashMap<u16, Arc<ProducerRecoveryManager>>>,
}

impl RecoveryMessageProcessor {
    pub(crate) fn new(managers: Arc<DashMap<u16, Arc<ProducerRecoveryManager>>>) -> Self {
        Self { managers }
    }
}

#[async_trait]
impl MessageProcessor for RecoveryMessageProcessor {
    fn name(&self) -> &str {
        "recovery"
    }

    async fn process(
        &self,
        message: &FeedMessage,
        interest: InterestKind,
        received_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let manager = self
            .managers
            .get(&message.producer_id())
            .map(|entry| Arc::clone(entry.value()));
        match manager {
            Some(manager) => manager.process_message(message, interest, received_at).await,
            None => debug!(
                producer_id = message.producer_id(),
                "Message from unknown producer dropped"
            ),
        }
        Ok(())
    }
}
