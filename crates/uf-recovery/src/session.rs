use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use uf_broker::{BrokerChannel, ChannelFactory};
use uf_common::{BrokerSettings, FeedMessage, MessageInterest};

use crate::chain::CompositeMessageProcessor;
use crate::Result;

/// One consumer session: an exclusive broker queue bound to the interest's
/// routing keys, plus a pump task that decodes deliveries and runs them
/// through the session's processing chain. Malformed payloads are logged
/// and dropped; they never stop the pump.
pub struct FeedSession {
    id: Uuid,
    interest: MessageInterest,
    channel: Arc<BrokerChannel>,
    chain: Arc<CompositeMessageProcessor>,
    inbound_buffer: usize,
    pump_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl FeedSession {
    pub fn new(
        interest: MessageInterest,
        factory: Arc<ChannelFactory>,
        settings: &BrokerSettings,
        chain: CompositeMessageProcessor,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            interest,
            channel: Arc::new(BrokerChannel::new(factory, settings.clone())),
            chain: Arc::new(chain),
            inbound_buffer: settings.inbound_buffer,
            pump_task: parking_lot::Mutex::new(None),
        }
    }

    pub async fn open(&self) -> Result<()> {
        let (tx, mut rx) = mpsc::channel(self.inbound_buffer);
        self.channel
            .open(self.interest.name(), self.interest.routing_keys(), tx)
            .await?;

        let chain = Arc::clone(&self.chain);
        let kind = self.interest.kind();
        let task = tokio::spawn(async move {
            while let Some(inbound) = rx.recv().await {
                match FeedMessage::from_slice(&inbound.payload) {
                    Ok(message) => chain.process(&message, kind, inbound.received_at).await,
                    Err(e) => warn!(
                        routing_key = %inbound.routing_key,
                        error = %e,
                        "Dropping malformed message"
                    ),
                }
            }
            debug!(interest = kind.name(), "Session pump stopped");
        });
        *self.pump_task.lock() = Some(task);

        info!(session = %self.id, interest = self.interest.name(), "Feed session opened");
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.channel.close().await?;
        if let Some(task) = self.pump_task.lock().take() {
            task.abort();
        }
        info!(session = %self.id, interest = self.interest.name(), "Feed session closed");
        Ok(())
    }
}
