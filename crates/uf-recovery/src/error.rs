use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("Feed is already opened")]
    FeedAlreadyOpened,

    #[error("Feed is not opened")]
    FeedNotOpened,

    #[error("Recovery API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Unexpected API status {status} from {url}")]
    ApiStatus { status: u16, url: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Broker error: {0}")]
    Broker(#[from] uf_broker::BrokerError),

    #[error(transparent)]
    Common(#[from] uf_common::FeedError),
}

impl RecoveryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
