use thiserror::Error;

/// Errors shared across the feed client crates.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Unknown producer: {0}")]
    UnknownProducer(u16),

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl FeedError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
