use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Channel is already open")]
    AlreadyOpen,

    #[error("Channel is not open")]
    NotOpen,

    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),
}
