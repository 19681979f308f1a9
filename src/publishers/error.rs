use lapin::message::BasicReturnMessage;

/// Error returned by [`AmqpPublisher`](super::AmqpPublisher).
///
/// Guard conditions (no url, no open connection, no open channel) are never errors:
/// they are logged and skipped.
#[derive(thiserror::Error, Debug)]
pub enum PublisherError {
    #[error("The AMQP url is malformed: {0}")]
    InvalidUrl(String),
    #[error("Failed to set up TLS for the connection to the RabbitMq broker")]
    Tls(#[source] anyhow::Error),
    #[error("Failed to connect to the RabbitMq broker")]
    Connection(#[source] anyhow::Error),
    #[error("The timeout threshold was reached while trying to connect to the RabbitMq broker")]
    ConnectionTimeout,
    #[error("Generic error encountered when interacting with the RabbitMq broker")]
    GenericError(#[source] anyhow::Error),
    #[error("The timeout threshold was reached while trying to publish the message")]
    PublishTimeout,
    #[error("The message could not be routed: {0:?}")]
    UnroutableMessage(Box<BasicReturnMessage>),
    #[error("The RabbitMq broker nacked the publishing of the message: {0:?}")]
    NegativeAck(Option<Box<BasicReturnMessage>>),
}
