//! Facilities to publish messages to a RabbitMq exchange. Check out [`AmqpPublisher`] as a starting point.
mod error;
mod message_properties;
mod publisher;

pub use error::PublisherError;
pub use message_properties::{
    DeliveryMode, MessageProperties, DEFAULT_CONTENT_ENCODING, DEFAULT_CONTENT_TYPE,
    DEFAULT_PRIORITY,
};
pub use publisher::AmqpPublisher;
