//! `amqp-connect` is a thin publisher façade, built on top of [`lapin`], to open a connection
//! and a channel to RabbitMq and publish messages on them.
//!
//! [`AmqpPublisher`](crate::publishers::AmqpPublisher) is the best starting point: it keeps
//! one connection and one channel, and hands every operation over to [`lapin`] after checking
//! that what it needs is open.
//!
//! [`RabbitMqSettings`](crate::amqp::configuration::RabbitMqSettings) holds everything needed
//! to configure it, and can be deserialized with `serde`.

pub mod amqp;
pub mod publishers;
pub mod transport;
