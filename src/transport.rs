//! The seam between [`AmqpPublisher`](crate::publishers::AmqpPublisher) and the AMQP client.
//!
//! The publisher only ever talks to these traits. They are implemented for
//! [`ConnectionFactory`], [`lapin::Connection`] and [`lapin::Channel`], which is what you get
//! out of the box, but any other implementation (e.g. an in-memory fake for tests) can be
//! plugged in via [`AmqpPublisher::with_factory`](crate::publishers::AmqpPublisher::with_factory).
use crate::amqp::ConnectionFactory;
use crate::publishers::PublisherError;
use anyhow::Context;
use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions, QueueBindOptions},
    publisher_confirm::Confirmation,
    types::FieldTable,
    BasicProperties,
};

/// AMQP reply code sent along a graceful close.
const REPLY_SUCCESS: u16 = 200;

/// Something able to open connections to a broker.
#[async_trait::async_trait]
pub trait TransportFactory: Send + Sync {
    type Connection: TransportConnection;

    /// Open a new connection.
    ///
    /// Fails with [`PublisherError::Connection`] or [`PublisherError::ConnectionTimeout`].
    async fn connect(&self) -> Result<Self::Connection, PublisherError>;
}

/// An open (or once open) connection to a broker.
#[async_trait::async_trait]
pub trait TransportConnection: Send + Sync {
    type Channel: TransportChannel;

    fn is_open(&self) -> bool;

    async fn create_channel(&self) -> Result<Self::Channel, anyhow::Error>;

    async fn close(&self) -> Result<(), anyhow::Error>;
}

/// A channel multiplexed over a [`TransportConnection`].
#[async_trait::async_trait]
pub trait TransportChannel: Send + Sync {
    fn is_open(&self) -> bool;

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), anyhow::Error>;

    /// Put the channel in publisher-confirm mode.
    async fn confirm_select(&self) -> Result<(), anyhow::Error>;

    /// Publish `payload`.
    ///
    /// When `wait_for_confirmation` is `false` this returns [`Confirmation::NotRequested`]
    /// as soon as the frames are handed over to the client.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        options: BasicPublishOptions,
        payload: &[u8],
        properties: BasicProperties,
        wait_for_confirmation: bool,
    ) -> Result<Confirmation, anyhow::Error>;

    async fn close(&self) -> Result<(), anyhow::Error>;
}

#[async_trait::async_trait]
impl TransportFactory for ConnectionFactory {
    type Connection = lapin::Connection;

    async fn connect(&self) -> Result<lapin::Connection, PublisherError> {
        self.new_connection().await
    }
}

#[async_trait::async_trait]
impl TransportConnection for lapin::Connection {
    type Channel = lapin::Channel;

    fn is_open(&self) -> bool {
        self.status().connected()
    }

    #[tracing::instrument(name = "rabbitmq_create_channel", skip(self))]
    async fn create_channel(&self) -> Result<lapin::Channel, anyhow::Error> {
        lapin::Connection::create_channel(self)
            .await
            .context("Failed to create a RabbitMQ channel.")
    }

    async fn close(&self) -> Result<(), anyhow::Error> {
        lapin::Connection::close(self, REPLY_SUCCESS, "OK")
            .await
            .context("Failed to close the RabbitMQ connection.")
    }
}

#[async_trait::async_trait]
impl TransportChannel for lapin::Channel {
    fn is_open(&self) -> bool {
        self.status().connected()
    }

    #[tracing::instrument(name = "rabbitmq_bind_queue", skip(self))]
    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), anyhow::Error> {
        self.queue_bind(
            queue,
            exchange,
            routing_key,
            QueueBindOptions { nowait: false },
            FieldTable::default(),
        )
        .await
        .with_context(|| format!("Failed to bind queue `{queue}` to exchange `{exchange}`."))
    }

    async fn confirm_select(&self) -> Result<(), anyhow::Error> {
        // See https://www.rabbitmq.com/amqp-0-9-1-reference.html#confirm.select.nowait
        lapin::Channel::confirm_select(self, ConfirmSelectOptions { nowait: false })
            .await
            .context("Failed to enable publisher confirms on the RabbitMQ channel.")
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        options: BasicPublishOptions,
        payload: &[u8],
        properties: BasicProperties,
        wait_for_confirmation: bool,
    ) -> Result<Confirmation, anyhow::Error> {
        let confirm = self
            .basic_publish(exchange, routing_key, options, payload, properties)
            .await
            .context("Failed to publish the message to RabbitMQ.")?;
        if !wait_for_confirmation {
            return Ok(Confirmation::NotRequested);
        }
        confirm
            .await
            .context("Failed to receive the publisher confirmation from RabbitMQ.")
    }

    async fn close(&self) -> Result<(), anyhow::Error> {
        lapin::Channel::close(self, REPLY_SUCCESS, "OK")
            .await
            .context("Failed to close the RabbitMQ channel.")
    }
}
