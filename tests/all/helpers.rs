use amqp_connect::amqp::publisher_confirm::Confirmation;
use amqp_connect::amqp::{options::BasicPublishOptions, BasicProperties};
use amqp_connect::publishers::{AmqpPublisher, PublisherError};
use amqp_connect::transport::{TransportChannel, TransportConnection, TransportFactory};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Everything the publisher asked the transport to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    CloseConnection,
    CreateChannel,
    CloseChannel,
    BindQueue {
        queue: String,
        exchange: String,
        routing_key: String,
    },
    ConfirmSelect,
    Publish(Published),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub exchange: String,
    pub routing_key: String,
    pub payload: Vec<u8>,
    pub properties: BasicProperties,
    pub mandatory: bool,
    pub immediate: bool,
    pub wait_for_confirmation: bool,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    connection_open: bool,
    channel_open: bool,
    refuse_connections: bool,
    nack: bool,
    publish_delay: Option<Duration>,
}

/// An in-memory stand-in for a RabbitMq broker, recording every call it receives.
#[derive(Clone, Default)]
pub struct FakeBroker(Arc<Mutex<State>>);

impl FakeBroker {
    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn published(&self) -> Vec<Published> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Publish(published) => Some(published),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn refuse_connections(&self) {
        self.state().refuse_connections = true;
    }

    pub fn nack_everything(&self) {
        self.state().nack = true;
    }

    pub fn delay_publishing(&self, delay: Duration) {
        self.state().publish_delay = Some(delay);
    }

    /// The broker closes the channel on its own, e.g. after a protocol error.
    pub fn drop_channel(&self) {
        self.state().channel_open = false;
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }
}

pub struct FakeFactory(pub FakeBroker);
pub struct FakeConnection(FakeBroker);
pub struct FakeChannel(FakeBroker);

#[async_trait::async_trait]
impl TransportFactory for FakeFactory {
    type Connection = FakeConnection;

    async fn connect(&self) -> Result<FakeConnection, PublisherError> {
        let broker = &self.0;
        if broker.state().refuse_connections {
            return Err(PublisherError::Connection(anyhow::anyhow!(
                "Connection refused"
            )));
        }
        broker.record(Call::Connect);
        broker.state().connection_open = true;
        Ok(FakeConnection(broker.clone()))
    }
}

#[async_trait::async_trait]
impl TransportConnection for FakeConnection {
    type Channel = FakeChannel;

    fn is_open(&self) -> bool {
        self.0.state().connection_open
    }

    async fn create_channel(&self) -> Result<FakeChannel, anyhow::Error> {
        self.0.record(Call::CreateChannel);
        self.0.state().channel_open = true;
        Ok(FakeChannel(self.0.clone()))
    }

    async fn close(&self) -> Result<(), anyhow::Error> {
        self.0.record(Call::CloseConnection);
        let mut state = self.0.state();
        state.connection_open = false;
        state.channel_open = false;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TransportChannel for FakeChannel {
    fn is_open(&self) -> bool {
        let state = self.0.state();
        state.connection_open && state.channel_open
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), anyhow::Error> {
        self.0.record(Call::BindQueue {
            queue: queue.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        });
        Ok(())
    }

    async fn confirm_select(&self) -> Result<(), anyhow::Error> {
        self.0.record(Call::ConfirmSelect);
        Ok(())
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
        let delay = self.0.state().publish_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.0.record(Call::Publish(Published {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            payload: payload.to_vec(),
            properties,
            mandatory: options.mandatory,
            immediate: options.immediate,
            wait_for_confirmation,
        }));

        if !wait_for_confirmation {
            return Ok(Confirmation::NotRequested);
        }
        if self.0.state().nack {
            Ok(Confirmation::Nack(None))
        } else {
            Ok(Confirmation::Ack(None))
        }
    }

    async fn close(&self) -> Result<(), anyhow::Error> {
        self.0.record(Call::CloseChannel);
        self.0.state().channel_open = false;
        Ok(())
    }
}

/// A publisher wired to a fresh fake broker.
pub fn fake_publisher() -> (AmqpPublisher<FakeFactory>, FakeBroker) {
    let broker = FakeBroker::default();
    (AmqpPublisher::with_factory(FakeFactory(broker.clone())), broker)
}

/// A publisher wired to a fresh fake broker, connected and with an open channel.
pub async fn ready_publisher() -> (AmqpPublisher<FakeFactory>, FakeBroker) {
    let (mut publisher, broker) = fake_publisher();
    publisher.connect().await.unwrap();
    publisher.open_channel().await.unwrap();
    (publisher, broker)
}
