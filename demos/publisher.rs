use amqp_connect::amqp::configuration::RabbitMqSettings;
use amqp_connect::publishers::{AmqpPublisher, DeliveryMode, MessageProperties};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // `RUST_LOG=amqp_connect=debug` shows every step the publisher takes or skips.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // We are using the out-of-the-box parameters for the default RabbitMq Docker image.
    let settings = RabbitMqSettings::default();
    let mut publisher = AmqpPublisher::from_settings(&settings)?;

    publisher.connect().await?;
    publisher.open_channel().await?;

    // `amq.direct` exists on every broker. Nobody is bound to `hello`, so the broker simply
    // drops the message: publishing still succeeds because the message is not mandatory.
    publisher.enable_confirmations().await?;

    let published = publisher
        .publish("amq.direct", "hello", br#"{"hello":"world"}"#)
        .await?;
    println!("Published with the default properties: {published}");

    let persistent = MessageProperties::default()
        .with_delivery_mode(DeliveryMode::Persistent)
        .with_content_type("text/plain");
    let published = publisher
        .publish_with_properties("amq.direct", "hello", persistent.into(), b"Hello world!")
        .await?;
    println!("Published with custom properties: {published}");

    publisher.close_channel().await?;
    // Once the channel is gone, publishing is skipped rather than failing.
    assert!(!publisher.publish("amq.direct", "hello", b"lost").await?);

    publisher.disconnect().await?;
    Ok(())
}
