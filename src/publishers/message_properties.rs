use lapin::BasicProperties;
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Content type stamped on messages published with the default properties.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
/// Content encoding stamped on messages published with the default properties.
pub const DEFAULT_CONTENT_ENCODING: &str = "utf-8";
/// Priority stamped on messages published with the default properties.
pub const DEFAULT_PRIORITY: u8 = 5;

/// AMQP delivery mode.
///
/// Deserializes from its name (`"transient"`, `"persistent"`) or its wire value (`1`, `2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "RawDeliveryMode")]
pub enum DeliveryMode {
    /// The broker may drop the message on restart (`1`).
    #[default]
    Transient,
    /// The broker writes the message to disk if the queue is durable (`2`).
    Persistent,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDeliveryMode {
    Wire(u8),
    Name(String),
}

impl TryFrom<RawDeliveryMode> for DeliveryMode {
    type Error = String;

    fn try_from(raw: RawDeliveryMode) -> Result<Self, Self::Error> {
        match raw {
            RawDeliveryMode::Wire(1) => Ok(DeliveryMode::Transient),
            RawDeliveryMode::Wire(2) => Ok(DeliveryMode::Persistent),
            RawDeliveryMode::Name(name) if name == "transient" => Ok(DeliveryMode::Transient),
            RawDeliveryMode::Name(name) if name == "persistent" => Ok(DeliveryMode::Persistent),
            RawDeliveryMode::Wire(other) => Err(format!(
                "unknown delivery mode `{other}`, expected 1 or 2"
            )),
            RawDeliveryMode::Name(other) => Err(format!(
                "unknown delivery mode `{other}`, expected `transient` or `persistent`"
            )),
        }
    }
}

impl DeliveryMode {
    /// The value carried on the wire.
    pub fn as_u8(self) -> u8 {
        match self {
            DeliveryMode::Transient => 1,
            DeliveryMode::Persistent => 2,
        }
    }
}

/// The flat set of properties attached to messages published without caller-supplied
/// [`BasicProperties`].
///
/// ```rust
/// use amqp_connect::publishers::{DeliveryMode, MessageProperties};
///
/// let properties = MessageProperties::default()
///     .with_delivery_mode(DeliveryMode::Persistent)
///     .with_timestamp(1_700_000_000)
///     .to_basic_properties();
///
/// assert_eq!(Some(2), *properties.delivery_mode());
/// assert_eq!(Some(1_700_000_000), *properties.timestamp());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MessageProperties {
    pub content_type: String,
    pub content_encoding: String,
    pub delivery_mode: DeliveryMode,
    pub priority: u8,
    /// UNIX timestamp, in seconds. When `None` the current time is used.
    pub timestamp: Option<u64>,
}

impl Default for MessageProperties {
    fn default() -> Self {
        Self {
            content_type: DEFAULT_CONTENT_TYPE.into(),
            content_encoding: DEFAULT_CONTENT_ENCODING.into(),
            delivery_mode: DeliveryMode::default(),
            priority: DEFAULT_PRIORITY,
            timestamp: None,
        }
    }
}

impl MessageProperties {
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    #[must_use]
    pub fn with_content_encoding(mut self, content_encoding: impl Into<String>) -> Self {
        self.content_encoding = content_encoding.into();
        self
    }

    #[must_use]
    pub fn with_delivery_mode(mut self, delivery_mode: DeliveryMode) -> Self {
        self.delivery_mode = delivery_mode;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Pin the timestamp instead of stamping the current time.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Build the [`BasicProperties`] handed over to the AMQP client.
    pub fn to_basic_properties(&self) -> BasicProperties {
        let properties = BasicProperties::default()
            .with_content_type(self.content_type.as_str().into())
            .with_content_encoding(self.content_encoding.as_str().into())
            .with_delivery_mode(self.delivery_mode.as_u8())
            .with_priority(self.priority);

        match self.timestamp.or_else(current_timestamp) {
            Some(ts) => properties.with_timestamp(ts),
            None => properties,
        }
    }
}

impl From<MessageProperties> for BasicProperties {
    fn from(properties: MessageProperties) -> Self {
        properties.to_basic_properties()
    }
}

fn current_timestamp() -> Option<u64> {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(since_epoch) => Some(since_epoch.as_secs()),
        Err(_) => {
            warn!("System time is before 1970");
            None
        }
    }
}
