//! AMQP 0.9.1 methods known to the engine
//!
//! Only the method frame is modelled. Content header and body frames that
//! follow `basic.deliver` / `basic.get-ok` are handled outside of the engine.

use std::fmt::Display;

/// Reply code used when the application closes a channel or connection
pub const REPLY_SUCCESS: u16 = 200;

/// Arguments shared by `connection.close` and `channel.close`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Close {
    /// Reply code, `200` for a normal close
    pub reply_code: u16,
    /// Human readable reason
    pub reply_text: String,
    /// Class of the method that caused the close, 0 if none
    pub class_id: u16,
    /// Method that caused the close, 0 if none
    pub method_id: u16,
}

impl Close {
    /// Creates the close arguments
    pub fn new(
        reply_code: u16,
        reply_text: impl Into<String>,
        class_id: u16,
        method_id: u16,
    ) -> Self {
        Self {
            reply_code,
            reply_text: reply_text.into(),
            class_id,
            method_id,
        }
    }
}

impl Display for Close {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:?} (class {}, method {})",
            self.reply_code, self.reply_text, self.class_id, self.method_id
        )
    }
}

/// Arguments of `connection.start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStart {
    /// Protocol major version
    pub version_major: u8,
    /// Protocol minor version
    pub version_minor: u8,
    /// Space separated SASL mechanisms offered by the server
    pub mechanisms: String,
    /// Space separated message locales offered by the server
    pub locales: String,
}

/// Arguments of `connection.start-ok`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStartOk {
    /// Selected SASL mechanism
    pub mechanism: String,
    /// SASL response
    pub response: Vec<u8>,
    /// Selected message locale
    pub locale: String,
}

/// Arguments of both `connection.tune` and `connection.tune-ok`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tune {
    /// Highest channel number, 0 for no limit
    pub channel_max: u16,
    /// Largest frame size, 0 for no limit
    pub frame_max: u32,
    /// Heartbeat interval in seconds, 0 to disable
    pub heartbeat: u16,
}

/// Arguments of `connection.open`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOpen {
    /// Virtual host to open
    pub virtual_host: String,
}

/// Arguments of `exchange.declare`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDeclare {
    /// Exchange name
    pub exchange: String,
    /// Exchange type, e.g. `direct` or `topic`
    pub kind: String,
    /// Survives a broker restart
    pub durable: bool,
}

/// Arguments of `exchange.delete`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDelete {
    /// Exchange name
    pub exchange: String,
    /// Only delete the exchange if it has no binding
    pub if_unused: bool,
}

/// Arguments of `queue.declare`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDeclare {
    /// Queue name, empty to let the server pick one
    pub queue: String,
    /// Survives a broker restart
    pub durable: bool,
    /// Only accessible by this connection
    pub exclusive: bool,
    /// Deleted once the last consumer is gone
    pub auto_delete: bool,
}

/// Arguments of `queue.declare-ok`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDeclareOk {
    /// Queue name
    pub queue: String,
    /// Number of ready messages
    pub message_count: u32,
    /// Number of active consumers
    pub consumer_count: u32,
}

/// Arguments of `queue.bind` and `queue.unbind`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBind {
    /// Queue name
    pub queue: String,
    /// Exchange name
    pub exchange: String,
    /// Binding key
    pub routing_key: String,
}

/// Arguments of `queue.purge` and `queue.delete`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueName {
    /// Queue name
    pub queue: String,
}

/// Arguments of `queue.purge-ok` and `queue.delete-ok`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCount {
    /// Number of messages purged or deleted
    pub message_count: u32,
}

/// Arguments of `basic.qos`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicQos {
    /// Prefetch window in octets, 0 for no limit
    pub prefetch_size: u32,
    /// Prefetch window in messages, 0 for no limit
    pub prefetch_count: u16,
    /// Apply to the whole connection
    pub global: bool,
}

/// Arguments of `basic.consume`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicConsume {
    /// Queue to consume from
    pub queue: String,
    /// Consumer tag, empty to let the server pick one
    pub consumer_tag: String,
    /// Deliveries need no acknowledgement
    pub no_ack: bool,
    /// Only consumer of the queue
    pub exclusive: bool,
}

/// Arguments of `basic.consume-ok`, `basic.cancel` and `basic.cancel-ok`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerTag {
    /// Consumer tag
    pub consumer_tag: String,
}

/// Arguments of `basic.get`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicGet {
    /// Queue to get from
    pub queue: String,
    /// The message needs no acknowledgement
    pub no_ack: bool,
}

/// Arguments of `basic.get-ok`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicGetOk {
    /// Server assigned delivery tag
    pub delivery_tag: u64,
    /// The message was delivered before
    pub redelivered: bool,
    /// Exchange the message was published to
    pub exchange: String,
    /// Routing key the message was published with
    pub routing_key: String,
    /// Messages left in the queue
    pub message_count: u32,
}

/// Arguments of `basic.deliver`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicDeliver {
    /// Consumer the message is delivered to
    pub consumer_tag: String,
    /// Server assigned delivery tag
    pub delivery_tag: u64,
    /// The message was delivered before
    pub redelivered: bool,
    /// Exchange the message was published to
    pub exchange: String,
    /// Routing key the message was published with
    pub routing_key: String,
}

/// Arguments of `basic.ack`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicAck {
    /// Delivery tag to acknowledge
    pub delivery_tag: u64,
    /// Acknowledge every delivery up to and including the tag
    pub multiple: bool,
}

macro_rules! methods {
    ($($variant:ident $(($args:ty))?),* $(,)?) => {
        /// A decoded AMQP 0.9.1 method
        #[derive(Debug, Clone, PartialEq)]
        pub enum Method {
            $(
                #[doc = concat!("`", stringify!($variant), "`")]
                $variant $(($args))?
            ),*
        }

        /// Tag identifying the shape of a [`Method`].
        ///
        /// This is the key used to match replies with waiters in the
        /// [`Synchroniser`](crate::synchroniser::Synchroniser).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum MethodType {
            $(
                #[doc = concat!("Tag of [`Method::", stringify!($variant), "`]")]
                $variant
            ),*
        }

        impl Method {
            /// Get the tag of this method
            pub fn method_type(&self) -> MethodType {
                match self {
                    $(Method::$variant { .. } => MethodType::$variant),*
                }
            }
        }

        impl MethodType {
            /// Name of the method, e.g. `ChannelOpenOk`
            pub fn name(&self) -> &'static str {
                match self {
                    $(MethodType::$variant => stringify!($variant)),*
                }
            }
        }
    };
}

methods! {
    ConnectionStart(ConnectionStart),
    ConnectionStartOk(ConnectionStartOk),
    ConnectionTune(Tune),
    ConnectionTuneOk(Tune),
    ConnectionOpen(ConnectionOpen),
    ConnectionOpenOk,
    ConnectionClose(Close),
    ConnectionCloseOk,

    ChannelOpen,
    ChannelOpenOk,
    ChannelClose(Close),
    ChannelCloseOk,

    ExchangeDeclare(ExchangeDeclare),
    ExchangeDeclareOk,
    ExchangeDelete(ExchangeDelete),
    ExchangeDeleteOk,

    QueueDeclare(QueueDeclare),
    QueueDeclareOk(QueueDeclareOk),
    QueueBind(QueueBind),
    QueueBindOk,
    QueueUnbind(QueueBind),
    QueueUnbindOk,
    QueuePurge(QueueName),
    QueuePurgeOk(MessageCount),
    QueueDelete(QueueName),
    QueueDeleteOk(MessageCount),

    BasicQos(BasicQos),
    BasicQosOk,
    BasicConsume(BasicConsume),
    BasicConsumeOk(ConsumerTag),
    BasicCancel(ConsumerTag),
    BasicCancelOk(ConsumerTag),
    BasicGet(BasicGet),
    BasicGetOk(BasicGetOk),
    BasicGetEmpty,
    BasicDeliver(BasicDeliver),
    BasicAck(BasicAck),
    BasicRecover,
    BasicRecoverOk,
}

impl MethodType {
    /// Methods of the close handshake. These are the only methods an actor
    /// still processes once it is closing.
    pub fn is_close(&self) -> bool {
        matches!(
            self,
            MethodType::ConnectionClose
                | MethodType::ConnectionCloseOk
                | MethodType::ChannelClose
                | MethodType::ChannelCloseOk
        )
    }

    /// Synchronous replies that a channel hands to its synchroniser
    pub fn is_channel_reply(&self) -> bool {
        matches!(
            self,
            MethodType::ExchangeDeclareOk
                | MethodType::ExchangeDeleteOk
                | MethodType::QueueDeclareOk
                | MethodType::QueueBindOk
                | MethodType::QueueUnbindOk
                | MethodType::QueuePurgeOk
                | MethodType::QueueDeleteOk
                | MethodType::BasicQosOk
                | MethodType::BasicConsumeOk
                | MethodType::BasicCancelOk
                | MethodType::BasicGetOk
                | MethodType::BasicGetEmpty
                | MethodType::BasicRecoverOk
        )
    }
}

impl Display for MethodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Method {
    /// `channel.close` as sent when the application closes a channel
    pub fn channel_close_by_application() -> Self {
        Method::ChannelClose(Close::new(
            REPLY_SUCCESS,
            "Channel closed by application",
            0,
            0,
        ))
    }

    /// `connection.close` as sent when the application closes the connection
    pub fn connection_close_by_application() -> Self {
        Method::ConnectionClose(Close::new(
            REPLY_SUCCESS,
            "Connection closed by application",
            0,
            0,
        ))
    }
}
