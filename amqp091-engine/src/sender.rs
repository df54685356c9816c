//! Outgoing half: methods handed to the transport for encoding

use tokio::sync::mpsc;

use crate::{
    error::SendError,
    frames::{Method, CONNECTION_CHANNEL},
};

/// A method queued for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMethod {
    /// Channel the method is sent on
    pub channel: u16,

    /// The method
    pub method: Method,
}

/// Sends methods on one channel.
///
/// Sending only enqueues the method, nothing is returned by the peer
/// through this type.
#[derive(Debug, Clone)]
pub struct MethodSender {
    channel: u16,
    outgoing: mpsc::UnboundedSender<OutgoingMethod>,
}

impl MethodSender {
    /// Creates a sender bound to `channel`
    pub fn new(channel: u16, outgoing: mpsc::UnboundedSender<OutgoingMethod>) -> Self {
        Self { channel, outgoing }
    }

    /// Creates a sender for connection methods (channel 0)
    pub fn connection(outgoing: mpsc::UnboundedSender<OutgoingMethod>) -> Self {
        Self::new(CONNECTION_CHANNEL, outgoing)
    }

    /// The channel this sender is bound to
    pub fn channel(&self) -> u16 {
        self.channel
    }

    /// Same transport, different channel
    pub fn with_channel(&self, channel: u16) -> Self {
        Self::new(channel, self.outgoing.clone())
    }

    /// Whether the transport dropped its receiving half
    pub fn is_closed(&self) -> bool {
        self.outgoing.is_closed()
    }

    /// Enqueues `method`
    pub fn send(&self, method: Method) -> Result<(), SendError> {
        let method_type = method.method_type();
        self.outgoing
            .send(OutgoingMethod {
                channel: self.channel,
                method,
            })
            .map_err(|_| SendError::TransportClosed(method_type))
    }

    /// Sends `channel.close` on behalf of the application
    pub fn send_channel_close(&self) -> Result<(), SendError> {
        self.send(Method::channel_close_by_application())
    }

    /// Acknowledges a `channel.close`
    pub fn send_channel_close_ok(&self) -> Result<(), SendError> {
        self.send(Method::ChannelCloseOk)
    }

    /// Acknowledges a `connection.close`
    pub fn send_connection_close_ok(&self) -> Result<(), SendError> {
        self.send(Method::ConnectionCloseOk)
    }
}
