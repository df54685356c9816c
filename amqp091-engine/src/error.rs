//! Errors shared by every part of the engine

use crate::frames::{Close, MethodType};

/// The peer sent something the engine has no way of handling.
///
/// This is fatal to the scope that received it and is escalated to a
/// poison pill by the connection engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// No handler is defined for the method on this channel
    #[error("No handler defined for {method} on channel {channel}")]
    UnexpectedMethod {
        /// Type of the offending method
        method: MethodType,
        /// Channel the method arrived on
        channel: u16,
    },

    /// A frame referenced a channel the client does not know about
    #[error("Frame received on unknown channel {0}")]
    UnknownChannel(u16),
}

/// Fatal failure of a connection.
///
/// Every waiter still pending when the failure is fanned out is resolved
/// with a clone of the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// The peer closed the connection
    #[error("Remote closed connection: {0}")]
    RemoteClosed(Close),

    /// The channel completed its close handshake. `close` holds the
    /// arguments of the peer's `channel.close` if the peer closed it
    #[error("Channel {channel} is closed")]
    ChannelClosed {
        /// Channel number
        channel: u16,
        /// Arguments of the peer's `channel.close`
        close: Option<Close>,
    },

    /// The connection was closed by the application
    #[error("Connection closed by application")]
    LocalClosed,

    /// The transport stopped producing frames
    #[error("Transport is closed")]
    TransportClosed,

    /// The engine event loop has stopped before a reply arrived
    #[error("Connection engine has stopped")]
    EngineStopped,

    /// A protocol error tore the connection down
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// An outgoing method could not be handed to the transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The receiving half of the outgoing queue is dropped
    #[error("Transport is closed, cannot send {0}")]
    TransportClosed(MethodType),
}

impl From<SendError> for ConnectionError {
    fn from(_: SendError) -> Self {
        Self::TransportClosed
    }
}
