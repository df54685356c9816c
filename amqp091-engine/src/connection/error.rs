//! Implements errors associated with the connection

use tokio::task::JoinError;

use crate::{
    channel::ChannelError,
    error::{ConnectionError, SendError},
};

/// Errors associated with [`ConnectionHandle`](super::ConnectionHandle)
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// This could occur only when the user attempts to close the connection
    #[error(transparent)]
    JoinError(#[from] JoinError),

    /// The connection failed
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A method could not be handed to the transport
    #[error(transparent)]
    Send(#[from] SendError),
}

/// Error associated with allocation of a new channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocChannelError {
    /// The connection is closing or the engine has stopped
    #[error("Illegal local state")]
    IllegalState,

    /// Every channel number up to channel-max is in use
    #[error("Reached connection channel max")]
    ChannelMaxReached,
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for AllocChannelError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        // The engine event loop is gone
        Self::IllegalState
    }
}

/// Error associated with opening a new channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpenChannelError {
    /// No channel number could be allocated
    #[error(transparent)]
    Alloc(#[from] AllocChannelError),

    /// The open handshake failed
    #[error(transparent)]
    Channel(#[from] ChannelError),
}
