use crate::error::{ConnectionError, SendError};

/// Errors associated with a [`Channel`](super::Channel)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The method could not be handed to the transport
    #[error(transparent)]
    Send(#[from] SendError),

    /// The connection failed or the channel got closed while waiting
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The close handshake has started, no new request is accepted
    #[error("Channel {0} is closing")]
    Closing(u16),
}
