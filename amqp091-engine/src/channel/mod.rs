//! Implements AMQP 0.9.1 Channel

mod error;
mod handler;

pub use error::*;
pub use handler::*;

use crate::{
    dispatcher::Dispatcher,
    error::ConnectionError,
    frames::{Method, MethodType},
    sender::MethodSender,
    synchroniser::Synchroniser,
    util::{Latch, LatchView},
};

/// A logical channel multiplexed over the connection.
///
/// The state of the channel is observed through [`opened`](Channel::opened),
/// [`closing`](Channel::closing) and [`closed`](Channel::closed), which are
/// set by the channel's frame handler as the handshakes progress.
#[derive(Debug)]
pub struct Channel {
    id: u16,
    sender: MethodSender,
    synchroniser: Synchroniser,

    opened: LatchView,
    closing: Latch,
    closed: LatchView,
}

impl Channel {
    /// Creates the channel and registers its frame handler with the
    /// dispatcher. `sender` must be bound to `id`.
    pub fn new(id: u16, sender: MethodSender, dispatcher: &mut Dispatcher) -> Self {
        debug_assert_eq!(id, sender.channel());
        let synchroniser = Synchroniser::new();
        let handler = ChannelFrameHandler::new(id, sender.clone(), synchroniser.clone());

        let channel = Self {
            id,
            sender,
            synchroniser,
            opened: handler.opened.view(),
            closing: handler.closing.clone(),
            closed: handler.closed.view(),
        };
        dispatcher.add_handler(id, handler);
        channel
    }

    /// Channel number
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Set when the peer confirmed the channel is open
    pub fn opened(&self) -> LatchView {
        self.opened.clone()
    }

    /// Set when either side started closing the channel
    pub fn closing(&self) -> LatchView {
        self.closing.view()
    }

    /// Set when the close handshake completed or the connection failed
    pub fn closed(&self) -> LatchView {
        self.closed.clone()
    }

    /// Synchroniser matching the replies of this channel
    pub fn synchroniser(&self) -> &Synchroniser {
        &self.synchroniser
    }

    /// Error the channel was torn down with, if it was torn down because
    /// of a failure rather than a close handshake
    fn failure(&self) -> Option<ConnectionError> {
        match self.synchroniser.connection_error() {
            None | Some(ConnectionError::ChannelClosed { close: None, .. }) => None,
            Some(error) => Some(error),
        }
    }

    /// Sends `channel.open` and waits for the peer's confirmation.
    ///
    /// Fails with [`ChannelError::Closing`] once the channel started closing,
    /// its number may already belong to another channel.
    pub async fn open(&self) -> Result<(), ChannelError> {
        if self.closing.is_set() {
            return Err(ChannelError::Closing(self.id));
        }
        self.sender.send(Method::ChannelOpen)?;
        tokio::select! {
            biased;
            true = self.opened.wait() => Ok(()),
            _ = self.closed.wait() => {
                let error = self.failure().unwrap_or(ConnectionError::ChannelClosed {
                    channel: self.id,
                    close: None,
                });
                Err(error.into())
            }
        }
    }

    /// Sends `method` and waits for one of the `expected` replies
    pub async fn request(
        &self,
        method: Method,
        expected: &[MethodType],
    ) -> Result<Option<Method>, ChannelError> {
        if self.closing.is_set() {
            return Err(ChannelError::Closing(self.id));
        }
        // Register before sending, the reply may be handled before `send` returns
        let reply = self.synchroniser.wait_for(expected);
        self.sender.send(method)?;
        Ok(reply.await?)
    }

    /// Closes the channel by handshaking with the peer.
    ///
    /// Non-close frames are dropped from the moment this is called. If the
    /// channel is already closing, no second `channel.close` is sent and
    /// this only waits for the handshake to complete.
    pub async fn close(&self) -> Result<(), ChannelError> {
        if self.closing.try_set() {
            self.sender.send_channel_close()?;
        }
        if !self.closed.wait().await {
            return Err(ConnectionError::EngineStopped.into());
        }
        match self.failure() {
            // The peer closing the channel first is not an error here
            Some(ConnectionError::ChannelClosed { .. }) | None => Ok(()),
            Some(error) => Err(error.into()),
        }
    }
}
