//! Frame handling skeleton shared by the connection and channel handlers

use crate::{
    error::{ConnectionError, ProtocolError},
    frames::{Frame, FrameBody, Method},
    synchroniser::Synchroniser,
    util::Latch,
};

/// A per channel frame handler dispatching on the method type.
///
/// Implementors provide the method handlers with an exhaustive `match` in
/// [`on_method`](Actor::on_method); anything they do not expect is reported
/// with [`unexpected`](Actor::unexpected).
pub trait Actor {
    /// Channel the actor handles
    fn channel(&self) -> u16;

    /// Set once the close handshake has started
    fn closing(&self) -> &Latch;

    /// Synchroniser the actor notifies
    fn synchroniser(&self) -> &Synchroniser;

    /// Handles a method that passed the closing filter
    fn on_method(&mut self, method: Method) -> Result<(), ProtocolError>;

    /// Fans the error out to every waiter of this actor
    fn on_poison_pill(&mut self, error: ConnectionError) {
        self.synchroniser().killall(error);
    }

    /// Error for a method the actor has no handler for
    fn unexpected(&self, method: &Method) -> ProtocolError {
        ProtocolError::UnexpectedMethod {
            method: method.method_type(),
            channel: self.channel(),
        }
    }

    /// Handles one frame.
    ///
    /// Once closing, only the close handshake methods and poison pills are
    /// processed. Everything else is dropped.
    fn handle(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        match frame.body {
            FrameBody::PoisonPill(error) => {
                self.on_poison_pill(error);
                Ok(())
            }
            FrameBody::Heartbeat => Ok(()),
            FrameBody::Method(method) => {
                let method_type = method.method_type();
                if self.closing().is_set() && !method_type.is_close() {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(channel = self.channel(), %method_type, "dropped while closing");
                    #[cfg(feature = "log")]
                    log::trace!("dropped {} on channel {} while closing", method_type, self.channel());
                    return Ok(());
                }
                self.on_method(method)
            }
        }
    }
}
