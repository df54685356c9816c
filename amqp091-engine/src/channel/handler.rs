//! Frame handler driving the channel state machine
//!
//! ```text
//! opening --ChannelOpenOk--> opened --close()/ChannelClose--> closing --ChannelCloseOk--> closed
//! ```

use crate::{
    actor::Actor,
    error::{ConnectionError, ProtocolError},
    frames::{Close, Method},
    sender::MethodSender,
    synchroniser::Synchroniser,
    util::Latch,
};

/// Handles the frames of one channel
#[derive(Debug)]
pub struct ChannelFrameHandler {
    channel: u16,
    sender: MethodSender,
    synchroniser: Synchroniser,

    pub(crate) opened: Latch,
    pub(crate) closing: Latch,
    pub(crate) closed: Latch,

    // Peer's `channel.close` received while our own close is outstanding
    crossed_close: Option<Close>,
}

impl ChannelFrameHandler {
    pub(crate) fn new(channel: u16, sender: MethodSender, synchroniser: Synchroniser) -> Self {
        Self {
            channel,
            sender,
            synchroniser,
            opened: Latch::new(),
            closing: Latch::new(),
            closed: Latch::new(),
            crossed_close: None,
        }
    }

    /// Terminal transition. Requests still pending on the channel will
    /// never get a reply, so they are failed.
    fn on_closed(&mut self, close: Option<Close>) {
        if self.closed.try_set() {
            self.synchroniser.killall(ConnectionError::ChannelClosed {
                channel: self.channel,
                close,
            });
        }
    }

    fn on_remote_close(&mut self, close: Close) {
        #[cfg(feature = "tracing")]
        tracing::debug!(channel = self.channel, %close, "channel closed by peer");
        #[cfg(feature = "log")]
        log::debug!("channel {} closed by peer: {}", self.channel, close);

        // `closing` already set means our `channel.close` is on the wire
        let close_outstanding = !self.closing.try_set();
        if let Err(_err) = self.sender.send_channel_close_ok() {
            // The connection engine fails every channel once the
            // transport is gone
            #[cfg(feature = "tracing")]
            tracing::warn!(channel = self.channel, error = %_err);
            #[cfg(feature = "log")]
            log::warn!("channel {}: {}", self.channel, _err);
        }

        if close_outstanding {
            // The peer still answers our close with `channel.close-ok`,
            // the channel number stays registered until then
            self.crossed_close = Some(close);
        } else {
            // Our CloseOk completes the handshake
            self.on_closed(Some(close));
        }
    }
}

impl Actor for ChannelFrameHandler {
    fn channel(&self) -> u16 {
        self.channel
    }

    fn closing(&self) -> &Latch {
        &self.closing
    }

    fn synchroniser(&self) -> &Synchroniser {
        &self.synchroniser
    }

    fn on_method(&mut self, method: Method) -> Result<(), ProtocolError> {
        match method {
            Method::ChannelOpenOk => {
                if !self.opened.try_set() {
                    return Err(self.unexpected(&method));
                }
            }
            Method::ChannelClose(close) => self.on_remote_close(close),
            Method::ChannelCloseOk => {
                let close = self.crossed_close.take();
                self.on_closed(close);
            }

            // Broadcast by the connection engine
            Method::ConnectionClose(_) => {
                self.closing.try_set();
            }
            Method::ConnectionCloseOk => {
                self.closing.try_set();
                self.on_closed(None);
            }

            method if method.method_type().is_channel_reply() => {
                self.synchroniser.notify(method.method_type(), Some(method));
            }
            _ => return Err(self.unexpected(&method)),
        }
        Ok(())
    }

    fn on_poison_pill(&mut self, error: ConnectionError) {
        self.synchroniser.killall(error);
        self.closing.try_set();
        self.closed.try_set();
    }
}

impl crate::dispatcher::FrameHandler for ChannelFrameHandler {
    fn handle(&mut self, frame: crate::frames::Frame) -> Result<(), ProtocolError> {
        Actor::handle(self, frame)
    }
}
