//! Handler of the connection channel (channel 0)

use crate::{
    actor::Actor,
    error::{ConnectionError, ProtocolError},
    frames::{Close, Method, CONNECTION_CHANNEL},
    sender::MethodSender,
    synchroniser::Synchroniser,
    util::Latch,
};

/// Drives the connection close handshake and hands connection level
/// replies to the synchroniser
#[derive(Debug)]
pub struct ConnectionActor {
    sender: MethodSender,
    synchroniser: Synchroniser,

    pub(crate) closing: Latch,
    pub(crate) closed: Latch,
}

impl ConnectionActor {
    pub(crate) fn new(sender: MethodSender, synchroniser: Synchroniser) -> Self {
        Self {
            sender,
            synchroniser,
            closing: Latch::new(),
            closed: Latch::new(),
        }
    }

    fn on_remote_close(&mut self, close: Close) {
        #[cfg(feature = "tracing")]
        tracing::info!(%close, "connection closed by peer");
        #[cfg(feature = "log")]
        log::info!("connection closed by peer: {}", close);

        self.closing.try_set();
        if let Err(_err) = self.sender.send_connection_close_ok() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err);
            #[cfg(feature = "log")]
            log::warn!("{}", _err);
        }
        self.synchroniser
            .killall(ConnectionError::RemoteClosed(close));
        self.closed.try_set();
    }
}

impl Actor for ConnectionActor {
    fn channel(&self) -> u16 {
        CONNECTION_CHANNEL
    }

    fn closing(&self) -> &Latch {
        &self.closing
    }

    fn synchroniser(&self) -> &Synchroniser {
        &self.synchroniser
    }

    fn on_method(&mut self, method: Method) -> Result<(), ProtocolError> {
        match method {
            Method::ConnectionStart(_) | Method::ConnectionTune(_) | Method::ConnectionOpenOk => {
                self.synchroniser.notify(method.method_type(), Some(method));
            }
            Method::ConnectionClose(close) => self.on_remote_close(close),
            Method::ConnectionCloseOk => {
                self.synchroniser.notify(method.method_type(), None);
                self.synchroniser.killall(ConnectionError::LocalClosed);
                self.closing.try_set();
                self.closed.try_set();
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

impl crate::dispatcher::FrameHandler for ConnectionActor {
    fn handle(&mut self, frame: crate::frames::Frame) -> Result<(), ProtocolError> {
        Actor::handle(self, frame)
    }
}
