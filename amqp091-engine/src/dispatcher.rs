//! Routes inbound frames to the handler of their channel

use std::collections::HashMap;

use crate::{
    error::ProtocolError,
    frames::{Frame, FrameBody},
};

/// Something that consumes the frames of one channel
pub trait FrameHandler: Send {
    /// Handles one frame
    fn handle(&mut self, frame: Frame) -> Result<(), ProtocolError>;
}

impl<F> FrameHandler for F
where
    F: FnMut(Frame) -> Result<(), ProtocolError> + Send,
{
    fn handle(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        (self)(frame)
    }
}

/// Maps channel numbers to frame handlers
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<u16, Box<dyn FrameHandler>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut channels: Vec<&u16> = self.handlers.keys().collect();
        channels.sort();
        f.debug_struct("Dispatcher")
            .field("channels", &channels)
            .finish()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with no handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `channel`, replacing any handler that was
    /// registered for it before
    pub fn add_handler(&mut self, channel: u16, handler: impl FrameHandler + 'static) {
        if self.handlers.insert(channel, Box::new(handler)).is_some() {
            #[cfg(feature = "tracing")]
            tracing::debug!(channel, "replaced frame handler");
            #[cfg(feature = "log")]
            log::debug!("replaced frame handler of channel {}", channel);
        }
    }

    /// Removes the handler of `channel`. Removing an unknown channel is a
    /// no-op.
    pub fn remove_handler(&mut self, channel: u16) {
        if self.handlers.remove(&channel).is_none() {
            #[cfg(feature = "tracing")]
            tracing::warn!(channel, "no frame handler to remove");
            #[cfg(feature = "log")]
            log::warn!("no frame handler to remove for channel {}", channel);
        }
    }

    /// Whether a handler is registered for `channel`
    pub fn contains(&self, channel: u16) -> bool {
        self.handlers.contains_key(&channel)
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Hands `frame` to the handler of its channel.
    ///
    /// Heartbeats are dropped without looking up a handler.
    pub fn dispatch(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        if let FrameBody::Heartbeat = frame.body {
            return Ok(());
        }

        match self.handlers.get_mut(&frame.channel) {
            Some(handler) => handler.handle(frame),
            None => Err(ProtocolError::UnknownChannel(frame.channel)),
        }
    }

    /// Hands a copy of `frame` to every registered handler.
    ///
    /// Every handler gets the frame even if an earlier one fails. The first
    /// error is returned.
    pub fn dispatch_all(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        let mut result = Ok(());
        for handler in self.handlers.values_mut() {
            if let Err(err) = handler.handle(frame.clone()) {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::{
        error::ConnectionError,
        frames::{Method, MethodType},
    };

    fn recorder(log: &Arc<Mutex<Vec<(u16, Option<MethodType>)>>>, id: u16) -> impl FrameHandler {
        let log = log.clone();
        move |frame: Frame| -> Result<(), ProtocolError> {
            log.lock().push((id, frame.method_type()));
            Ok(())
        }
    }

    #[test]
    fn heartbeat_is_dropped_without_handlers() {
        let mut dispatcher = Dispatcher::new();
        assert!(dispatcher.dispatch(Frame::heartbeat()).is_ok());
    }

    #[test]
    fn heartbeat_does_not_reach_handlers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_handler(0, recorder(&log, 0));

        dispatcher.dispatch(Frame::heartbeat()).unwrap();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn unknown_channel_is_a_protocol_error() {
        let mut dispatcher = Dispatcher::new();
        let result = dispatcher.dispatch(Frame::method(5u16, Method::ChannelOpenOk));
        assert_eq!(result, Err(ProtocolError::UnknownChannel(5)));
    }

    #[test]
    fn frames_are_routed_by_channel() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_handler(1, recorder(&log, 1));
        dispatcher.add_handler(2, recorder(&log, 2));

        dispatcher.dispatch(Frame::method(2u16, Method::ChannelOpenOk)).unwrap();
        dispatcher.dispatch(Frame::method(1u16, Method::ChannelCloseOk)).unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                (2, Some(MethodType::ChannelOpenOk)),
                (1, Some(MethodType::ChannelCloseOk))
            ]
        );
    }

    #[test]
    fn add_overwrites_and_remove_unknown_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_handler(1, recorder(&log, 10));
        dispatcher.add_handler(1, recorder(&log, 11));
        assert_eq!(dispatcher.len(), 1);

        dispatcher.dispatch(Frame::method(1u16, Method::ChannelOpenOk)).unwrap();
        assert_eq!(*log.lock(), vec![(11, Some(MethodType::ChannelOpenOk))]);

        dispatcher.remove_handler(9);
        assert_eq!(dispatcher.len(), 1);
        dispatcher.remove_handler(1);
        assert!(dispatcher.is_empty());
        assert!(!dispatcher.contains(1));
    }

    #[test]
    fn dispatch_all_reaches_every_handler_and_reports_first_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_handler(1, recorder(&log, 1));
        dispatcher.add_handler(2, |_frame: Frame| -> Result<(), ProtocolError> {
            Err(ProtocolError::UnexpectedMethod {
                method: MethodType::ConnectionClose,
                channel: 2,
            })
        });
        dispatcher.add_handler(3, recorder(&log, 3));

        let result = dispatcher.dispatch_all(Frame::poison_pill(0u16, ConnectionError::TransportClosed));
        assert!(result.is_err());

        let mut seen: Vec<u16> = log.lock().iter().map(|(id, _)| *id).collect();
        seen.sort();
        assert_eq!(seen, vec![1, 3]);
    }
}
