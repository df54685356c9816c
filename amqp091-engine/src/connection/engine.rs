//! The engine owns the dispatcher and the run queue and drives both from a
//! single event loop

use slab::Slab;
use tokio::{
    sync::mpsc::{Receiver, UnboundedSender},
    task::JoinHandle,
};

use crate::{
    channel::Channel,
    control::ConnectionControl,
    dispatcher::Dispatcher,
    error::ConnectionError,
    frames::{Frame, FrameBody, Method, CONNECTION_CHANNEL},
    scheduler::RunQueue,
    sender::{MethodSender, OutgoingMethod},
    util::{Latch, LatchView, Running},
};

use super::{actor::ConnectionActor, AllocChannelError};

pub(crate) struct ConnectionEngine {
    dispatcher: Dispatcher,
    run_queue: RunQueue,
    incoming: Receiver<Frame>,
    control: Receiver<ConnectionControl>,
    outgoing: UnboundedSender<OutgoingMethod>,

    // key + 1 is the channel number
    channels: Slab<LatchView>,
    channel_max: u16,

    closing: Latch,
    closed: LatchView,
}

impl ConnectionEngine {
    pub(crate) fn new(
        actor: ConnectionActor,
        run_queue: RunQueue,
        incoming: Receiver<Frame>,
        control: Receiver<ConnectionControl>,
        outgoing: UnboundedSender<OutgoingMethod>,
        channel_max: u16,
    ) -> Self {
        let closing = actor.closing.clone();
        let closed = actor.closed.view();
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_handler(CONNECTION_CHANNEL, actor);

        Self {
            dispatcher,
            run_queue,
            incoming,
            control,
            outgoing,
            channels: Slab::new(),
            channel_max,
            closing,
            closed,
        }
    }

    pub fn spawn(self) -> JoinHandle<Result<(), ConnectionError>> {
        tokio::spawn(self.event_loop())
    }

    fn allocate_channel(&mut self) -> Result<Channel, AllocChannelError> {
        if self.closing.is_set() {
            return Err(AllocChannelError::IllegalState);
        }

        let key = self.channels.vacant_key();
        if key >= self.channel_max as usize {
            return Err(AllocChannelError::ChannelMaxReached);
        }
        let id = (key + 1) as u16;
        let sender = MethodSender::new(id, self.outgoing.clone());
        let channel = Channel::new(id, sender, &mut self.dispatcher);
        self.channels.insert(channel.closed());
        Ok(channel)
    }

    /// Unregisters a channel once its close handshake is done so that its
    /// number can be reused
    fn release_if_closed(&mut self, channel: u16) {
        if channel == CONNECTION_CHANNEL {
            return;
        }
        let key = channel as usize - 1;
        let closed = match self.channels.get(key) {
            Some(closed) => closed.is_set(),
            None => false,
        };
        if closed {
            self.channels.remove(key);
            self.dispatcher.remove_handler(channel);
        }
    }

    fn on_incoming(&mut self, frame: Frame) -> Result<Running, ConnectionError> {
        let channel = frame.channel;

        match &frame.body {
            FrameBody::Method(Method::ConnectionClose(close)) if channel == CONNECTION_CHANNEL => {
                // Every channel observes the close. The connection actor
                // replies with close-ok.
                let close = close.clone();
                self.dispatcher.dispatch_all(frame)?;
                return Err(ConnectionError::RemoteClosed(close));
            }
            FrameBody::Method(Method::ConnectionCloseOk) if channel == CONNECTION_CHANNEL => {
                self.dispatcher.dispatch_all(frame)?;
            }
            _ => {
                self.dispatcher.dispatch(frame)?;
                self.release_if_closed(channel);
            }
        }

        match self.closed.is_set() {
            true => Ok(Running::Stop),
            false => Ok(Running::Continue),
        }
    }

    #[inline]
    fn on_control(&mut self, control: ConnectionControl) -> Result<Running, ConnectionError> {
        #[cfg(feature = "tracing")]
        tracing::trace!(%control);
        #[cfg(feature = "log")]
        log::trace!("control {}", control);

        match control {
            ConnectionControl::AllocateChannel { responder } => {
                let result = self.allocate_channel();
                // The caller stopped waiting, drop the allocated channel
                if let Err(Ok(channel)) = responder.send(result) {
                    self.dispatcher.remove_handler(channel.id());
                    self.channels.remove(channel.id() as usize - 1);
                }
            }
        }
        Ok(Running::Continue)
    }

    /// Fans the error out to every handler, and thus to every waiter
    fn fail(&mut self, error: ConnectionError) {
        #[cfg(feature = "tracing")]
        tracing::error!(%error, "stopping connection engine");
        #[cfg(feature = "log")]
        log::error!("stopping connection engine: {}", error);

        // Poison pills are never rejected by the actors
        let _ = self
            .dispatcher
            .dispatch_all(Frame::poison_pill(CONNECTION_CHANNEL, error));
    }

    async fn event_loop(mut self) -> Result<(), ConnectionError> {
        let outcome = loop {
            let result = tokio::select! {
                incoming = self.incoming.recv() => match incoming {
                    Some(frame) => self.on_incoming(frame),
                    None => Err(ConnectionError::TransportClosed),
                },
                control = self.control.recv() => match control {
                    Some(control) => self.on_control(control),
                    // Every handle is dropped
                    None => Ok(Running::Stop),
                },
                job = self.run_queue.next_job() => match job() {
                    Ok(()) => Ok(Running::Continue),
                    Err(error) => Err(error.into()),
                },
            };

            match result {
                Ok(Running::Continue) => {}
                Ok(Running::Stop) => break Ok(()),
                Err(error) => break Err(error),
            }
        };

        match &outcome {
            Ok(()) if self.closed.is_set() => {}
            Ok(()) => self.fail(ConnectionError::EngineStopped),
            Err(error) => self.fail(error.clone()),
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("ConnectionEngine exiting event_loop");
        #[cfg(feature = "log")]
        log::debug!("ConnectionEngine exiting event_loop");

        outcome
    }
}
