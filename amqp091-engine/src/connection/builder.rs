//! Connection builder

use tokio::sync::mpsc::{self, Receiver, UnboundedSender};

use crate::{
    frames::Frame,
    scheduler::RunQueue,
    sender::{MethodSender, OutgoingMethod},
    synchroniser::Synchroniser,
};

use super::{engine::ConnectionEngine, ConnectionActor, ConnectionHandle, DEFAULT_CHANNEL_MAX};

pub(crate) const DEFAULT_CONTROL_CHAN_BUF: usize = 128;

/// Connection builder
#[derive(Debug, Clone)]
pub struct Builder {
    /// Highest channel number that can be allocated. Zero means no limit
    /// other than the protocol's.
    pub channel_max: u16,

    /// Capacity of the control channel between the handle and the engine
    pub control_buffer_size: usize,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a builder with the default configuration
    pub fn new() -> Self {
        Self {
            channel_max: DEFAULT_CHANNEL_MAX,
            control_buffer_size: DEFAULT_CONTROL_CHAN_BUF,
        }
    }

    /// Highest channel number that can be allocated
    pub fn channel_max(mut self, channel_max: u16) -> Self {
        self.channel_max = channel_max;
        self
    }

    /// Capacity of the control channel
    pub fn control_buffer_size(mut self, size: usize) -> Self {
        self.control_buffer_size = size;
        self
    }

    /// Spawns the engine on the current tokio runtime.
    ///
    /// Decoded frames are read from `incoming`, methods to encode are
    /// written to `outgoing`. The engine stops with
    /// [`ConnectionError::TransportClosed`](crate::error::ConnectionError::TransportClosed)
    /// when `incoming` ends.
    pub fn spawn(
        self,
        incoming: Receiver<Frame>,
        outgoing: UnboundedSender<OutgoingMethod>,
    ) -> ConnectionHandle {
        let channel_max = match self.channel_max {
            0 => u16::MAX,
            max => max,
        };
        // A zero sized buffer makes `mpsc::channel` panic
        let (control_tx, control_rx) = mpsc::channel(self.control_buffer_size.max(1));

        let sender = MethodSender::connection(outgoing.clone());
        let synchroniser = Synchroniser::new();
        let actor = ConnectionActor::new(sender.clone(), synchroniser.clone());
        let closing = actor.closing.clone();
        let run_queue = RunQueue::new();

        let engine = ConnectionEngine::new(
            actor,
            run_queue.clone(),
            incoming,
            control_rx,
            outgoing,
            channel_max,
        );
        let handle = engine.spawn();

        ConnectionHandle {
            control: control_tx,
            handle,
            sender,
            synchroniser,
            closing,
            run_queue,
        }
    }
}
