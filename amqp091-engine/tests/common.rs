//! In-memory transport used to play the broker side of a connection

use std::time::Duration;

use amqp091_engine::{
    frames::{Frame, Method},
    sender::OutgoingMethod,
    Builder, ConnectionHandle,
};
use tokio::sync::mpsc;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Peer {
    pub frames: mpsc::Sender<Frame>,
    pub methods: mpsc::UnboundedReceiver<OutgoingMethod>,
}

#[allow(dead_code)]
impl Peer {
    /// Next method the engine handed to the transport
    pub async fn expect(&mut self) -> OutgoingMethod {
        tokio::time::timeout(RECV_TIMEOUT, self.methods.recv())
            .await
            .expect("timed out waiting for an outgoing method")
            .expect("engine dropped the outgoing channel")
    }

    pub async fn reply(&self, channel: u16, method: Method) {
        self.frames
            .send(Frame::method(channel, method))
            .await
            .expect("engine dropped the incoming channel")
    }

    pub async fn send(&self, frame: Frame) {
        self.frames
            .send(frame)
            .await
            .expect("engine dropped the incoming channel")
    }
}

pub fn connect(builder: Builder) -> (ConnectionHandle, Peer) {
    let (frames, incoming) = mpsc::channel(16);
    let (outgoing, methods) = mpsc::unbounded_channel();
    let handle = builder.spawn(incoming, outgoing);
    (handle, Peer { frames, methods })
}
