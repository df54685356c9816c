//! Implements the AMQP 0.9.1 connection: the engine event loop and the
//! handle used to drive it

use std::sync::Arc;

use tokio::{
    sync::{mpsc::Sender, oneshot},
    task::JoinHandle,
};

use crate::{
    channel::Channel,
    control::ConnectionControl,
    error::ConnectionError,
    frames::{Method, MethodType},
    scheduler::{RunQueue, Schedule},
    sender::MethodSender,
    synchroniser::Synchroniser,
    util::Latch,
};

mod actor;
pub use actor::*;

mod builder;
pub use builder::*;

pub(crate) mod engine;

mod error;
pub use error::*;

/// Default channel-max
pub const DEFAULT_CHANNEL_MAX: u16 = 2047;

/// A handle to the connection event loop.
///
/// Dropping the handle stops the event loop and every channel still
/// waiting on a reply fails with [`ConnectionError::EngineStopped`]
#[derive(Debug)]
pub struct ConnectionHandle {
    pub(crate) control: Sender<ConnectionControl>,
    pub(crate) handle: JoinHandle<Result<(), ConnectionError>>,

    pub(crate) sender: MethodSender,
    pub(crate) synchroniser: Synchroniser,
    pub(crate) closing: Latch,
    pub(crate) run_queue: RunQueue,
}

impl ConnectionHandle {
    /// Checks if the underlying event loop has stopped
    pub fn is_closed(&self) -> bool {
        self.control.is_closed()
    }

    /// Synchroniser matching the replies received on channel 0
    pub fn synchroniser(&self) -> &Synchroniser {
        &self.synchroniser
    }

    /// Scheduler whose jobs are run by the event loop, one per step
    pub fn scheduler(&self) -> Arc<dyn Schedule> {
        Arc::new(self.run_queue.clone())
    }

    /// Sends a connection method and waits for one of the `expected`
    /// replies
    pub async fn request(
        &self,
        method: Method,
        expected: &[MethodType],
    ) -> Result<Option<Method>, Error> {
        if self.closing.is_set() {
            return Err(Error::Connection(ConnectionError::LocalClosed));
        }
        let reply = self.synchroniser.wait_for(expected);
        self.sender.send(method)?;
        Ok(reply.await?)
    }

    /// Allocates a channel number and registers the channel with the
    /// engine. The channel is not opened.
    pub async fn allocate_channel(&self) -> Result<Channel, AllocChannelError> {
        let (responder, resp_rx) = oneshot::channel();
        self.control
            .send(ConnectionControl::AllocateChannel { responder })
            .await?;
        // The sending half is dropped if the event loop stopped
        resp_rx
            .await
            .map_err(|_| AllocChannelError::IllegalState)?
    }

    /// Allocates a channel and performs the open handshake
    pub async fn open_channel(&self) -> Result<Channel, OpenChannelError> {
        let channel = self.allocate_channel().await?;
        channel.open().await?;
        Ok(channel)
    }

    /// Close the connection
    ///
    /// Sends `connection.close`, waits for `connection.close-ok` and then
    /// for the event loop to stop.
    ///
    /// # Panics
    ///
    /// Panics if this is called after executing any of [`close`](#method.close)
    /// or [`on_close`](#method.on_close).
    /// This will cause the JoinHandle to be polled after completion, which causes a panic.
    pub async fn close(&mut self) -> Result<(), Error> {
        if self.closing.try_set() {
            let reply = self.synchroniser.wait_for(&[MethodType::ConnectionCloseOk]);
            // If sending is unsuccessful, the event loop is stopping and the
            // reply is failed by the poison pill
            let _ = self.sender.send(Method::connection_close_by_application());
            let _ = reply.await;
        }
        self.on_close().await
    }

    /// Returns when the underlying event loop has stopped
    ///
    /// # Panics
    ///
    /// Panics if this is called after executing any of [`close`](#method.close)
    /// or [`on_close`](#method.on_close).
    /// This will cause the JoinHandle to be polled after completion, which causes a panic.
    pub async fn on_close(&mut self) -> Result<(), Error> {
        match (&mut self.handle).await {
            Ok(res) => res.map_err(Into::into),
            Err(e) => Err(Error::JoinError(e)),
        }
    }
}
