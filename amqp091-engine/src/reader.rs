//! In order, one at a time delivery of frames under a pull protocol
//!
//! The consumer calls [`QueuedReader::ready`] when it can take the next
//! frame; the producer calls [`QueuedReader::feed`] whenever a frame
//! arrives. Deliveries always go through the scheduler so that they happen
//! in a step of their own.

use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::{
    dispatcher::FrameHandler,
    error::ProtocolError,
    frames::Frame,
    scheduler::Schedule,
};

/// Buffers frames until the consumer asks for them
pub struct QueuedReader<H> {
    handler: Arc<Mutex<H>>,
    scheduler: Arc<dyn Schedule>,
    is_waiting: bool,
    pending_frames: VecDeque<Frame>,
}

impl<H> std::fmt::Debug for QueuedReader<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedReader")
            .field("is_waiting", &self.is_waiting)
            .field("pending_frames", &self.pending_frames.len())
            .finish()
    }
}

impl<H> QueuedReader<H>
where
    H: FrameHandler + 'static,
{
    /// Creates a reader delivering to `handler`
    pub fn new(handler: H, scheduler: Arc<dyn Schedule>) -> Self {
        Self::with_shared_handler(Arc::new(Mutex::new(handler)), scheduler)
    }

    /// Creates a reader delivering to a handler that is also used elsewhere
    pub fn with_shared_handler(handler: Arc<Mutex<H>>, scheduler: Arc<dyn Schedule>) -> Self {
        Self {
            handler,
            scheduler,
            is_waiting: false,
            pending_frames: VecDeque::new(),
        }
    }

    /// The handler frames are delivered to
    pub fn handler(&self) -> &Arc<Mutex<H>> {
        &self.handler
    }

    /// Whether a `ready()` is outstanding
    pub fn is_waiting(&self) -> bool {
        self.is_waiting
    }

    /// Number of buffered frames
    pub fn pending(&self) -> usize {
        self.pending_frames.len()
    }

    /// The consumer can take the next frame.
    ///
    /// # Panics
    ///
    /// Panics if called again before the previously requested frame has
    /// been delivered
    pub fn ready(&mut self) {
        assert!(
            !self.is_waiting,
            "ready() got called while waiting for a frame to be read"
        );
        match self.pending_frames.pop_front() {
            Some(frame) => self.deliver(frame),
            None => self.is_waiting = true,
        }
    }

    /// A new frame arrived
    pub fn feed(&mut self, frame: Frame) {
        if self.is_waiting {
            self.is_waiting = false;
            self.deliver(frame);
        } else {
            self.pending_frames.push_back(frame);
        }
    }

    fn deliver(&self, frame: Frame) {
        let handler = self.handler.clone();
        self.scheduler
            .call_soon(Box::new(move || handler.lock().handle(frame)));
    }
}

/// A [`QueuedReader`] shared between its producer and its consumer.
///
/// Registering it with the [`Dispatcher`](crate::dispatcher::Dispatcher)
/// makes dispatching a frame feed the reader.
pub struct SharedReader<H> {
    inner: Arc<Mutex<QueuedReader<H>>>,
}

impl<H> Clone for SharedReader<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H> std::fmt::Debug for SharedReader<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.inner.lock(), f)
    }
}

impl<H> SharedReader<H>
where
    H: FrameHandler + 'static,
{
    /// Wraps a reader
    pub fn new(reader: QueuedReader<H>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reader)),
        }
    }

    /// See [`QueuedReader::ready`]
    pub fn ready(&self) {
        self.inner.lock().ready()
    }

    /// See [`QueuedReader::feed`]
    pub fn feed(&self, frame: Frame) {
        self.inner.lock().feed(frame)
    }

    /// See [`QueuedReader::is_waiting`]
    pub fn is_waiting(&self) -> bool {
        self.inner.lock().is_waiting()
    }

    /// See [`QueuedReader::pending`]
    pub fn pending(&self) -> usize {
        self.inner.lock().pending()
    }
}

impl<H> FrameHandler for SharedReader<H>
where
    H: FrameHandler + 'static,
{
    fn handle(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        self.feed(frame);
        Ok(())
    }
}
