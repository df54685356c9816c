//! Matches asynchronous replies with the callers waiting for them
//!
//! A caller registers interest in one or more reply types *before* sending
//! its request and then awaits the returned [`Reply`]. Replies of the same
//! type are handed out in the order the waiters were registered.

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{ready, Context, Poll},
};

use parking_lot::Mutex;
use pin_project_lite::pin_project;
use slab::Slab;
use tokio::sync::oneshot;

use crate::{
    error::ConnectionError,
    frames::{Method, MethodType},
};

/// What a waiter is resolved with
pub type ReplyResult = Result<Option<Method>, ConnectionError>;

#[derive(Debug)]
struct Waiter {
    tx: oneshot::Sender<ReplyResult>,
    bound: Vec<MethodType>,
}

#[derive(Debug, Default)]
struct Inner {
    waiters: Slab<Waiter>,
    queues: HashMap<MethodType, VecDeque<usize>>,
    connection_error: Option<ConnectionError>,
    unexpected_replies: u64,
}

/// Correlates replies with waiters and fails all of them at once when the
/// connection dies.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct Synchroniser {
    inner: Arc<Mutex<Inner>>,
}

impl Synchroniser {
    /// Creates a synchroniser with no waiter
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter that is resolved by the first of `expected` to be
    /// notified.
    ///
    /// If a connection error is latched, the returned [`Reply`] is already
    /// resolved with it and nothing is registered.
    ///
    /// # Panics
    ///
    /// Panics if `expected` is empty
    pub fn wait_for(&self, expected: &[MethodType]) -> Reply {
        assert!(
            !expected.is_empty(),
            "wait_for requires at least one method type"
        );
        let (tx, rx) = oneshot::channel();

        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if let Some(error) = &inner.connection_error {
            let _ = tx.send(Err(error.clone()));
            return Reply::new(rx);
        }

        let mut bound: Vec<MethodType> = Vec::with_capacity(expected.len());
        for method_type in expected {
            if !bound.contains(method_type) {
                bound.push(*method_type);
            }
        }

        let key = inner.waiters.insert(Waiter {
            tx,
            bound: bound.clone(),
        });
        for method_type in bound {
            inner.queues.entry(method_type).or_default().push_back(key);
        }
        Reply::new(rx)
    }

    /// Resolves the oldest waiter registered under `method_type` with
    /// `result`.
    ///
    /// Returns `false` if nobody was waiting. This is logged as an error and
    /// counted, but it is not fatal.
    ///
    /// # Panics
    ///
    /// Panics if the waiter found was already resolved
    pub fn notify(&self, method_type: MethodType, result: Option<Method>) -> bool {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let key = match inner
            .queues
            .get_mut(&method_type)
            .and_then(VecDeque::pop_front)
        {
            Some(key) => key,
            None => {
                inner.unexpected_replies += 1;
                drop(guard);
                #[cfg(feature = "tracing")]
                tracing::error!("Got an unexpected method notification {}", method_type);
                #[cfg(feature = "log")]
                log::error!("Got an unexpected method notification {}", method_type);
                return false;
            }
        };

        let waiter = match inner.waiters.try_remove(key) {
            Some(waiter) => waiter,
            None => panic!("Waiter for {} is resolved twice", method_type),
        };

        // A waiter bound to several types must not be found again
        // under the other types
        for other in waiter.bound.iter().filter(|other| **other != method_type) {
            if let Some(queue) = inner.queues.get_mut(other) {
                queue.retain(|k| *k != key);
            }
        }
        drop(guard);

        // The caller may have stopped waiting, which is fine
        let _ = waiter.tx.send(Ok(result));
        true
    }

    /// Latches `error` and resolves every pending waiter with it.
    ///
    /// Every later [`wait_for`](Self::wait_for) fails immediately. If an
    /// error is already latched, that first error is kept.
    pub fn killall(&self, error: ConnectionError) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let error = inner.connection_error.get_or_insert(error).clone();
        inner.queues.clear();
        let waiters: Vec<Waiter> = inner.waiters.drain().collect();
        drop(guard);

        #[cfg(feature = "tracing")]
        tracing::debug!(pending = waiters.len(), %error, "failing all waiters");
        #[cfg(feature = "log")]
        log::debug!("failing {} waiters with {}", waiters.len(), error);

        for waiter in waiters {
            let _ = waiter.tx.send(Err(error.clone()));
        }
    }

    /// The latched connection error, if any
    pub fn connection_error(&self) -> Option<ConnectionError> {
        self.inner.lock().connection_error.clone()
    }

    /// Number of waiters not resolved yet
    pub fn pending(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    /// Number of waiters queued under `method_type`
    pub fn pending_for(&self, method_type: MethodType) -> usize {
        self.inner
            .lock()
            .queues
            .get(&method_type)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Number of notifications that found no waiter
    pub fn unexpected_replies(&self) -> u64 {
        self.inner.lock().unexpected_replies
    }
}

pin_project! {
    /// A pending reply registered with [`Synchroniser::wait_for`].
    ///
    /// Dropping it abandons the wait; resolving an abandoned reply later is
    /// a no-op.
    #[derive(Debug)]
    pub struct Reply {
        #[pin]
        rx: oneshot::Receiver<ReplyResult>,
    }
}

impl Reply {
    fn new(rx: oneshot::Receiver<ReplyResult>) -> Self {
        Self { rx }
    }
}

impl Future for Reply {
    type Output = ReplyResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match ready!(this.rx.poll(cx)) {
            Ok(result) => Poll::Ready(result),
            // The synchroniser is gone along with the engine
            Err(_) => Poll::Ready(Err(ConnectionError::EngineStopped)),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_pending, assert_ready, assert_ready_eq, task};

    use super::*;
    use crate::frames::{MessageCount, QueueDeclareOk};

    fn declare_ok(queue: &str) -> Method {
        Method::QueueDeclareOk(QueueDeclareOk {
            queue: queue.to_string(),
            message_count: 0,
            consumer_count: 0,
        })
    }

    #[test]
    fn replies_are_matched_in_fifo_order() {
        let sync = Synchroniser::new();
        let mut w1 = task::spawn(sync.wait_for(&[MethodType::QueueDeclareOk]));
        let mut w2 = task::spawn(sync.wait_for(&[MethodType::QueueDeclareOk]));
        let mut w3 = task::spawn(sync.wait_for(&[MethodType::QueueDeclareOk]));

        assert!(sync.notify(MethodType::QueueDeclareOk, Some(declare_ok("r1"))));
        assert_ready_eq!(w1.poll(), Ok(Some(declare_ok("r1"))));
        assert_pending!(w2.poll());

        assert!(sync.notify(MethodType::QueueDeclareOk, Some(declare_ok("r2"))));
        assert!(sync.notify(MethodType::QueueDeclareOk, Some(declare_ok("r3"))));
        assert_ready_eq!(w2.poll(), Ok(Some(declare_ok("r2"))));
        assert_ready_eq!(w3.poll(), Ok(Some(declare_ok("r3"))));
        assert_eq!(sync.pending(), 0);
    }

    #[test]
    fn multi_method_waiter_is_resolved_once() {
        let sync = Synchroniser::new();
        let mut get = task::spawn(sync.wait_for(&[MethodType::BasicGetOk, MethodType::BasicGetEmpty]));
        assert_eq!(sync.pending_for(MethodType::BasicGetOk), 1);
        assert_eq!(sync.pending_for(MethodType::BasicGetEmpty), 1);

        assert!(sync.notify(MethodType::BasicGetEmpty, Some(Method::BasicGetEmpty)));
        assert_ready_eq!(get.poll(), Ok(Some(Method::BasicGetEmpty)));

        // The other queue no longer holds the waiter
        assert_eq!(sync.pending_for(MethodType::BasicGetOk), 0);
        assert!(!sync.notify(MethodType::BasicGetOk, None));
        assert_eq!(sync.unexpected_replies(), 1);
    }

    #[test]
    fn multi_method_waiter_does_not_block_later_waiters() {
        let sync = Synchroniser::new();
        let mut both = task::spawn(sync.wait_for(&[MethodType::BasicGetOk, MethodType::BasicGetEmpty]));
        let mut ok_only = task::spawn(sync.wait_for(&[MethodType::BasicGetOk]));

        assert!(sync.notify(MethodType::BasicGetEmpty, None));
        assert_ready_eq!(both.poll(), Ok(None));

        assert!(sync.notify(MethodType::BasicGetOk, None));
        assert_ready_eq!(ok_only.poll(), Ok(None));
    }

    #[test]
    fn duplicated_method_types_are_registered_once() {
        let sync = Synchroniser::new();
        let _reply = sync.wait_for(&[MethodType::QueueBindOk, MethodType::QueueBindOk]);
        assert_eq!(sync.pending_for(MethodType::QueueBindOk), 1);
    }

    #[test]
    fn killall_fails_every_waiter_and_latches() {
        let sync = Synchroniser::new();
        let mut a = task::spawn(sync.wait_for(&[MethodType::QueueDeclareOk]));
        let mut b = task::spawn(sync.wait_for(&[MethodType::QueuePurgeOk]));
        let mut c = task::spawn(sync.wait_for(&[MethodType::BasicQosOk]));

        sync.killall(ConnectionError::TransportClosed);
        assert_ready_eq!(a.poll(), Err(ConnectionError::TransportClosed));
        assert_ready_eq!(b.poll(), Err(ConnectionError::TransportClosed));
        assert_ready_eq!(c.poll(), Err(ConnectionError::TransportClosed));
        assert_eq!(sync.pending(), 0);

        // Queues are cleared, a late reply is only logged
        assert!(!sync.notify(
            MethodType::QueuePurgeOk,
            Some(Method::QueuePurgeOk(MessageCount { message_count: 1 }))
        ));
        assert_eq!(sync.unexpected_replies(), 1);
    }

    #[test]
    fn wait_for_after_killall_fails_fast() {
        let sync = Synchroniser::new();
        sync.killall(ConnectionError::LocalClosed);

        let mut reply = task::spawn(sync.wait_for(&[MethodType::ChannelOpenOk]));
        assert_ready_eq!(reply.poll(), Err(ConnectionError::LocalClosed));
        assert_eq!(sync.pending(), 0);
        assert_eq!(sync.pending_for(MethodType::ChannelOpenOk), 0);
    }

    #[test]
    fn first_latched_error_is_kept() {
        let sync = Synchroniser::new();
        sync.killall(ConnectionError::LocalClosed);
        sync.killall(ConnectionError::TransportClosed);
        assert_eq!(sync.connection_error(), Some(ConnectionError::LocalClosed));
    }

    #[test]
    fn abandoned_reply_is_resolved_silently() {
        let sync = Synchroniser::new();
        let reply = sync.wait_for(&[MethodType::ExchangeDeclareOk]);
        drop(reply);

        assert!(sync.notify(MethodType::ExchangeDeclareOk, None));
        assert_eq!(sync.pending(), 0);
        assert_eq!(sync.unexpected_replies(), 0);

        let reply = sync.wait_for(&[MethodType::ExchangeDeclareOk]);
        drop(reply);
        sync.killall(ConnectionError::TransportClosed);
    }

    #[test]
    fn notify_without_waiter_does_not_raise() {
        let sync = Synchroniser::new();
        assert!(!sync.notify(MethodType::ChannelOpenOk, None));
        assert_eq!(sync.unexpected_replies(), 1);
    }

    #[test]
    #[should_panic(expected = "resolved twice")]
    fn resolving_a_stale_entry_panics() {
        let sync = Synchroniser::new();
        let _reply = sync.wait_for(&[MethodType::QueueBindOk]);
        {
            // Corrupt the queue so that the same waiter is found twice
            let mut inner = sync.inner.lock();
            let queue = inner.queues.get_mut(&MethodType::QueueBindOk).unwrap();
            let key = queue[0];
            queue.push_back(key);
        }
        assert!(sync.notify(MethodType::QueueBindOk, None));
        sync.notify(MethodType::QueueBindOk, None);
    }

    #[test]
    #[should_panic(expected = "at least one method type")]
    fn wait_for_nothing_panics() {
        let sync = Synchroniser::new();
        let _ = sync.wait_for(&[]);
    }

    #[test]
    fn dropped_synchroniser_fails_reply() {
        let sync = Synchroniser::new();
        let mut reply = task::spawn(sync.wait_for(&[MethodType::BasicCancelOk]));
        drop(sync);
        let result = assert_ready!(reply.poll());
        assert_eq!(result, Err(ConnectionError::EngineStopped));
    }
}
