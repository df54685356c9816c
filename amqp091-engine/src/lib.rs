#![warn(missing_docs, missing_debug_implementations)]

//! A client side protocol engine for AMQP 0.9.1.
//!
//! The engine is fed decoded frames and hands methods to encode back to
//! the transport. It multiplexes channels over the connection, matches
//! replies with the requests waiting for them and tears every channel down
//! when the connection fails.

pub mod actor;
pub mod channel;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod frames;
pub mod reader;
pub mod scheduler;
pub mod sender;
pub mod synchroniser;
pub mod util;

pub(crate) mod control;

pub use channel::Channel;
pub use connection::{Builder, ConnectionHandle};
pub use dispatcher::Dispatcher;
pub use reader::QueuedReader;
pub use synchroniser::Synchroniser;
