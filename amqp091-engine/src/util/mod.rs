//! Common utilities

mod latch;
pub use latch::*;

#[derive(Debug)]
pub(crate) enum Running {
    Continue,
    Stop,
}
