//! Frames as they are handed to the engine by the transport

mod method;
pub use method::*;

use crate::error::ConnectionError;

/// Channel number reserved for connection-global frames
pub const CONNECTION_CHANNEL: u16 = 0;

/// An inbound frame that has already been decoded
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame channel
    pub channel: u16,

    /// Frame body
    pub body: FrameBody,
}

impl Frame {
    /// Creates a new frame
    pub fn new(channel: impl Into<u16>, body: FrameBody) -> Self {
        Self {
            channel: channel.into(),
            body,
        }
    }

    /// Creates a method frame
    pub fn method(channel: impl Into<u16>, method: impl Into<Method>) -> Self {
        Self::new(channel, FrameBody::Method(method.into()))
    }

    /// Creates a heartbeat frame. Heartbeats always travel on channel 0
    pub fn heartbeat() -> Self {
        Self {
            channel: CONNECTION_CHANNEL,
            body: FrameBody::Heartbeat,
        }
    }

    /// Creates a frame that carries a fatal error into the handlers
    pub fn poison_pill(channel: impl Into<u16>, error: impl Into<ConnectionError>) -> Self {
        Self::new(channel, FrameBody::PoisonPill(error.into()))
    }

    /// Get the channel of the frame
    pub fn channel(&self) -> u16 {
        self.channel
    }

    /// Get the body of the frame
    pub fn body(&self) -> &FrameBody {
        &self.body
    }

    /// Consume the frame to get the frame body
    pub fn into_body(self) -> FrameBody {
        self.body
    }

    /// Returns the method type if this is a method frame
    pub fn method_type(&self) -> Option<MethodType> {
        match &self.body {
            FrameBody::Method(method) => Some(method.method_type()),
            _ => None,
        }
    }
}

/// Frame body
#[derive(Debug, Clone)]
pub enum FrameBody {
    /// A decoded method
    Method(Method),

    /// Heartbeat. Only resets the idle timer tracked by the transport
    Heartbeat,

    /// Not a wire frame. Carries a fatal error to every handler so that
    /// failure fan-out goes through the normal dispatch path
    PoisonPill(ConnectionError),
}

impl From<Method> for FrameBody {
    fn from(method: Method) -> Self {
        Self::Method(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_frame_reports_its_type() {
        let frame = Frame::method(3u16, Method::ChannelOpenOk);
        assert_eq!(frame.channel(), 3);
        assert_eq!(frame.method_type(), Some(MethodType::ChannelOpenOk));

        assert_eq!(Frame::heartbeat().method_type(), None);
        assert_eq!(Frame::heartbeat().channel(), CONNECTION_CHANNEL);
    }
}
