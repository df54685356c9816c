//! Controls sent from the handles to the connection engine

use std::fmt::Display;

use tokio::sync::oneshot;

use crate::{
    channel::Channel,
    connection::AllocChannelError,
};

pub(crate) enum ConnectionControl {
    AllocateChannel {
        responder: oneshot::Sender<Result<Channel, AllocChannelError>>,
    },
}

impl Display for ConnectionControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionControl::AllocateChannel { .. } => write!(f, "AllocateChannel"),
        }
    }
}
