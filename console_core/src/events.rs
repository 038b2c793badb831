use std::net::SocketAddr;

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Lifecycle notification surfaced to the embedding application for
/// logging and metrics. Notifications only; never part of the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected { peer: SocketAddr },
    Authenticated { peer: SocketAddr, name: String },
    Disconnected { peer: SocketAddr },
}

/// Sending half handed to connection handlers. The channel is unbounded and
/// send errors are ignored, so a slow or absent observer never blocks
/// protocol processing.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Sender<ConnectionEvent>,
}

impl EventSink {
    pub fn emit(&self, event: ConnectionEvent) {
        let _ = self.sender.send(event);
    }
}

pub fn event_channel() -> (EventSink, Receiver<ConnectionEvent>) {
    let (sender, receiver) = unbounded();
    (EventSink { sender }, receiver)
}
