use std::sync::{mpsc, Mutex};

use crate::PlonkEvent;

/// Receives events as operations run.
///
/// Operations emit through a sink handle without knowing who is
/// listening: the CLI feeds a progress renderer, tests capture the
/// stream for assertions, and headless callers drop everything.
/// Emitting must never block or fail an operation.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PlonkEvent);
}

/// Forwards events into an mpsc channel.
///
/// When the receiving end has hung up (the renderer already exited),
/// events are silently discarded rather than surfacing an error into
/// the operation that emitted them.
pub struct ChannelSink {
    sender: mpsc::Sender<PlonkEvent>,
}

impl ChannelSink {
    /// Builds the sink together with its receiving end.
    pub fn new() -> (Self, mpsc::Receiver<PlonkEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: PlonkEvent) {
        let _ = self.sender.send(event);
    }
}

/// Discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: PlonkEvent) {}
}

/// Buffers every event so a test can assert on what was emitted, and
/// in what order.
#[derive(Default)]
pub struct CollectorSink {
    events: Mutex<Vec<PlonkEvent>>,
}

impl CollectorSink {
    /// Snapshot of everything emitted so far.
    pub fn events(&self) -> Vec<PlonkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: PlonkEvent) {
        self.events.lock().unwrap().push(event);
    }
}
