use crate::chord_engine::OutputSink;
use crate::types::{KeyId, OutputEvent};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Collects emitted keystrokes into a buffer shared between clones.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<OutputEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().clone()
    }

    /// Drains the buffer.
    pub fn take(&self) -> Vec<OutputEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Keys of the press halves, in emission order.
    pub fn pressed_keys(&self) -> Vec<KeyId> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.pressed)
            .map(|e| e.key)
            .collect()
    }
}

impl OutputSink for RecordingSink {
    fn emit(&mut self, key: KeyId, pressed: bool, timestamp: i64) {
        self.events.lock().push(OutputEvent {
            key,
            pressed,
            timestamp,
        });
    }
}

/// Forwards keystrokes to an injector thread.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<OutputEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<OutputEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, Receiver<OutputEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl OutputSink for ChannelSink {
    fn emit(&mut self, key: KeyId, pressed: bool, timestamp: i64) {
        let event = OutputEvent {
            key,
            pressed,
            timestamp,
        };
        if self.tx.send(event).is_err() {
            debug!("Output receiver gone, dropping {:?}", event);
        }
    }
}
