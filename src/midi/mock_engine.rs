use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::engine::{MidiEngine, MidiError, MidiMessage, Result};

/// Records every message it is asked to send. Clones of `sent` and `failing`
/// stay with the test after the engine is boxed into a bridge.
#[derive(Clone, Debug, Default)]
pub struct MockMidiEngine {
    outputs: Vec<String>,
    connected: Option<String>,
    pub sent: Arc<Mutex<Vec<MidiMessage>>>,
    pub failing: Arc<AtomicBool>,
    listed: Arc<AtomicUsize>,
}

impl MockMidiEngine {
    pub fn new(outputs: &[&str]) -> Self {
        Self {
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn sent_messages(&self) -> Vec<MidiMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// How many times the ports were enumerated.
    pub fn list_count(&self) -> usize {
        self.listed.load(Ordering::SeqCst)
    }
}

impl MidiEngine for MockMidiEngine {
    fn list_outputs(&self) -> Vec<String> {
        self.listed.fetch_add(1, Ordering::SeqCst);
        self.outputs.clone()
    }

    fn connect_output(&mut self, name: &str) -> Result<()> {
        if !self.outputs.iter().any(|o| o == name) {
            return Err(MidiError::UnknownDevice(name.to_string()));
        }
        self.connected = Some(name.to_string());
        Ok(())
    }

    fn disconnect_output(&mut self) {
        self.connected = None;
    }

    fn connected_output(&self) -> Option<&str> {
        self.connected.as_deref()
    }

    fn send(&mut self, msg: MidiMessage) -> Result<()> {
        if self.connected.is_none() {
            return Err(MidiError::NotConnected);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(MidiError::Send("mock send failure".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(msg);
        }
        Ok(())
    }
}
