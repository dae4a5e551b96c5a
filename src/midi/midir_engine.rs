use crossbeam_channel::Sender;
use log::{info, warn};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

use super::engine::{MidiEngine, MidiError, MidiMessage, Result, TransportSignal};

const CLIENT_NAME: &str = "circuit-tracks";

pub struct MidirEngine {
    output: Option<(String, MidiOutputConnection)>,
}

impl MidirEngine {
    /// Fails when the platform MIDI subsystem can't be opened at all.
    pub fn new() -> Result<Self> {
        MidiOutput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
        Ok(MidirEngine { output: None })
    }
}

impl MidiEngine for MidirEngine {
    fn list_outputs(&self) -> Vec<String> {
        let Ok(midi_out) = MidiOutput::new(CLIENT_NAME) else {
            return vec![];
        };
        midi_out
            .ports()
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect()
    }

    fn connect_output(&mut self, name: &str) -> Result<()> {
        self.disconnect_output();

        let midi_out = MidiOutput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
        let ports = midi_out.ports();
        let port = ports
            .iter()
            .find(|p| midi_out.port_name(p).is_ok_and(|n| n == name))
            .ok_or_else(|| MidiError::UnknownDevice(name.to_string()))?;

        let connection = midi_out
            .connect(port, "circuit-tracks-out")
            .map_err(|e| MidiError::Connection(e.to_string()))?;
        info!("connected to MIDI output '{}'", name);
        self.output = Some((name.to_string(), connection));
        Ok(())
    }

    fn disconnect_output(&mut self) {
        if let Some((name, connection)) = self.output.take() {
            connection.close();
            info!("disconnected MIDI output '{}'", name);
        }
    }

    fn connected_output(&self) -> Option<&str> {
        self.output.as_ref().map(|(name, _)| name.as_str())
    }

    fn send(&mut self, msg: MidiMessage) -> Result<()> {
        let (_, connection) = self.output.as_mut().ok_or(MidiError::NotConnected)?;
        connection
            .send(&msg.to_bytes())
            .map_err(|e| MidiError::Send(e.to_string()))
    }
}

/// Opens every MIDI input and forwards Start/Stop over `tx`. The returned
/// connections must be kept alive for as long as listening should go on.
pub fn listen_for_transport(tx: Sender<TransportSignal>) -> Result<Vec<MidiInputConnection<()>>> {
    let scan = MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
    let port_count = scan.ports().len();
    drop(scan);

    let mut connections = Vec::with_capacity(port_count);
    for index in 0..port_count {
        // connecting consumes the client, so each port gets its own
        let mut midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
        midi_in.ignore(Ignore::None);
        let ports = midi_in.ports();
        let Some(port) = ports.get(index) else { continue };
        let name = midi_in.port_name(port).unwrap_or_else(|_| format!("input {index}"));

        let tx = tx.clone();
        match midi_in.connect(
            port,
            "circuit-tracks-in",
            move |_stamp, data, _| {
                if let Some(signal) = MidiMessage::parse(data).and_then(TransportSignal::from_message) {
                    let _ = tx.send(signal);
                }
            },
            (),
        ) {
            Ok(connection) => {
                info!("listening for start/stop on '{}'", name);
                connections.push(connection);
            }
            Err(e) => warn!("could not open MIDI input '{}': {}", name, e),
        }
    }
    Ok(connections)
}
