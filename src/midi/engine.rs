use thiserror::Error;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("MIDI unavailable: {0}")]
    Init(String),
    #[error("no MIDI output named '{0}'")]
    UnknownDevice(String),
    #[error("MIDI connection error: {0}")]
    Connection(String),
    #[error("MIDI send error: {0}")]
    Send(String),
    #[error("no MIDI output selected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, MidiError>;

/// Channels are 1-based (1..=16), the way device manuals number them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    Start,
    Stop,
}

impl MidiMessage {
    pub fn to_bytes(self) -> Vec<u8> {
        let status = |kind: u8, channel: u8| kind | (channel.saturating_sub(1) & 0x0F);
        match self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![status(0x90, channel), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOff { channel, note } => vec![status(0x80, channel), note & 0x7F, 0],
            MidiMessage::Start => vec![0xFA],
            MidiMessage::Stop => vec![0xFC],
        }
    }

    pub fn parse(data: &[u8]) -> Option<MidiMessage> {
        let &first = data.first()?;
        let channel = (first & 0x0F) + 1;
        match first & 0xF0 {
            // note-on with velocity 0 is a note-off by convention
            0x90 if data.len() >= 3 && data[2] == 0 => Some(MidiMessage::NoteOff { channel, note: data[1] }),
            0x90 if data.len() >= 3 => Some(MidiMessage::NoteOn { channel, note: data[1], velocity: data[2] }),
            0x80 if data.len() >= 3 => Some(MidiMessage::NoteOff { channel, note: data[1] }),
            0xF0 => match first {
                0xFA => Some(MidiMessage::Start),
                0xFC => Some(MidiMessage::Stop),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Start/Stop received from any MIDI input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportSignal {
    Start,
    Stop,
}

impl TransportSignal {
    pub fn from_message(msg: MidiMessage) -> Option<Self> {
        match msg {
            MidiMessage::Start => Some(TransportSignal::Start),
            MidiMessage::Stop => Some(TransportSignal::Stop),
            _ => None,
        }
    }
}

/// Output side of a MIDI backend. Outputs are identified by port name.
pub trait MidiEngine: Send {
    fn list_outputs(&self) -> Vec<String>;

    fn connect_output(&mut self, name: &str) -> Result<()>;

    fn disconnect_output(&mut self);

    fn connected_output(&self) -> Option<&str>;

    fn send(&mut self, msg: MidiMessage) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_go_on_the_wire_zero_based() {
        let on = MidiMessage::NoteOn { channel: 10, note: 37, velocity: 100 };
        assert_eq!(on.to_bytes(), vec![0x99, 37, 100]);
        let off = MidiMessage::NoteOff { channel: 9, note: 36 };
        assert_eq!(off.to_bytes(), vec![0x88, 36, 0]);
    }

    #[test]
    fn realtime_messages_parse() {
        assert_eq!(MidiMessage::parse(&[0xFA]), Some(MidiMessage::Start));
        assert_eq!(MidiMessage::parse(&[0xFC]), Some(MidiMessage::Stop));
        assert_eq!(MidiMessage::parse(&[0xF8]), None);
        assert_eq!(MidiMessage::parse(&[]), None);
    }

    #[test]
    fn parse_reads_back_channel_messages() {
        assert_eq!(
            MidiMessage::parse(&[0x9B, 39, 64]),
            Some(MidiMessage::NoteOn { channel: 12, note: 39, velocity: 64 })
        );
        assert_eq!(MidiMessage::parse(&[0x90, 36, 0]), Some(MidiMessage::NoteOff { channel: 1, note: 36 }));
        assert_eq!(MidiMessage::parse(&[0x90, 36]), None);
    }

    #[test]
    fn only_start_and_stop_drive_the_transport() {
        assert_eq!(TransportSignal::from_message(MidiMessage::Start), Some(TransportSignal::Start));
        assert_eq!(
            TransportSignal::from_message(MidiMessage::NoteOff { channel: 1, note: 1 }),
            None
        );
    }
}
