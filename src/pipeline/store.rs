// Main-thread mirror of the buffers registered with the audio engine. The
// engine only knows ids; we keep the Arc so a bank slot can be copied onto a
// track under a fresh id without decoding the file again.

use std::collections::HashMap;
use std::sync::Arc;

use crate::audio::{next_sample_id, SampleBuffer, SampleId};
use crate::audio_api::AudioCommand;

#[derive(Default)]
pub struct SampleStore {
    buffers: HashMap<SampleId, Arc<SampleBuffer>>,
}

impl SampleStore {
    pub fn register(&mut self, id: SampleId, buffer: Arc<SampleBuffer>) -> AudioCommand {
        self.buffers.insert(id, Arc::clone(&buffer));
        AudioCommand::RegisterSample { id, buffer }
    }

    pub fn release(&mut self, id: SampleId) -> AudioCommand {
        self.buffers.remove(&id);
        AudioCommand::ReleaseSample { id }
    }

    /// Registers the same audio under a new id.
    pub fn duplicate(&mut self, id: SampleId) -> Option<(SampleId, AudioCommand)> {
        let buffer = Arc::clone(self.buffers.get(&id)?);
        let copy = next_sample_id();
        Some((copy, self.register(copy, buffer)))
    }

    pub fn contains(&self, id: SampleId) -> bool {
        self.buffers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_shares_audio_under_a_new_id() {
        let mut store = SampleStore::default();
        let id = next_sample_id();
        store.register(id, Arc::new(SampleBuffer::silence(8)));

        let (copy, cmd) = store.duplicate(id).unwrap();
        assert_ne!(copy, id);
        assert!(matches!(cmd, AudioCommand::RegisterSample { id, .. } if id == copy));
        assert_eq!(store.len(), 2);

        store.release(id);
        assert!(store.contains(copy));
        assert!(!store.contains(id));
    }

    #[test]
    fn duplicating_an_unknown_id_does_nothing() {
        let mut store = SampleStore::default();
        assert!(store.duplicate(next_sample_id()).is_none());
        assert!(store.is_empty());
    }
}
