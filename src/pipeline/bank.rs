// The 4x8 sample bank. Slots live independently of the tracks; assigning a
// slot to a track copies it, so clearing the slot later leaves the track alone.

use serde::{Deserialize, Serialize};

use crate::audio::SampleId;
use crate::shared::{BANK_COLS, BANK_ROWS};

pub const EMPTY_SLOT_NAME: &str = "Empty";
pub const BANK_EXPORT_FILE: &str = "sample-bank.json";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BankSlot {
    pub name: String, // empty string = no sample
    pub sample_path: String,

    // Runtime handle, re-created by decoding `sample_path` on startup.
    #[serde(skip)]
    pub sample_id: Option<SampleId>,
}

impl BankSlot {
    pub fn is_loaded(&self) -> bool {
        self.sample_id.is_some()
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { EMPTY_SLOT_NAME } else { &self.name }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SampleBank {
    pub slots: [[BankSlot; BANK_COLS]; BANK_ROWS],
}

/// What gets written to `sample-bank.json`: names only, no audio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BankExport {
    pub samples: Vec<Vec<String>>,
}

impl SampleBank {
    pub fn slot(&self, row: usize, col: usize) -> Option<&BankSlot> {
        self.slots.get(row).and_then(|r| r.get(col))
    }

    pub fn slot_mut(&mut self, row: usize, col: usize) -> Option<&mut BankSlot> {
        self.slots.get_mut(row).and_then(|r| r.get_mut(col))
    }

    /// Stores a freshly decoded sample; hands back the id it replaced, if any.
    pub fn install(&mut self, row: usize, col: usize, name: &str, path: &str, id: SampleId) -> Option<SampleId> {
        let slot = self.slot_mut(row, col)?;
        let old = slot.sample_id.replace(id);
        slot.name = name.to_string();
        slot.sample_path = path.to_string();
        old
    }

    /// Empties a slot; hands back the id that has to be released.
    pub fn clear(&mut self, row: usize, col: usize) -> Option<SampleId> {
        let slot = self.slot_mut(row, col)?;
        let old = slot.sample_id.take();
        *slot = BankSlot::default();
        old
    }

    pub fn names(&self) -> [[String; BANK_COLS]; BANK_ROWS] {
        std::array::from_fn(|row| std::array::from_fn(|col| self.slots[row][col].display_name().to_string()))
    }

    pub fn export(&self) -> BankExport {
        BankExport {
            samples: self
                .slots
                .iter()
                .map(|row| row.iter().map(|s| s.display_name().to_string()).collect())
                .collect(),
        }
    }

    pub fn export_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::next_sample_id;

    #[test]
    fn export_fills_unused_slots_with_empty() {
        let mut bank = SampleBank::default();
        bank.install(0, 0, "kick.wav", "/tmp/kick.wav", next_sample_id());

        let export = bank.export();
        assert_eq!(export.samples.len(), BANK_ROWS);
        assert!(export.samples.iter().all(|row| row.len() == BANK_COLS));
        assert_eq!(export.samples[0][0], "kick.wav");
        let empties = export.samples.iter().flatten().filter(|n| *n == EMPTY_SLOT_NAME).count();
        assert_eq!(empties, BANK_ROWS * BANK_COLS - 1);

        let value: serde_json::Value = serde_json::from_str(&bank.export_json().unwrap()).unwrap();
        assert_eq!(value["samples"][0][0], "kick.wav");
        assert_eq!(value["samples"][0][1], "Empty");
        assert_eq!(value["samples"][3][7], "Empty");
    }

    #[test]
    fn reinstall_returns_the_replaced_handle() {
        let mut bank = SampleBank::default();
        let first = next_sample_id();
        let second = next_sample_id();
        assert_eq!(bank.install(1, 2, "a.wav", "a.wav", first), None);
        assert_eq!(bank.install(1, 2, "b.wav", "b.wav", second), Some(first));
        assert_eq!(bank.slot(1, 2).unwrap().name, "b.wav");
    }

    #[test]
    fn clear_resets_the_name() {
        let mut bank = SampleBank::default();
        let id = next_sample_id();
        bank.install(3, 7, "snare.mp3", "snare.mp3", id);
        assert_eq!(bank.clear(3, 7), Some(id));
        assert_eq!(bank.slot(3, 7).unwrap().display_name(), "Empty");
        assert!(!bank.slot(3, 7).unwrap().is_loaded());
    }

    #[test]
    fn out_of_range_slots_are_ignored() {
        let mut bank = SampleBank::default();
        assert_eq!(bank.install(BANK_ROWS, 0, "x", "x", next_sample_id()), None);
        assert_eq!(bank.clear(0, BANK_COLS), None);
        assert!(bank.slot(BANK_ROWS, 0).is_none());
    }
}
