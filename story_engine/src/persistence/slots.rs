//! Save slots - a fixed number of records kept in creation order.

use serde::{Deserialize, Serialize};

use super::{DurableRecord, PersistError, RecordStorage};

/// Save slot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    pub max_slots: usize,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self { max_slots: 3 }
    }
}

/// Load-screen information about one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSummary {
    pub slot: usize,
    pub story_id: String,
    pub player_name: String,
    pub progress: f32,
    pub saved_at: String,
}

/// Save records numbered by creation order.
///
/// Slots are always contiguous from zero: deleting a slot moves every later
/// save down by one.
pub struct SaveSlots<S: RecordStorage> {
    storage: S,
    max_slots: usize,
}

impl<S: RecordStorage> SaveSlots<S> {
    pub fn new(storage: S, config: &SaveConfig) -> Self {
        Self {
            storage,
            max_slots: config.max_slots,
        }
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    /// Number of occupied slots.
    pub fn count(&self) -> Result<usize, PersistError> {
        let mut count = 0;
        while count < self.max_slots && self.storage.read(&slot_key(count))?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    pub fn is_full(&self) -> Result<bool, PersistError> {
        Ok(self.count()? >= self.max_slots)
    }

    /// Summaries of every occupied slot, oldest first.
    pub fn list(&self) -> Result<Vec<SlotSummary>, PersistError> {
        (0..self.count()?)
            .map(|slot| {
                let record = self.load(slot)?;
                Ok(SlotSummary {
                    slot,
                    story_id: record.story_id,
                    player_name: record.meta.player_name,
                    progress: record.meta.progress,
                    saved_at: record.meta.saved_at,
                })
            })
            .collect()
    }

    /// Store `record` in the next free slot and return its number.
    pub fn create(&mut self, record: &DurableRecord) -> Result<usize, PersistError> {
        let slot = self.count()?;
        if slot >= self.max_slots {
            return Err(PersistError::SlotsFull {
                max: self.max_slots,
            });
        }
        self.write(slot, record)?;
        tracing::info!(slot, story = %record.story_id, "created save");
        Ok(slot)
    }

    /// Replace the record in an occupied slot.
    pub fn overwrite(&mut self, slot: usize, record: &DurableRecord) -> Result<(), PersistError> {
        self.check_occupied(slot)?;
        self.write(slot, record)?;
        tracing::info!(slot, story = %record.story_id, "overwrote save");
        Ok(())
    }

    pub fn load(&self, slot: usize) -> Result<DurableRecord, PersistError> {
        let bytes = self
            .storage
            .read(&slot_key(slot))?
            .ok_or(PersistError::NoSuchSlot(slot))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Delete a slot, shifting later saves down.
    pub fn delete(&mut self, slot: usize) -> Result<(), PersistError> {
        let count = self.count()?;
        if slot >= count {
            return Err(PersistError::NoSuchSlot(slot));
        }

        for next in slot + 1..count {
            if let Some(bytes) = self.storage.read(&slot_key(next))? {
                self.storage.write(&slot_key(next - 1), &bytes)?;
            }
        }
        self.storage.remove(&slot_key(count - 1))?;
        tracing::info!(slot, "deleted save");
        Ok(())
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    fn check_occupied(&self, slot: usize) -> Result<(), PersistError> {
        if slot < self.count()? {
            Ok(())
        } else {
            Err(PersistError::NoSuchSlot(slot))
        }
    }

    fn write(&mut self, slot: usize, record: &DurableRecord) -> Result<(), PersistError> {
        let json = record.to_json()?;
        self.storage.write(&slot_key(slot), json.as_bytes())?;
        Ok(())
    }
}

fn slot_key(slot: usize) -> String {
    format!("save_{slot}.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStorage, SaveMeta};

    fn record(player: &str) -> DurableRecord {
        DurableRecord {
            version: 1,
            story_id: "chapter-1".to_string(),
            current_node: "R".to_string(),
            history: vec!["R".to_string()],
            history_index: "0".to_string(),
            choice_ledger: vec![],
            choice_index: "0".to_string(),
            is_story_node: true,
            abandoned_choice: None,
            meta: SaveMeta {
                player_name: player.to_string(),
                ..Default::default()
            },
        }
    }

    fn slots() -> SaveSlots<MemoryStorage> {
        SaveSlots::new(MemoryStorage::new(), &SaveConfig::default())
    }

    #[test]
    fn test_create_in_order() {
        let mut slots = slots();

        assert_eq!(slots.create(&record("a")).unwrap(), 0);
        assert_eq!(slots.create(&record("b")).unwrap(), 1);
        assert_eq!(slots.count().unwrap(), 2);

        let names: Vec<_> = slots
            .list()
            .unwrap()
            .into_iter()
            .map(|s| s.player_name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_slots_are_capped() {
        let mut slots = slots();
        for name in ["a", "b", "c"] {
            slots.create(&record(name)).unwrap();
        }

        assert!(slots.is_full().unwrap());
        assert!(matches!(
            slots.create(&record("d")),
            Err(PersistError::SlotsFull { max: 3 })
        ));
    }

    #[test]
    fn test_delete_shifts_later_slots() {
        let mut slots = slots();
        for name in ["a", "b", "c"] {
            slots.create(&record(name)).unwrap();
        }

        slots.delete(0).unwrap();

        assert_eq!(slots.count().unwrap(), 2);
        assert_eq!(slots.load(0).unwrap().meta.player_name, "b");
        assert_eq!(slots.load(1).unwrap().meta.player_name, "c");
        assert!(matches!(slots.load(2), Err(PersistError::NoSuchSlot(2))));
    }

    #[test]
    fn test_overwrite_requires_occupied_slot() {
        let mut slots = slots();
        slots.create(&record("a")).unwrap();

        slots.overwrite(0, &record("z")).unwrap();
        assert_eq!(slots.load(0).unwrap().meta.player_name, "z");

        assert!(matches!(
            slots.overwrite(1, &record("y")),
            Err(PersistError::NoSuchSlot(1))
        ));
        assert!(matches!(slots.delete(4), Err(PersistError::NoSuchSlot(4))));
    }

    #[test]
    fn test_borrowed_storage() {
        let mut storage = MemoryStorage::new();
        {
            let mut slots = SaveSlots::new(&mut storage, &SaveConfig { max_slots: 1 });
            slots.create(&record("a")).unwrap();
        }
        assert_eq!(storage.len(), 1);
    }
}
