//! Preference Storage
//!
//! Named-slot storage for the persisted preferences. `FileStorage` keeps one
//! JSON file per slot; `MemoryStorage` serves hosts without a filesystem.

use crate::error::Result;
use crate::helpers::get_or_create_data_dir;
use ahash::AHashMap;
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

/// Durable storage addressed by slot name
pub trait PreferenceStorage {
    /// Read a slot; `Ok(None)` when it was never written
    fn load(&self, slot: &str) -> Result<Option<String>>;

    /// Replace the contents of a slot
    fn save(&self, slot: &str, contents: &str) -> Result<()>;
}

/// One JSON file per slot inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage rooted in the platform data directory
    pub fn in_data_dir() -> Result<Self> {
        Ok(Self::new(get_or_create_data_dir()?))
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{slot}.json"))
    }
}

impl PreferenceStorage for FileStorage {
    fn load(&self, slot: &str) -> Result<Option<String>> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return Ok(None);
        }
        debug!(path = ?path, "Reading preference slot");
        Ok(Some(fs::read_to_string(path)?))
    }

    fn save(&self, slot: &str, contents: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        let path = self.slot_path(slot);
        debug!(path = ?path, "Writing preference slot");
        fs::write(path, contents)?;
        Ok(())
    }
}

/// In-memory slots; clones share the same slots
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Rc<RefCell<AHashMap<String, String>>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with one slot
    pub fn with_slot(slot: &str, contents: &str) -> Self {
        let storage = Self::new();
        storage
            .slots
            .borrow_mut()
            .insert(slot.to_string(), contents.to_string());
        storage
    }

    /// Number of successful `save` calls
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn contents(&self, slot: &str) -> Option<String> {
        self.slots.borrow().get(slot).cloned()
    }
}

impl PreferenceStorage for MemoryStorage {
    fn load(&self, slot: &str) -> Result<Option<String>> {
        Ok(self.contents(slot))
    }

    fn save(&self, slot: &str, contents: &str) -> Result<()> {
        self.slots
            .borrow_mut()
            .insert(slot.to_string(), contents.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
