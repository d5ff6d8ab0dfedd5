//! # Persistence Module
//!
//! Saving and loading the player's progression between sessions.
//!
//! Only the player record and the current level are persisted; encounters
//! are never resumed mid-fight. Loading is forgiving: missing, corrupt or
//! invalid data falls back to a fresh level 1 player.

pub mod worker;

pub use worker::*;

use crate::{BattleError, BattleResult, Player};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// The persisted progression record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub player: Player,
    pub current_level: u32,
}

impl SaveData {
    /// Progression for a brand new game.
    pub fn new_game() -> Self {
        Self {
            player: Player::new(),
            current_level: 1,
        }
    }

    /// Rejects records the engine could not play from.
    pub fn validate(&self) -> BattleResult<()> {
        let player = &self.player;
        let problem = if self.current_level == 0 {
            Some("current_level must be at least 1")
        } else if player.level == 0 {
            Some("player level must be at least 1")
        } else if player.max_hp == 0 {
            Some("max_hp must be positive")
        } else if player.hp > player.max_hp {
            Some("hp exceeds max_hp")
        } else if player.mana > player.max_mana {
            Some("mana exceeds max_mana")
        } else if player.xp_to_next == 0 {
            Some("xp_to_next must be positive")
        } else if !player.owns_weapon(player.weapon) {
            Some("equipped weapon is not in the inventory")
        } else {
            None
        };

        match problem {
            Some(reason) => Err(BattleError::Persistence(format!("Invalid save data: {}", reason))),
            None => Ok(()),
        }
    }

    /// Serializes the record to JSON.
    pub fn to_json(&self) -> BattleResult<String> {
        serde_json::to_string_pretty(self).map_err(BattleError::from)
    }

    /// Parses and validates a JSON record.
    pub fn from_json(json: &str) -> BattleResult<Self> {
        let data: SaveData = serde_json::from_str(json)?;
        data.validate()?;
        Ok(data)
    }
}

impl Default for SaveData {
    fn default() -> Self {
        Self::new_game()
    }
}

/// Where progression is kept between sessions.
pub trait ProgressionStore: Send {
    /// Loads the stored record, `Ok(None)` when nothing has been saved.
    fn load(&self) -> BattleResult<Option<SaveData>>;

    /// Replaces the stored record.
    fn save(&mut self, data: &SaveData) -> BattleResult<()>;
}

/// Loads progression, falling back to a new game on any problem.
pub fn load_or_default(store: &dyn ProgressionStore) -> SaveData {
    match store.load() {
        Ok(Some(data)) => {
            debug!(
                "Loaded save: player level {}, encounter level {}",
                data.player.level, data.current_level
            );
            data
        }
        Ok(None) => {
            debug!("No save found, starting a new game");
            SaveData::new_game()
        }
        Err(e) => {
            warn!("Discarding unreadable save: {}", e);
            SaveData::new_game()
        }
    }
}

/// Stores progression as a JSON file.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// target, so a crash mid-write never leaves a truncated save behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ProgressionStore for JsonFileStore {
    fn load(&self) -> BattleResult<Option<SaveData>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        SaveData::from_json(&json).map(Some)
    }

    fn save(&mut self, data: &SaveData) -> BattleResult<()> {
        data.validate()?;
        let json = data.to_json()?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let temp = self.temp_path();
        std::fs::write(&temp, json)?;
        std::fs::rename(&temp, &self.path)?;
        debug!("Saved progression to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store whose clones share contents.
///
/// Holds raw JSON so tests can plant corrupt data, and can be told to fail
/// a number of saves to exercise retries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    contents: Arc<Mutex<Option<String>>>,
    failures_remaining: Arc<Mutex<u32>>,
    saves: Arc<Mutex<u32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with raw text.
    pub fn with_raw(json: impl Into<String>) -> Self {
        let store = Self::default();
        if let Ok(mut contents) = store.contents.lock() {
            *contents = Some(json.into());
        }
        store
    }

    /// A store whose next `count` saves fail.
    pub fn failing(count: u32) -> Self {
        let store = Self::default();
        if let Ok(mut remaining) = store.failures_remaining.lock() {
            *remaining = count;
        }
        store
    }

    /// The raw stored text, if any.
    pub fn raw(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u32 {
        self.saves.lock().map(|s| *s).unwrap_or(0)
    }

    fn poisoned() -> BattleError {
        BattleError::Persistence("memory store lock poisoned".to_string())
    }
}

impl ProgressionStore for MemoryStore {
    fn load(&self) -> BattleResult<Option<SaveData>> {
        let contents = self.contents.lock().map_err(|_| Self::poisoned())?;
        match contents.as_deref() {
            Some(json) => SaveData::from_json(json).map(Some),
            None => Ok(None),
        }
    }

    fn save(&mut self, data: &SaveData) -> BattleResult<()> {
        {
            let mut remaining = self.failures_remaining.lock().map_err(|_| Self::poisoned())?;
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BattleError::Persistence("simulated save failure".to_string()));
            }
        }
        data.validate()?;
        let json = data.to_json()?;
        *self.contents.lock().map_err(|_| Self::poisoned())? = Some(json);
        *self.saves.lock().map_err(|_| Self::poisoned())? += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Upgrade, Weapon};
    use tempfile::TempDir;

    fn progressed() -> SaveData {
        let mut data = SaveData::new_game();
        data.current_level = 4;
        data.player.gold = 320;
        data.player.level = 3;
        data.player.upgrades.insert(Upgrade::ManaWell);
        data.player.inventory.insert(Weapon::IronSword);
        data.player.weapon = Weapon::IronSword;
        data
    }

    #[test]
    fn test_new_game_is_valid() {
        assert!(SaveData::new_game().validate().is_ok());
    }

    #[test]
    fn test_unowned_weapon_invalid() {
        let mut data = SaveData::new_game();
        data.player.weapon = Weapon::DragonSlayer;
        assert!(matches!(data.validate(), Err(BattleError::Persistence(_))));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("save.json"));
        assert_eq!(store.load().unwrap(), None);

        let data = progressed();
        store.save(&data).unwrap();
        assert_eq!(store.load().unwrap(), Some(data));
        assert!(!dir.path().join("save.json.tmp").exists());
    }

    #[test]
    fn test_file_store_creates_directories() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested").join("save.json"));
        store.save(&SaveData::new_game()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("save.json");
        std::fs::write(&path, "{ definitely not json").unwrap();
        let store = JsonFileStore::new(&path);

        assert!(store.load().is_err());
        assert_eq!(load_or_default(&store), SaveData::new_game());
    }

    #[test]
    fn test_invalid_record_falls_back() {
        let mut bad = SaveData::new_game();
        bad.player.hp = 500;
        let json = serde_json::to_string(&bad).unwrap();
        let store = MemoryStore::with_raw(json);
        assert_eq!(load_or_default(&store), SaveData::new_game());
    }

    #[test]
    fn test_partial_record_falls_back() {
        let store = MemoryStore::with_raw(r#"{ "current_level": 3 }"#);
        assert_eq!(load_or_default(&store), SaveData::new_game());
    }

    #[test]
    fn test_memory_store_failures() {
        let mut store = MemoryStore::failing(1);
        assert!(store.save(&SaveData::new_game()).is_err());
        assert!(store.save(&SaveData::new_game()).is_ok());
        assert_eq!(store.save_count(), 1);
        assert!(store.raw().is_some());
    }
}
