// ============================================
// src/save_data.rs
// Key/value preferences persisted between sessions
// ============================================

use bincode::config::standard;
use bincode::{Decode, Encode};
use chrono::{DateTime, TimeZone, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::SaveError;

const SAVE_FILE_BIN: &str = "save_data.bin";
const SAVE_FILE_JSON: &str = "save_data.json";

/// Everything the trainers remember, as plain string values under fixed keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub updated_at: Option<DateTime<Utc>>,
    pub entries: BTreeMap<String, String>,
}

/// bincode representation (timestamp as unix seconds)
#[derive(Encode, Decode)]
struct SaveDataBin {
    updated_at_secs: Option<i64>,
    entries: Vec<(String, String)>,
}

impl From<&SaveData> for SaveDataBin {
    fn from(data: &SaveData) -> Self {
        Self {
            updated_at_secs: data.updated_at.map(|t| t.timestamp()),
            entries: data
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl From<SaveDataBin> for SaveData {
    fn from(bin: SaveDataBin) -> Self {
        Self {
            updated_at: bin
                .updated_at_secs
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
            entries: bin.entries.into_iter().collect(),
        }
    }
}

/// Default state directory, e.g. `~/.local/share/catechism` on Linux.
pub fn default_state_dir() -> Option<PathBuf> {
    ProjectDirs::from("org", "catechism", "catechism").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Handle to the save file. Every write goes straight to disk.
#[derive(Debug)]
pub struct SaveStore {
    data: SaveData,
    dir: Option<PathBuf>,
}

impl SaveStore {
    /// Open (or start) the save file in `dir`.
    pub fn open(dir: &Path) -> Self {
        if !dir.exists() {
            if let Err(err) = fs::create_dir_all(dir) {
                warn!(dir = %dir.display(), %err, "could not create state directory");
            }
        }
        Self {
            data: load_from(dir),
            dir: Some(dir.to_path_buf()),
        }
    }

    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            data: SaveData::default(),
            dir: None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.entries.get(key).map(String::as_str)
    }

    /// Parse a stored value; malformed values read as absent.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                debug!(key, raw, "ignoring malformed saved value");
                None
            }
        }
    }

    /// Stored booleans are the strings `"true"` / `"false"`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).map(|raw| raw == "true")
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if self.get(key) == Some(value.as_str()) {
            return;
        }
        self.data.entries.insert(key.to_string(), value);
        self.persist();
    }

    pub fn remove(&mut self, key: &str) {
        if self.data.entries.remove(key).is_some() {
            self.persist();
        }
    }

    fn persist(&mut self) {
        if self.dir.is_none() {
            return;
        }
        self.data.updated_at = Some(Utc::now());
        if let Err(err) = self.save() {
            warn!(%err, "failed to write save data");
        }
    }

    /// Write the binary file and its JSON copy.
    pub fn save(&self) -> Result<(), SaveError> {
        let dir = self.dir.as_ref().ok_or(SaveError::NoPath)?;

        let file = File::create(dir.join(SAVE_FILE_BIN))?;
        let mut writer = BufWriter::new(file);
        let encoded = bincode::encode_to_vec(SaveDataBin::from(&self.data), standard())?;
        writer.write_all(&encoded)?;
        writer.flush()?;

        let json = serde_json::to_string_pretty(&self.data)?;
        fs::write(dir.join(SAVE_FILE_JSON), json)?;
        Ok(())
    }
}

/// Binary first, JSON copy second, empty data last.
fn load_from(dir: &Path) -> SaveData {
    let bin_path = dir.join(SAVE_FILE_BIN);
    if bin_path.exists() {
        if let Ok(mut file) = File::open(&bin_path) {
            let mut buffer = Vec::new();
            if file.read_to_end(&mut buffer).is_ok() {
                match bincode::decode_from_slice::<SaveDataBin, _>(&buffer, standard()) {
                    Ok((bin, _)) => return SaveData::from(bin),
                    Err(err) => warn!(%err, "binary save data unreadable, trying JSON copy"),
                }
            }
        }
    }

    let json_path = dir.join(SAVE_FILE_JSON);
    if json_path.exists() {
        if let Ok(file) = File::open(&json_path) {
            if let Ok(data) = serde_json::from_reader(BufReader::new(file)) {
                return data;
            }
        }
    }

    SaveData::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = SaveStore::open(dir.path());
            store.set("childrenCatechismIndex", "4");
            store.set("childrenAutoSpeak", "false");
        }
        let store = SaveStore::open(dir.path());
        assert_eq!(store.get_parsed::<usize>("childrenCatechismIndex"), Some(4));
        assert_eq!(store.get_bool("childrenAutoSpeak"), Some(false));
        assert!(store.data.updated_at.is_some());
    }

    #[test]
    fn json_copy_is_used_when_binary_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = SaveStore::open(dir.path());
            store.set("shorterCatechismMode", "learning");
        }
        fs::write(dir.path().join(SAVE_FILE_BIN), b"garbage").unwrap();
        let store = SaveStore::open(dir.path());
        assert_eq!(store.get("shorterCatechismMode"), Some("learning"));
    }

    #[test]
    fn remove_deletes_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SaveStore::open(dir.path());
        store.set("childrenCatechismRange", r#"{"from":1,"to":5}"#);
        store.remove("childrenCatechismRange");
        let store = SaveStore::open(dir.path());
        assert_eq!(store.get("childrenCatechismRange"), None);
    }

    #[test]
    fn malformed_numbers_read_as_absent() {
        let mut store = SaveStore::in_memory();
        store.set("shorterCatechismFlashcardIndex", "abc");
        assert_eq!(store.get_parsed::<usize>("shorterCatechismFlashcardIndex"), None);
        assert!(matches!(store.save(), Err(SaveError::NoPath)));
    }
}
