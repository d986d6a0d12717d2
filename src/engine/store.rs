use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::spectrum::HashedPeak;
use super::{EngineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: u64,
    pub name: String,
    pub file_hash: String,
    pub hashes: Vec<HashedPeak>,
}

#[derive(Default, Serialize, Deserialize)]
struct StoreFile {
    songs: Vec<Song>,
}

/// Songs persisted as a single JSON file, plus an inverted hash index.
pub struct FingerprintStore {
    path: PathBuf,
    songs: BTreeMap<u64, Song>,
    index: HashMap<String, Vec<(u64, u32)>>,
}

impl FingerprintStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self> {
        let mut store = FingerprintStore {
            path: path.to_path_buf(),
            songs: BTreeMap::new(),
            index: HashMap::new(),
        };

        if !path.exists() {
            debug!(store = %path.display(), "Starting empty fingerprint store");
            return Ok(store);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Storage(format!("Cannot read {}: {}", path.display(), e)))?;
        let file: StoreFile = serde_json::from_str(&raw)
            .map_err(|e| EngineError::Storage(format!("Cannot parse {}: {}", path.display(), e)))?;

        for song in file.songs {
            store.index_song(&song);
            store.songs.insert(song.id, song);
        }

        debug!(store = %path.display(), songs = store.songs.len(), "Loaded fingerprint store");
        Ok(store)
    }

    fn index_song(&mut self, song: &Song) {
        for (hash, offset) in &song.hashes {
            self.index
                .entry(hash.clone())
                .or_default()
                .push((song.id, *offset));
        }
    }

    pub fn contains_file(&self, file_hash: &str) -> bool {
        self.songs.values().any(|song| song.file_hash == file_hash)
    }

    /// Add a song and return its id.
    pub fn insert(&mut self, name: String, file_hash: String, hashes: Vec<HashedPeak>) -> u64 {
        let id = self.songs.keys().next_back().map_or(1, |last| last + 1);
        let song = Song {
            id,
            name,
            file_hash,
            hashes,
        };
        self.index_song(&song);
        self.songs.insert(id, song);
        id
    }

    /// Every `(song_id, offset)` a hash was seen at.
    pub fn lookup(&self, hash: &str) -> &[(u64, u32)] {
        self.index.get(hash).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn song(&self, id: u64) -> Option<&Song> {
        self.songs.get(&id)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    #[cfg(test)]
    pub fn names(&self) -> Vec<String> {
        self.songs.values().map(|s| s.name.clone()).collect()
    }

    /// Write the store to disk via a temp file and rename.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = StoreFile {
            songs: self.songs.values().cloned().collect(),
        };
        let json = serde_json::to_string(&file)
            .map_err(|e| EngineError::Storage(format!("Cannot serialize store: {}", e)))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(store = %self.path.display(), songs = self.songs.len(), "Saved fingerprint store");
        Ok(())
    }
}
