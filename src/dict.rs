//! Filename hash dictionaries
//!
//! The main archive stores no names, only 32-bit path hashes. A
//! per-game dictionary file in the resource directory lists the known
//! archive paths, one per line; hashing each line rebuilds the
//! hash-to-name mapping. Dictionaries are loaded at most once per game
//! per run and shared read-only afterwards.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::paths::hash_form;
use crate::platform::GameType;

/// 32-bit path hash used by the main-archive index
///
/// The name is lowercased, separators unified to `/` with a leading
/// slash, then folded byte-wise as `h = h * 37 + b`.
pub fn path_hash(name: &str) -> u32 {
    hash_form(name)
        .bytes()
        .fold(0u32, |h, b| h.wrapping_mul(37).wrapping_add(u32::from(b)))
}

/// Immutable hash-to-filename mapping for one game
#[derive(Debug)]
pub struct HashDictionary {
    names: Vec<String>,
    by_hash: HashMap<u32, usize>,
}

impl HashDictionary {
    /// Load a dictionary from a text file
    ///
    /// One forward-slash archive path per line; blank lines and `#`
    /// comments are skipped. When two lines hash the same, the first
    /// wins.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_lines(&text))
    }

    /// Build a dictionary from the text of a dictionary file
    pub fn from_lines(text: &str) -> Self {
        let mut names = Vec::new();
        let mut by_hash = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let hash = path_hash(line);
            if let std::collections::hash_map::Entry::Vacant(slot) = by_hash.entry(hash) {
                slot.insert(names.len());
                names.push(line.to_string());
            }
        }
        Self { names, by_hash }
    }

    /// Look up the filename for a hash
    pub fn name_for(&self, hash: u32) -> Option<&str> {
        self.by_hash.get(&hash).map(|&i| self.names[i].as_str())
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the dictionary holds no names
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Per-run dictionary cache
///
/// Each game's dictionary is resolved against the resource directory
/// at most once, including the not-found outcome, so repeated
/// arguments for the same game never re-read the file. Safe to share
/// by reference under the strictly sequential argument loop; parallel
/// callers would need to replace this with a lock-guarded map.
pub struct DictionaryCache {
    res_dir: PathBuf,
    loaded: HashMap<GameType, Option<Arc<HashDictionary>>>,
}

impl DictionaryCache {
    /// Cache resolving dictionary files under `res_dir`
    pub fn new(res_dir: PathBuf) -> Self {
        Self {
            res_dir,
            loaded: HashMap::new(),
        }
    }

    /// Dictionary for `game`, loading it on first request
    ///
    /// Returns `None` when the resource directory has no dictionary
    /// file for the game; the caller decides whether that is fatal.
    pub fn get(&mut self, game: GameType) -> Result<Option<Arc<HashDictionary>>> {
        if let Some(cached) = self.loaded.get(&game) {
            return Ok(cached.clone());
        }

        let path = self.res_dir.join(game.dictionary_file_name());
        let loaded = if path.is_file() {
            Some(Arc::new(HashDictionary::load(&path)?))
        } else {
            None
        };

        self.loaded.insert(game, loaded.clone());
        Ok(loaded)
    }
}
