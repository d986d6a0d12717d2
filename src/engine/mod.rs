//! The fingerprinting and recognition engine.
//!
//! Command orchestration only sees the [`Engine`] trait. [`LocalEngine`] is the
//! concrete implementation backed by a JSON fingerprint store.

mod local;
mod matching;
mod spectrum;
mod store;

pub use local::LocalEngine;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// How audio is obtained for recognition.
///
/// The argument each variant carries is handed over exactly as the user typed
/// it; interpreting it is up to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognizer {
    /// Record from the default input device for `seconds`.
    Microphone { seconds: String },
    /// Load samples from an audio file.
    File { path: String },
}

/// One ranked candidate returned by recognition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub song_id: u64,
    pub song_name: String,
    pub file_hash: String,
    pub input_total_hashes: usize,
    pub fingerprinted_hashes_in_db: usize,
    pub hashes_matched_in_input: usize,
    pub input_confidence: f64,
    pub fingerprinted_confidence: f64,
    pub offset: i64,
    pub offset_seconds: f64,
}

/// Operations the command layer drives.
pub trait Engine {
    /// Fingerprint a single audio file into the store.
    fn fingerprint_file(&self, path: &Path) -> Result<()>;

    /// Fingerprint every file under `dir` whose extension (with leading dot)
    /// is in `extensions`, using `workers` threads.
    fn fingerprint_directory(
        &self,
        dir: &Path,
        extensions: &BTreeSet<String>,
        workers: usize,
    ) -> Result<()>;

    /// Obtain audio via `recognizer` and rank stored songs against it,
    /// most confident first.
    fn recognize(&self, recognizer: &Recognizer) -> Result<Vec<Match>>;
}

impl<E: Engine + ?Sized> Engine for &E {
    fn fingerprint_file(&self, path: &Path) -> Result<()> {
        (**self).fingerprint_file(path)
    }

    fn fingerprint_directory(
        &self,
        dir: &Path,
        extensions: &BTreeSet<String>,
        workers: usize,
    ) -> Result<()> {
        (**self).fingerprint_directory(dir, extensions, workers)
    }

    fn recognize(&self, recognizer: &Recognizer) -> Result<Vec<Match>> {
        (**self).recognize(recognizer)
    }
}
