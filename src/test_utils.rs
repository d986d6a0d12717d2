//! Test helpers shared across modules.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::engine::{Engine, EngineError, Match, Recognizer, Result};

/// A call the command layer made on the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    FingerprintFile(PathBuf),
    FingerprintDirectory(PathBuf, BTreeSet<String>, usize),
    Recognize(Recognizer),
}

/// Engine that records every call and replies with canned results.
#[derive(Default)]
pub struct RecordingEngine {
    pub calls: RefCell<Vec<EngineCall>>,
    pub matches: Vec<Match>,
    pub failure: Option<String>,
}

impl RecordingEngine {
    pub fn returning(matches: Vec<Match>) -> Self {
        RecordingEngine {
            matches,
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        RecordingEngine {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.borrow().clone()
    }

    fn reply<T>(&self, call: EngineCall, value: T) -> Result<T> {
        self.calls.borrow_mut().push(call);
        match &self.failure {
            Some(message) => Err(EngineError::Capture(message.clone())),
            None => Ok(value),
        }
    }
}

impl Engine for RecordingEngine {
    fn fingerprint_file(&self, path: &Path) -> Result<()> {
        self.reply(EngineCall::FingerprintFile(path.to_path_buf()), ())
    }

    fn fingerprint_directory(
        &self,
        dir: &Path,
        extensions: &BTreeSet<String>,
        workers: usize,
    ) -> Result<()> {
        self.reply(
            EngineCall::FingerprintDirectory(dir.to_path_buf(), extensions.clone(), workers),
            (),
        )
    }

    fn recognize(&self, recognizer: &Recognizer) -> Result<Vec<Match>> {
        self.reply(
            EngineCall::Recognize(recognizer.clone()),
            self.matches.clone(),
        )
    }
}

/// A match with only the fields the command layer reads filled in.
pub fn sample_match(song_name: &str, fingerprinted_confidence: f64) -> Match {
    Match {
        song_id: 1,
        song_name: song_name.to_string(),
        file_hash: "0".repeat(64),
        input_total_hashes: 100,
        fingerprinted_hashes_in_db: 1000,
        hashes_matched_in_input: 90,
        input_confidence: 0.9,
        fingerprinted_confidence,
        offset: 0,
        offset_seconds: 0.0,
    }
}
