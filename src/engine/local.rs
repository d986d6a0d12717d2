use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use super::matching::align_matches;
use super::spectrum::{self, HashedPeak};
use super::store::FingerprintStore;
use super::{Engine, EngineError, Match, Recognizer, Result};
use crate::audio::{self, Samples};
use crate::config::Config;

/// Engine backed by a local JSON fingerprint store.
pub struct LocalEngine {
    config: Config,
    store: Mutex<FingerprintStore>,
}

/// A file's hashes, ready to be inserted.
struct Fingerprinted {
    path: PathBuf,
    name: String,
    file_hash: String,
    hashes: Vec<HashedPeak>,
}

impl LocalEngine {
    pub fn new(config: Config) -> Result<Self> {
        let store = FingerprintStore::open(&config.database.path)?;
        Ok(LocalEngine {
            config,
            store: Mutex::new(store),
        })
    }

    fn store(&self) -> Result<MutexGuard<'_, FingerprintStore>> {
        self.store
            .lock()
            .map_err(|_| EngineError::Storage("Fingerprint store lock poisoned".to_string()))
    }

    /// Hashes of every channel, deduplicated and sorted.
    fn hash_samples(&self, samples: &Samples) -> Result<Vec<HashedPeak>> {
        let mut unique = HashSet::new();
        for channel in &samples.channels {
            unique.extend(spectrum::fingerprint(channel, &self.config.fingerprint)?);
        }

        let mut hashes: Vec<HashedPeak> = unique.into_iter().collect();
        hashes.sort_unstable();
        Ok(hashes)
    }

    fn load_limited(&self, path: &Path) -> Result<Samples> {
        let mut samples = audio::load_file(path)?;
        if let Some(limit) = self.config.fingerprint_limit {
            samples.truncate_seconds(limit);
        }
        Ok(samples)
    }

    /// Fingerprint `path` unless its content is already stored.
    fn fingerprint_path(&self, path: &Path) -> Result<Option<Fingerprinted>> {
        let file_hash = file_hash(path)?;
        if self.store()?.contains_file(&file_hash) {
            info!(file = %path.display(), "Already fingerprinted, skipping");
            return Ok(None);
        }

        let samples = self.load_limited(path)?;
        let hashes = self.hash_samples(&samples)?;
        debug!(file = %path.display(), hashes = hashes.len(), "Fingerprinted");

        Ok(Some(Fingerprinted {
            path: path.to_path_buf(),
            name: song_name(path),
            file_hash,
            hashes,
        }))
    }

    /// Insert results, skipping duplicates within the batch. Returns the number inserted.
    fn insert_all(&self, results: Vec<Fingerprinted>) -> Result<usize> {
        let mut store = self.store()?;
        let mut inserted = 0;

        for item in results {
            if store.contains_file(&item.file_hash) {
                debug!(file = %item.path.display(), "Duplicate content in batch, skipping");
                continue;
            }
            store.insert(item.name, item.file_hash, item.hashes);
            inserted += 1;
        }

        if inserted > 0 {
            store.save()?;
        }
        Ok(inserted)
    }

    #[cfg(test)]
    fn song_names(&self) -> Vec<String> {
        self.store.lock().unwrap().names()
    }
}

impl Engine for LocalEngine {
    #[instrument(skip(self))]
    fn fingerprint_file(&self, path: &Path) -> Result<()> {
        if let Some(fingerprinted) = self.fingerprint_path(path)? {
            self.insert_all(vec![fingerprinted])?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn fingerprint_directory(
        &self,
        dir: &Path,
        extensions: &BTreeSet<String>,
        workers: usize,
    ) -> Result<()> {
        if !dir.is_dir() {
            return Err(EngineError::InvalidArgument(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let wanted: BTreeSet<String> = extensions.iter().map(|e| e.to_lowercase()).collect();
        let files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| wanted.contains(&format!(".{}", ext.to_lowercase())))
                    .unwrap_or(false)
            })
            .collect();

        info!(files = files.len(), workers, "Fingerprinting directory");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .map_err(|e| EngineError::InvalidArgument(format!("Cannot start workers: {}", e)))?;

        let results: Vec<(PathBuf, Result<Option<Fingerprinted>>)> = pool.install(|| {
            files
                .par_iter()
                .map(|path| (path.clone(), self.fingerprint_path(path)))
                .collect()
        });

        let mut ready = Vec::new();
        let mut failed = 0;
        for (path, result) in results {
            match result {
                Ok(Some(fingerprinted)) => ready.push(fingerprinted),
                Ok(None) => {}
                Err(e) => {
                    failed += 1;
                    warn!(file = %path.display(), error = %e, "Failed to fingerprint");
                }
            }
        }

        let inserted = self.insert_all(ready)?;
        let total = self.store()?.len();
        info!(inserted, failed, total, "Directory fingerprinting finished");
        Ok(())
    }

    #[instrument(skip(self))]
    fn recognize(&self, recognizer: &Recognizer) -> Result<Vec<Match>> {
        let samples = match recognizer {
            Recognizer::Microphone { seconds } => {
                audio::record(parse_seconds(seconds)?, &self.config.microphone)?
            }
            Recognizer::File { path } => self.load_limited(Path::new(path))?,
        };

        let query = self.hash_samples(&samples)?;
        debug!(hashes = query.len(), frames = samples.frames(), "Query fingerprinted");

        let seconds_per_frame =
            self.config.fingerprint.hop_size() as f64 / samples.sample_rate.max(1) as f64;
        let store = self.store()?;
        Ok(align_matches(
            &store,
            &query,
            self.config.topn,
            seconds_per_frame,
        ))
    }
}

/// Capture duration from the raw CLI argument.
fn parse_seconds(raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|seconds| *seconds > 0.0)
        .and_then(|seconds| Duration::try_from_secs_f32(seconds).ok())
        .ok_or_else(|| {
            EngineError::InvalidArgument(format!(
                "capture duration must be a positive number of seconds, got '{}'",
                raw
            ))
        })
}

fn song_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// SHA-256 of the file contents as lowercase hex.
fn file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
