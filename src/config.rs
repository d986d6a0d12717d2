use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration defaults
pub const DEFAULT_CONFIG_FILE: &str = "audiomark.cnf.SAMPLE";
pub const DEFAULT_DATABASE_PATH: &str = "fingerprints.json";
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_TOPN: usize = 2;

/// Fingerprinting defaults
pub const DEFAULT_WINDOW_SIZE: usize = 4096;
pub const DEFAULT_OVERLAP_RATIO: f32 = 0.5;
pub const DEFAULT_FAN_VALUE: usize = 5;
pub const DEFAULT_AMP_MIN: f32 = 10.0;
pub const DEFAULT_PEAK_NEIGHBORHOOD_SIZE: usize = 10;
pub const DEFAULT_MIN_HASH_TIME_DELTA: usize = 0;
pub const DEFAULT_MAX_HASH_TIME_DELTA: usize = 200;
pub const DEFAULT_FINGERPRINT_REDUCTION: usize = 20;

/// Microphone defaults
pub const SAMPLE_RATE: u32 = 44100;
pub const CHANNELS: u16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    /// Seconds of each file to fingerprint; `None` fingerprints everything.
    pub fingerprint_limit: Option<u32>,
    pub workers: usize,
    pub topn: usize,
    pub fingerprint: FingerprintConfig,
    pub microphone: MicrophoneConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    pub window_size: usize,
    pub overlap_ratio: f32,
    pub fan_value: usize,
    pub amp_min: f32,
    pub peak_neighborhood_size: usize,
    pub min_hash_time_delta: usize,
    pub max_hash_time_delta: usize,
    pub fingerprint_reduction: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrophoneConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: DatabaseConfig::default(),
            fingerprint_limit: None,
            workers: DEFAULT_WORKERS,
            topn: DEFAULT_TOPN,
            fingerprint: FingerprintConfig::default(),
            microphone: MicrophoneConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        FingerprintConfig {
            window_size: DEFAULT_WINDOW_SIZE,
            overlap_ratio: DEFAULT_OVERLAP_RATIO,
            fan_value: DEFAULT_FAN_VALUE,
            amp_min: DEFAULT_AMP_MIN,
            peak_neighborhood_size: DEFAULT_PEAK_NEIGHBORHOOD_SIZE,
            min_hash_time_delta: DEFAULT_MIN_HASH_TIME_DELTA,
            max_hash_time_delta: DEFAULT_MAX_HASH_TIME_DELTA,
            fingerprint_reduction: DEFAULT_FINGERPRINT_REDUCTION,
        }
    }
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        MicrophoneConfig {
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
        }
    }
}

impl FingerprintConfig {
    /// Hop between consecutive analysis windows, in samples.
    pub fn hop_size(&self) -> usize {
        let overlap = (self.window_size as f32 * self.overlap_ratio) as usize;
        (self.window_size - overlap).max(1)
    }
}

impl Config {
    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot open {}: {}", path.display(), e))
        })?;

        let config: Config = serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!("Cannot parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(AppError::Config("workers must be positive".to_string()));
        }

        if self.topn == 0 {
            return Err(AppError::Config("topn must be positive".to_string()));
        }

        let fp = &self.fingerprint;
        if fp.window_size < 2 {
            return Err(AppError::Config(
                "fingerprint.window_size must be at least 2".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&fp.overlap_ratio) {
            return Err(AppError::Config(
                "fingerprint.overlap_ratio must be in [0, 1)".to_string(),
            ));
        }

        if fp.fan_value < 2 {
            return Err(AppError::Config(
                "fingerprint.fan_value must be at least 2".to_string(),
            ));
        }

        if fp.min_hash_time_delta > fp.max_hash_time_delta {
            return Err(AppError::Config(
                "fingerprint.min_hash_time_delta exceeds max_hash_time_delta".to_string(),
            ));
        }

        if fp.fingerprint_reduction == 0 || fp.fingerprint_reduction > 64 {
            return Err(AppError::Config(
                "fingerprint.fingerprint_reduction must be in 1..=64".to_string(),
            ));
        }

        if self.microphone.sample_rate == 0 || self.microphone.channels == 0 {
            return Err(AppError::Config(
                "microphone.sample_rate and microphone.channels must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
