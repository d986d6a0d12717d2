use realfft::RealFftPlanner;
use sha2::{Digest, Sha256};
use std::f32::consts::PI;

use super::{EngineError, Result};
use crate::config::FingerprintConfig;

/// A hash and the frame it is anchored at.
pub type HashedPeak = (String, u32);

// dB power, frame-major
struct Spectrogram {
    values: Vec<f32>,
    frames: usize,
    bins: usize,
}

impl Spectrogram {
    fn at(&self, frame: usize, bin: usize) -> f32 {
        self.values[frame * self.bins + bin]
    }
}

/// Fingerprint one channel of audio.
pub fn fingerprint(samples: &[f32], config: &FingerprintConfig) -> Result<Vec<HashedPeak>> {
    let spectrogram = spectrogram(samples, config.window_size, config.hop_size())?;
    let peaks = find_peaks(
        &spectrogram,
        config.peak_neighborhood_size,
        config.amp_min,
    );
    Ok(generate_hashes(&peaks, config))
}

fn spectrogram(samples: &[f32], window_size: usize, hop: usize) -> Result<Spectrogram> {
    let bins = window_size / 2 + 1;
    let frames = match samples.len() {
        0 => 0,
        len if len < window_size => 1,
        len => (len - window_size) / hop + 1,
    };

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(window_size);
    let mut input = fft.make_input_vec();
    let mut output = fft.make_output_vec();

    let window: Vec<f32> = (0..window_size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / window_size as f32).cos())
        .collect();

    let mut values = Vec::with_capacity(frames * bins);
    for frame in 0..frames {
        let start = frame * hop;
        for (i, slot) in input.iter_mut().enumerate() {
            *slot = samples.get(start + i).copied().unwrap_or(0.0) * window[i];
        }

        fft.process(&mut input, &mut output)
            .map_err(|e| EngineError::Decode(format!("FFT failed: {}", e)))?;

        values.extend(output.iter().map(|c| {
            let power = c.norm_sqr();
            if power > 0.0 {
                10.0 * power.log10()
            } else {
                0.0
            }
        }));
    }

    Ok(Spectrogram {
        values,
        frames,
        bins,
    })
}

fn max_filter(values: &[f32], radius: usize) -> Vec<f32> {
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius + 1).min(values.len());
            values[lo..hi]
                .iter()
                .copied()
                .fold(f32::NEG_INFINITY, f32::max)
        })
        .collect()
}

fn find_peaks(spec: &Spectrogram, neighborhood: usize, amp_min: f32) -> Vec<(usize, usize)> {
    if spec.frames == 0 {
        return Vec::new();
    }

    // A square max filter is separable: across bins first, then across frames.
    let mut filtered = Vec::with_capacity(spec.values.len());
    for frame in spec.values.chunks(spec.bins) {
        filtered.extend(max_filter(frame, neighborhood));
    }

    for bin in 0..spec.bins {
        let column: Vec<f32> = (0..spec.frames)
            .map(|frame| filtered[frame * spec.bins + bin])
            .collect();
        for (frame, value) in max_filter(&column, neighborhood).into_iter().enumerate() {
            filtered[frame * spec.bins + bin] = value;
        }
    }

    let mut peaks = Vec::new();
    for frame in 0..spec.frames {
        for bin in 0..spec.bins {
            let value = spec.at(frame, bin);
            if value > amp_min && value == filtered[frame * spec.bins + bin] {
                peaks.push((bin, frame));
            }
        }
    }

    peaks
}

fn generate_hashes(peaks: &[(usize, usize)], config: &FingerprintConfig) -> Vec<HashedPeak> {
    let mut hashes = Vec::new();

    for (i, &(freq1, t1)) in peaks.iter().enumerate() {
        for &(freq2, t2) in peaks.iter().skip(i + 1).take(config.fan_value - 1) {
            let t_delta = t2 - t1;
            if t_delta < config.min_hash_time_delta || t_delta > config.max_hash_time_delta {
                continue;
            }

            let digest = Sha256::digest(format!("{}|{}|{}", freq1, freq2, t_delta).as_bytes());
            let mut hash = format!("{:x}", digest);
            hash.truncate(config.fingerprint_reduction);
            hashes.push((hash, t1 as u32));
        }
    }

    hashes
}
