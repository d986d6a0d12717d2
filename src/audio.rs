use crate::config::MicrophoneConfig;
use crate::engine::{EngineError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Full-scale value samples are normalized to (16-bit PCM range).
const FULL_SCALE: f32 = i16::MAX as f32;

/// Decoded audio, one sample vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl Samples {
    fn from_interleaved(interleaved: &[f32], channel_count: usize, sample_rate: u32) -> Self {
        let channel_count = channel_count.max(1);
        let mut channels = vec![Vec::with_capacity(interleaved.len() / channel_count); channel_count];

        for frame in interleaved.chunks(channel_count) {
            for (ch, sample) in frame.iter().enumerate() {
                channels[ch].push(*sample);
            }
        }

        Samples {
            channels,
            sample_rate,
        }
    }

    /// Keep only the first `seconds` of every channel.
    pub fn truncate_seconds(&mut self, seconds: u32) {
        let max_len = self.sample_rate as usize * seconds as usize;
        for channel in &mut self.channels {
            channel.truncate(max_len);
        }
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }
}

/// Record from the default input device for a fixed duration.
///
/// Blocks for the whole duration; there is no way to stop early.
pub fn record(duration: Duration, mic: &MicrophoneConfig) -> Result<Samples> {
    let host = cpal::default_host();

    let device = host
        .default_input_device()
        .ok_or_else(|| EngineError::Capture("No input device found".to_string()))?;

    debug!(device = %device.name().unwrap_or_default(), ?duration, "Recording");

    let cpal_config = cpal::StreamConfig {
        channels: mic.channels,
        sample_rate: cpal::SampleRate(mic.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let recorded_samples = Arc::new(Mutex::new(Vec::new()));
    let recorded_samples_clone = recorded_samples.clone();

    let err_fn = |err| tracing::error!("Audio stream error: {}", err);

    let stream = device
        .build_input_stream(
            &cpal_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut samples) = recorded_samples_clone.lock() {
                    samples.extend(data.iter().map(|s| s * FULL_SCALE));
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| EngineError::Capture(format!("Failed to build stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| EngineError::Capture(format!("Failed to start stream: {}", e)))?;

    std::thread::sleep(duration);

    drop(stream);

    let interleaved = recorded_samples
        .lock()
        .map(|mut samples| std::mem::take(&mut *samples))
        .map_err(|_| EngineError::Capture("Recording buffer poisoned".to_string()))?;

    debug!("Recorded {} samples", interleaved.len());

    Ok(Samples::from_interleaved(
        &interleaved,
        mic.channels as usize,
        mic.sample_rate,
    ))
}

/// Load an audio file. WAV goes through hound, everything else through symphonia.
pub fn load_file(path: &Path) -> Result<Samples> {
    if !path.is_file() {
        return Err(EngineError::Io(std::io::Error::new(
            ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    debug!(file = %path.display(), "Loading audio");

    if extension == "wav" {
        // Fall back to symphonia for WAV variants hound cannot read
        if let Ok(samples) = load_wav(path) {
            return Ok(samples);
        }
    }

    decode_with_symphonia(path, &extension)
}

fn load_wav(path: &Path) -> Result<Samples> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| EngineError::Decode(format!("{}: {}", path.display(), e)))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1i64 << 15) as f32 / (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| v * FULL_SCALE))
            .collect::<std::result::Result<Vec<f32>, _>>(),
    }
    .map_err(|e| EngineError::Decode(format!("{}: {}", path.display(), e)))?;

    Ok(Samples::from_interleaved(
        &interleaved,
        spec.channels as usize,
        spec.sample_rate,
    ))
}

fn decode_with_symphonia(path: &Path, extension: &str) -> Result<Samples> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if !extension.is_empty() {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| EngineError::Decode(format!("Failed to probe {}: {}", path.display(), e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| EngineError::Decode(format!("No audio tracks in {}", path.display())))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| EngineError::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channel_count = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);
    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => {
                return Err(EngineError::Decode(format!(
                    "Error reading {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => {
                return Err(EngineError::Decode(format!(
                    "Failed to decode {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channel_count = spec.channels.count().max(1);

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        interleaved.extend(buffer.samples().iter().map(|s| s * FULL_SCALE));
    }

    if sample_rate == 0 {
        return Err(EngineError::Decode(format!(
            "Unknown sample rate in {}",
            path.display()
        )));
    }

    Ok(Samples::from_interleaved(
        &interleaved,
        channel_count,
        sample_rate,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_wav(path: &Path, channels: u16, frames: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for sample in frames {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_wav_deinterleaves_channels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, &[100, -100, 200, -200, 300, -300]);

        let samples = load_file(&path).unwrap();

        assert_eq!(samples.sample_rate, 8000);
        assert_eq!(samples.channels.len(), 2);
        assert_eq!(samples.channels[0], vec![100.0, 200.0, 300.0]);
        assert_eq!(samples.channels[1], vec![-100.0, -200.0, -300.0]);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let err = load_file(Path::new("/no/such/clip.wav")).unwrap_err();
        match err {
            EngineError::Io(e) => assert_eq!(e.kind(), ErrorKind::NotFound),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_garbage_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();

        assert!(matches!(load_file(&path), Err(EngineError::Decode(_))));
    }

    #[test]
    fn test_truncate_seconds() {
        let mut samples = Samples {
            channels: vec![vec![0.0; 8000 * 3], vec![0.0; 8000 * 3]],
            sample_rate: 8000,
        };
        samples.truncate_seconds(1);

        assert_eq!(samples.frames(), 8000);
        assert!(samples.channels.iter().all(|c| c.len() == 8000));
    }
}
