//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Plays audio to the default output device
///
/// Blocking; the cpal stream lives only for the duration of one call.
pub struct AudioPlayback {
    device: Device,
    config: StreamConfig,
    sample_rate: u32,
}

impl AudioPlayback {
    /// Create a playback instance at the given sample rate
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Synthesis("no output device available".to_string()))?;

        let supports_rate = |c: &cpal::SupportedStreamConfigRange| {
            c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        };

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Synthesis(e.to_string()))?
            .find(|c| c.channels() == 1 && supports_rate(c))
            .or_else(|| {
                // Fallback: try stereo
                device
                    .supported_output_configs()
                    .ok()?
                    .find(|c| c.channels() == 2 && supports_rate(c))
            })
            .ok_or_else(|| Error::Synthesis("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self {
            device,
            config,
            sample_rate,
        })
    }

    /// Decode MP3 bytes and play them with the given gain
    ///
    /// Stops early once `cancel` is set.
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub fn play_mp3(mp3_data: &[u8], gain: f32, cancel: &AtomicBool) -> Result<()> {
        let (samples, sample_rate) = decode_mp3(mp3_data)?;
        let samples = apply_gain(samples, gain);
        Self::new(sample_rate)?.play(samples, cancel)
    }

    /// Play mono f32 samples, blocking until done or until `cancel` is set
    ///
    /// # Errors
    ///
    /// Returns error if playback fails
    pub fn play(&self, samples: Vec<f32>, cancel: &AtomicBool) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let config = self.config.clone();
        let channels = usize::from(config.channels.max(1));
        let sample_count = samples.len();

        let samples = Arc::new(samples);
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let samples_cb = Arc::clone(&samples);
        let position_cb = Arc::clone(&position);
        let finished_cb = Arc::clone(&finished);

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position_cb.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let sample = samples_cb.get(pos).copied().unwrap_or_else(|| {
                            finished_cb.store(true, Ordering::Release);
                            0.0
                        });
                        frame.fill(sample);
                        if pos < samples_cb.len() {
                            pos += 1;
                        }
                    }
                    position_cb.store(pos, Ordering::Relaxed);
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        stream.play().map_err(|e| Error::Synthesis(e.to_string()))?;

        let duration_ms = (sample_count as u64 * 1000) / u64::from(self.sample_rate);

        // Poll for completion with timeout
        let start = Instant::now();
        let timeout = Duration::from_millis(duration_ms + 500);

        while !finished.load(Ordering::Acquire) {
            if cancel.load(Ordering::Acquire) {
                drop(stream);
                tracing::debug!(samples = sample_count, "playback cancelled");
                return Ok(());
            }
            if start.elapsed() > timeout {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        // Small delay to ensure audio finishes
        std::thread::sleep(Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = sample_count, "playback complete");

        Ok(())
    }
}

/// Scale samples by `gain`, clamping to the valid range
#[must_use]
pub fn apply_gain(samples: Vec<f32>, gain: f32) -> Vec<f32> {
    if (gain - 1.0).abs() < f32::EPSILON {
        return samples;
    }
    samples
        .into_iter()
        .map(|s| (s * gain).clamp(-1.0, 1.0))
        .collect()
}

/// Decode MP3 bytes to mono f32 samples and their sample rate
fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = PLAYBACK_SAMPLE_RATE;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if let Ok(rate) = u32::try_from(frame.sample_rate) {
                    sample_rate = rate;
                }

                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Synthesis(format!("MP3 decode error: {e}"))),
        }
    }

    Ok((samples, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_gain() {
        assert_eq!(apply_gain(vec![0.5, -0.5], 1.0), vec![0.5, -0.5]);
        assert_eq!(apply_gain(vec![0.5, -0.8], 2.0), vec![1.0, -1.0]);
        assert_eq!(apply_gain(vec![0.5], 0.5), vec![0.25]);
    }
}
