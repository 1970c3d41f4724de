//! Audio capture from microphone

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Samples pulled per read (125ms at 16kHz)
pub const CHUNK_SAMPLES: usize = 2000;

/// Oldest samples are discarded past this many (10s)
const MAX_BUFFERED_SAMPLES: usize = SAMPLE_RATE as usize * 10;

/// PCM buffer shared between the cpal callback and the reader
#[derive(Default)]
struct SharedBuffer {
    samples: Mutex<VecDeque<i16>>,
    ready: Condvar,
}

/// Captures 16kHz mono PCM from the default input device
///
/// The stream is not `Send`; create and drop it on the thread that reads it.
pub struct AudioCapture {
    config: StreamConfig,
    buffer: Arc<SharedBuffer>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new audio capture instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Capture("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Capture(e.to_string()))?
            .filter(|c| {
                c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .min_by_key(cpal::SupportedStreamConfigRange::channels)
            .ok_or_else(|| Error::Capture("no 16kHz input config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            config,
            buffer: Arc::new(SharedBuffer::default()),
            stream: None,
        })
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if capture fails
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Capture("no input device".to_string()))?;

        let config = self.config.clone();
        let channels = usize::from(config.channels.max(1));

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let Ok(mut buf) = buffer.samples.lock() else {
                        return;
                    };
                    buf.extend(data.chunks(channels).map(|frame| to_pcm(mix_down(frame))));
                    let overflow = buf.len().saturating_sub(MAX_BUFFERED_SAMPLES);
                    if overflow > 0 {
                        buf.drain(..overflow);
                    }
                    drop(buf);
                    buffer.ready.notify_one();
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Capture(e.to_string()))?;

        stream.play().map_err(|e| Error::Capture(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Block until `len` samples are available or `wait` elapses
    ///
    /// Returns `Ok(None)` on timeout so callers can check for shutdown.
    ///
    /// # Errors
    ///
    /// Returns error if capture is not running or the buffer lock is poisoned
    pub fn read_chunk(&self, len: usize, wait: Duration) -> Result<Option<Vec<i16>>> {
        if self.stream.is_none() {
            return Err(Error::Capture("capture not started".to_string()));
        }

        let deadline = Instant::now() + wait;
        let mut buf = self
            .buffer
            .samples
            .lock()
            .map_err(|_| Error::Capture("capture buffer poisoned".to_string()))?;

        while buf.len() < len {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            buf = self
                .buffer
                .ready
                .wait_timeout(buf, deadline - now)
                .map_err(|_| Error::Capture("capture buffer poisoned".to_string()))?
                .0;
        }

        Ok(Some(buf.drain(..len).collect()))
    }

    /// Get the sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::cast_precision_loss)]
fn mix_down(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().sum::<f32>() / frame.len() as f32
}

#[allow(clippy::cast_possible_truncation)]
fn to_pcm(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Convert 16-bit PCM samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Recognition(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Recognition(e.to_string()))?;
        }

        writer
            .finalize()
            .map_err(|e| Error::Recognition(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
