//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;

use jarvis::voice::{
    CHUNK_SAMPLES, SAMPLE_RATE, SegmenterState, SpeechSegmenter, Utterance, rms, samples_to_wav,
};

mod common;

/// Generate sine wave audio samples
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<i16> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let v = amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin();
            (v * f32::from(i16::MAX)) as i16
        })
        .collect()
}

/// Generate silence
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn generate_silence(duration_secs: f32) -> Vec<i16> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0; num_samples]
}

/// Feed audio in capture-sized chunks, collecting finished segments
fn feed(segmenter: &mut SpeechSegmenter, samples: &[i16]) -> Vec<Vec<i16>> {
    samples
        .chunks(CHUNK_SAMPLES)
        .filter_map(|chunk| segmenter.process(chunk))
        .collect()
}

#[test]
fn test_silence_stays_idle() {
    let mut segmenter = SpeechSegmenter::new();

    assert!(feed(&mut segmenter, &generate_silence(2.0)).is_empty());
    assert_eq!(segmenter.state(), SegmenterState::Idle);
}

#[test]
fn test_speech_then_silence_yields_one_segment() {
    let mut segmenter = SpeechSegmenter::new();

    let speech = generate_sine_samples(440.0, 0.5, 0.3);
    assert!(feed(&mut segmenter, &speech).is_empty());
    assert_eq!(segmenter.state(), SegmenterState::Listening);

    let segments = feed(&mut segmenter, &generate_silence(1.0));
    assert_eq!(segments.len(), 1);
    assert!(segments[0].len() > speech.len());
    assert_eq!(segmenter.state(), SegmenterState::Idle);
}

#[test]
fn test_two_phrases_two_segments() {
    let mut segmenter = SpeechSegmenter::new();

    let mut audio = generate_sine_samples(300.0, 0.6, 0.3);
    audio.extend(generate_silence(1.0));
    audio.extend(generate_sine_samples(500.0, 0.6, 0.3));
    audio.extend(generate_silence(1.0));

    assert_eq!(feed(&mut segmenter, &audio).len(), 2);
}

#[test]
fn test_short_click_is_not_a_segment() {
    let mut segmenter = SpeechSegmenter::new();

    let mut audio = generate_sine_samples(440.0, 0.125, 0.3);
    audio.extend(generate_silence(1.0));

    assert!(feed(&mut segmenter, &audio).is_empty());
    assert_eq!(segmenter.state(), SegmenterState::Idle);
}

#[test]
fn test_rms_levels() {
    assert!(rms(&[]).abs() < f32::EPSILON);
    assert!(rms(&generate_silence(0.1)).abs() < f32::EPSILON);

    // sine RMS is amplitude / sqrt(2)
    let level = rms(&generate_sine_samples(440.0, 0.5, 0.5));
    assert!((level - 0.5 / 2.0_f32.sqrt()).abs() < 0.01, "{level}");
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");
    // WAV header is 44 bytes
    assert!(wav_data.len() > 44);
}

#[test]
fn test_wav_roundtrip() {
    let original_samples: Vec<i16> = vec![0, 16384, -16384, i16::MAX, i16::MIN, 8192];
    let wav_data = samples_to_wav(&original_samples, SAMPLE_RATE).unwrap();

    let cursor = Cursor::new(wav_data);
    let mut reader = hound::WavReader::new(cursor).unwrap();

    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    let read_samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read_samples, original_samples);
}

#[test]
fn test_utterance_normalization() {
    let utterance = Utterance::now("  Джарвис, КОТОРЫЙ час  ");
    assert_eq!(utterance.text, "джарвис, который час");
}
