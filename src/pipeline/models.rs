//! Capabilities the orchestrator consumes: model inference and playback.
//!
//! Each model returns a flat logits buffer of `steps × vocab_size()` scores
//! that the greedy decoder turns into symbols.

use crate::audio::Waveform;
use crate::error::{Result, VoxbridgeError};
use crate::features::FeatureMatrix;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Speech-to-text acoustic model.
#[async_trait]
pub trait AcousticModel: Send + Sync {
    async fn infer(&self, features: FeatureMatrix) -> Result<Vec<f32>>;

    /// Width of one decoding step in the logits buffer.
    fn vocab_size(&self) -> usize;

    fn name(&self) -> &str;
}

/// Text-to-text translation model.
#[async_trait]
pub trait TranslationModel: Send + Sync {
    async fn infer(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<Vec<f32>>;

    fn vocab_size(&self) -> usize;

    fn name(&self) -> &str;
}

/// Output of one synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutput {
    /// Phoneme-token logits, decoded with the synthesis vocabulary.
    pub logits: Vec<f32>,
    pub audio: Waveform,
    /// Seconds of speech in `audio`.
    pub duration_secs: f64,
}

/// Text-to-speech model.
#[async_trait]
pub trait SynthesisModel: Send + Sync {
    async fn infer(&self, text: &str, language: &str) -> Result<SynthesisOutput>;

    fn vocab_size(&self) -> usize;

    fn name(&self) -> &str;
}

/// Audio output. `start_at` is a reading of the shared playback clock, the
/// same offset given to the viseme scheduler.
pub trait PlaybackSink: Send + Sync {
    fn play(&self, audio: &Waveform, start_at: f64) -> Result<()>;
}

/// One-hot logits selecting `ids` in order, `vocab_size` scores per step.
pub fn one_hot_logits(ids: &[u32], vocab_size: usize) -> Vec<f32> {
    let mut logits = vec![0.0f32; ids.len() * vocab_size];
    for (step, &id) in ids.iter().enumerate() {
        let id = id as usize;
        if id < vocab_size {
            logits[step * vocab_size + id] = 1.0;
        }
    }
    logits
}

/// Mock acoustic model for testing
#[derive(Debug, Clone)]
pub struct MockAcousticModel {
    ids: Vec<u32>,
    vocab_size: usize,
    error: Option<String>,
    missing_resource: bool,
}

impl MockAcousticModel {
    /// Create a mock that always emits `ids`
    pub fn new(ids: Vec<u32>, vocab_size: usize) -> Self {
        Self {
            ids,
            vocab_size,
            error: None,
            missing_resource: false,
        }
    }

    /// Configure the mock to fail inference
    pub fn with_failure(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    /// Configure the mock to fail as if its weights were missing
    pub fn with_missing_resource(mut self) -> Self {
        self.missing_resource = true;
        self
    }
}

#[async_trait]
impl AcousticModel for MockAcousticModel {
    async fn infer(&self, _features: FeatureMatrix) -> Result<Vec<f32>> {
        mock_result(self.error.as_deref(), self.missing_resource, "stt")?;
        Ok(one_hot_logits(&self.ids, self.vocab_size))
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn name(&self) -> &str {
        "mock-acoustic"
    }
}

/// Mock translation model for testing
#[derive(Debug, Clone)]
pub struct MockTranslationModel {
    ids: Vec<u32>,
    vocab_size: usize,
    error: Option<String>,
    missing_resource: bool,
}

impl MockTranslationModel {
    /// Create a mock that always emits `ids`
    pub fn new(ids: Vec<u32>, vocab_size: usize) -> Self {
        Self {
            ids,
            vocab_size,
            error: None,
            missing_resource: false,
        }
    }

    /// Configure the mock to fail inference
    pub fn with_failure(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    /// Configure the mock to fail as if its weights were missing
    pub fn with_missing_resource(mut self) -> Self {
        self.missing_resource = true;
        self
    }
}

#[async_trait]
impl TranslationModel for MockTranslationModel {
    async fn infer(&self, _text: &str, _source_lang: &str, _target_lang: &str) -> Result<Vec<f32>> {
        mock_result(self.error.as_deref(), self.missing_resource, "mt")?;
        Ok(one_hot_logits(&self.ids, self.vocab_size))
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn name(&self) -> &str {
        "mock-translation"
    }
}

/// Mock synthesis model for testing
///
/// Produces silence of the configured duration.
#[derive(Debug, Clone)]
pub struct MockSynthesisModel {
    ids: Vec<u32>,
    vocab_size: usize,
    duration_secs: f64,
    sample_rate: u32,
    error: Option<String>,
}

impl MockSynthesisModel {
    /// Create a mock emitting `ids` and one second of 16 kHz silence
    pub fn new(ids: Vec<u32>, vocab_size: usize) -> Self {
        Self {
            ids,
            vocab_size,
            duration_secs: 1.0,
            sample_rate: 16000,
            error: None,
        }
    }

    /// Configure the length of the synthesized audio
    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    /// Configure the sample rate of the synthesized audio
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Configure the mock to fail inference
    pub fn with_failure(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }
}

#[async_trait]
impl SynthesisModel for MockSynthesisModel {
    async fn infer(&self, _text: &str, _language: &str) -> Result<SynthesisOutput> {
        mock_result(self.error.as_deref(), false, "tts")?;
        Ok(SynthesisOutput {
            logits: one_hot_logits(&self.ids, self.vocab_size),
            audio: Waveform::silence(self.duration_secs, self.sample_rate),
            duration_secs: self.duration_secs,
        })
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn name(&self) -> &str {
        "mock-synthesis"
    }
}

fn mock_result(error: Option<&str>, missing_resource: bool, stage: &str) -> Result<()> {
    if missing_resource {
        return Err(VoxbridgeError::Configuration {
            stage: stage.to_string(),
            message: "mock model weights not found".to_string(),
        });
    }
    match error {
        Some(message) => Err(VoxbridgeError::Inference {
            stage: stage.to_string(),
            message: message.to_string(),
        }),
        None => Ok(()),
    }
}

/// Playback sink that records what it was asked to play.
#[derive(Debug, Default)]
pub struct RecordingPlaybackSink {
    played: Mutex<Vec<(Waveform, f64)>>,
}

impl RecordingPlaybackSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(audio, start_at)` played so far.
    pub fn played(&self) -> Vec<(Waveform, f64)> {
        self.played
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl PlaybackSink for RecordingPlaybackSink {
    fn play(&self, audio: &Waveform, start_at: f64) -> Result<()> {
        self.played
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((audio.clone(), start_at));
        Ok(())
    }
}

impl<T: PlaybackSink> PlaybackSink for Arc<T> {
    fn play(&self, audio: &Waveform, start_at: f64) -> Result<()> {
        (**self).play(audio, start_at)
    }
}
