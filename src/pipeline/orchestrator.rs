//! Per-utterance pipeline: capture → features → STT → MT → TTS → visemes,
//! with transcripts, translations and audio forwarded to the peer.

use crate::audio::{CaptureSource, Waveform, samples_to_pcm16_le};
use crate::config::Config;
use crate::decode::{GreedyTokenDecoder, Vocabulary};
use crate::defaults;
use crate::error::{Result, VoxbridgeError};
use crate::features::{FeatureConfig, FeatureExtractor, FeatureMatrix, resample_linear};
use crate::peer::{MessageEnvelope, SendOutcome, SharedChannel};
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use crate::pipeline::models::{
    AcousticModel, PlaybackSink, SynthesisModel, SynthesisOutput, TranslationModel,
};
use crate::pipeline::relay::PeerRelay;
use crate::pipeline::types::{Stage, StageStatus, UtteranceReport};
use crate::translate::DictionaryTranslator;
use crate::viseme::{
    MonotonicClock, Phoneme, PlaybackClock, SharedScheduler, VisemeEvent, events_from_phonemes,
    generate,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Configuration for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub features: FeatureConfig,
    pub source_lang: String,
    pub target_lang: String,
    /// Seconds between scheduling and the first audible sample
    pub playback_lead_secs: f64,
    /// Rate of PCM16 audio in audio envelopes
    pub wire_sample_rate: u32,
    /// Longest stretch of audio per envelope, in seconds
    pub audio_chunk_secs: f64,
    /// Verbosity level (0=quiet, 1=per-utterance summary, 2=per-stage diagnostics)
    pub verbosity: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            source_lang: defaults::SOURCE_LANGUAGE.to_string(),
            target_lang: defaults::TARGET_LANGUAGE.to_string(),
            playback_lead_secs: 0.05,
            wire_sample_rate: defaults::SAMPLE_RATE,
            audio_chunk_secs: defaults::AUDIO_CHUNK_SECS,
            verbosity: 0,
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            features: config.features.clone(),
            source_lang: config.translation.source_lang.clone(),
            target_lang: config.translation.target_lang.clone(),
            playback_lead_secs: config.avatar.playback_lead_secs,
            wire_sample_rate: config.peer.audio_sample_rate,
            audio_chunk_secs: config.peer.audio_chunk_secs,
            verbosity: 0,
        }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// Wires the stages together. Capabilities are injected with `with_*`;
/// anything left out makes its stage skip or fall back.
///
/// Utterances may overlap. Each one is stamped with the generation current
/// when it starts; [`cancel`](Self::cancel) bumps the generation, and results
/// of older generations are neither animated, played nor sent.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    extractor: FeatureExtractor,
    decoder: GreedyTokenDecoder,
    acoustic: Option<Arc<dyn AcousticModel>>,
    translation: Option<Arc<dyn TranslationModel>>,
    synthesis: Option<Arc<dyn SynthesisModel>>,
    stt_vocab: Option<Vocabulary>,
    mt_vocab: Option<Vocabulary>,
    tts_vocab: Option<Vocabulary>,
    dictionary: DictionaryTranslator,
    scheduler: Option<SharedScheduler>,
    channel: Option<SharedChannel>,
    playback: Option<Arc<dyn PlaybackSink>>,
    clock: Arc<dyn PlaybackClock>,
    reporter: Arc<dyn ErrorReporter>,
    sequence: AtomicU64,
    /// Held while a result is committed, so `cancel()` and a commit never interleave.
    generation: Mutex<u64>,
}

impl PipelineOrchestrator {
    /// Fails only when the feature configuration is invalid.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let extractor = FeatureExtractor::new(config.features.clone())?;
        Ok(Self {
            config,
            extractor,
            decoder: GreedyTokenDecoder::new(),
            acoustic: None,
            translation: None,
            synthesis: None,
            stt_vocab: None,
            mt_vocab: None,
            tts_vocab: None,
            dictionary: DictionaryTranslator::builtin(),
            scheduler: None,
            channel: None,
            playback: None,
            clock: Arc::new(MonotonicClock::new()),
            reporter: Arc::new(LogReporter),
            sequence: AtomicU64::new(0),
            generation: Mutex::new(0),
        })
    }

    /// Build from a loaded [`Config`], reading the vocabularies and the
    /// dictionary file it names.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut orchestrator = Self::new(PipelineConfig::from_config(config))?;

        let load = |path: &Option<std::path::PathBuf>| -> Result<Option<Vocabulary>> {
            path.as_deref().map(Vocabulary::load).transpose()
        };
        orchestrator.stt_vocab = load(&config.decoder.stt_vocab)?;
        orchestrator.mt_vocab = load(&config.decoder.mt_vocab)?;
        orchestrator.tts_vocab = load(&config.decoder.tts_vocab)?;

        if let Some(path) = &config.translation.dictionary {
            orchestrator.dictionary = DictionaryTranslator::with_file(path)?;
        }
        Ok(orchestrator)
    }

    pub fn with_acoustic_model(mut self, model: Arc<dyn AcousticModel>) -> Self {
        self.acoustic = Some(model);
        self
    }

    pub fn with_translation_model(mut self, model: Arc<dyn TranslationModel>) -> Self {
        self.translation = Some(model);
        self
    }

    pub fn with_synthesis_model(mut self, model: Arc<dyn SynthesisModel>) -> Self {
        self.synthesis = Some(model);
        self
    }

    pub fn with_stt_vocabulary(mut self, vocab: Vocabulary) -> Self {
        self.stt_vocab = Some(vocab);
        self
    }

    pub fn with_mt_vocabulary(mut self, vocab: Vocabulary) -> Self {
        self.mt_vocab = Some(vocab);
        self
    }

    pub fn with_tts_vocabulary(mut self, vocab: Vocabulary) -> Self {
        self.tts_vocab = Some(vocab);
        self
    }

    pub fn with_dictionary(mut self, dictionary: DictionaryTranslator) -> Self {
        self.dictionary = dictionary;
        self
    }

    /// Attach the avatar scheduler. Its clock becomes the pipeline clock so
    /// audio and visemes share one time base.
    pub fn with_avatar(mut self, scheduler: SharedScheduler) -> Self {
        self.clock = Arc::clone(
            scheduler
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clock(),
        );
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_channel(mut self, channel: SharedChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_playback(mut self, playback: Arc<dyn PlaybackSink>) -> Self {
        self.playback = Some(playback);
        self
    }

    /// Sets the playback clock. [`with_avatar`](Self::with_avatar) overrides it.
    pub fn with_clock(mut self, clock: Arc<dyn PlaybackClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of `cancel()` calls so far.
    pub fn generation(&self) -> u64 {
        *self.generation.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inbound handler that plays peer audio through this pipeline's sink
    /// and clock. Install it with [`PeerMessageChannel::set_handler`].
    ///
    /// [`PeerMessageChannel::set_handler`]: crate::peer::PeerMessageChannel::set_handler
    pub fn relay(&self) -> PeerRelay {
        let relay = PeerRelay::new(Arc::clone(&self.clock), self.config.wire_sample_rate)
            .with_lead(self.config.playback_lead_secs)
            .with_reporter(Arc::clone(&self.reporter));
        match &self.playback {
            Some(playback) => relay.with_playback(Arc::clone(playback)),
            None => relay,
        }
    }

    /// Invalidate every in-flight utterance and return the avatar to rest.
    ///
    /// Once this returns, no result of an earlier utterance is started on the
    /// avatar, played or sent.
    pub fn cancel(&self) {
        let mut generation = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        *generation += 1;
        if let Some(scheduler) = &self.scheduler {
            scheduler.lock().unwrap_or_else(|e| e.into_inner()).stop();
        }
    }

    /// Capture one utterance from `source` and process it.
    pub async fn run_capture(&self, source: &mut dyn CaptureSource) -> Result<UtteranceReport> {
        source.start()?;
        let captured = source.read_all();
        let stopped = source.stop();
        let waveform = captured?;
        stopped?;
        Ok(self.process_utterance(&waveform).await)
    }

    /// Run every stage for one utterance. Stage failures degrade the result
    /// and are recorded in the report; they never abort the pipeline.
    pub async fn process_utterance(&self, waveform: &Waveform) -> UtteranceReport {
        let started = Instant::now();
        let utterance = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation();
        let mut report = UtteranceReport::new(utterance, generation);

        self.run_stages(waveform, generation, &mut report).await;

        if self.channel.is_some() && report.status(Stage::Send).is_none() {
            let status = if report.envelopes_sent == 0 && report.envelopes_dropped > 0 {
                StageStatus::Skipped("peer not connected".to_string())
            } else {
                StageStatus::Ok
            };
            report.record(Stage::Send, status);
        }
        report.elapsed = started.elapsed();

        if self.config.verbosity >= 1 {
            eprintln!(
                "[pipeline] #{} {:?} -> {:?} ({} visemes, {} sent, {:.0?}){}",
                utterance,
                report.transcript.as_deref().unwrap_or(""),
                report.translation.as_deref().unwrap_or(""),
                report.viseme_count,
                report.envelopes_sent,
                report.elapsed,
                if report.cancelled { " [cancelled]" } else { "" }
            );
        }
        report
    }

    async fn run_stages(&self, waveform: &Waveform, generation: u64, report: &mut UtteranceReport) {
        let features = match self
            .extractor
            .extract(&waveform.samples, waveform.sample_rate)
        {
            Ok(features) if features.is_empty() => {
                self.skip(report, Stage::Features, "audio shorter than one analysis frame");
                return;
            }
            Ok(features) => features,
            Err(e) => {
                self.fail(report, Stage::Features, &e);
                return;
            }
        };
        self.diagnostic(
            Stage::Features,
            format!(
                "{} frames x {} bands",
                features.num_frames(),
                features.num_bands()
            ),
        );
        report.record(Stage::Features, StageStatus::Ok);

        let transcript = match self.transcribe(features).await {
            Ok(text) if text.is_empty() => {
                self.skip(report, Stage::Transcription, "no speech decoded");
                return;
            }
            Ok(text) => text,
            Err(e) => {
                self.fail(report, Stage::Transcription, &e);
                return;
            }
        };
        self.diagnostic(Stage::Transcription, format!("{:?}", transcript));
        report.record(Stage::Transcription, StageStatus::Ok);
        report.transcript = Some(transcript.clone());
        if !self.send(
            generation,
            report,
            MessageEnvelope::transcript(transcript.as_str(), self.config.source_lang.as_str()),
        ) {
            return;
        }

        let Some(translated) = self.translate(&transcript, report).await else {
            return;
        };
        self.diagnostic(Stage::Translation, format!("{:?}", translated));
        report.translation = Some(translated.clone());
        if !self.send(
            generation,
            report,
            MessageEnvelope::translation(
                transcript.as_str(),
                translated.as_str(),
                self.config.source_lang.as_str(),
                self.config.target_lang.as_str(),
            ),
        ) {
            return;
        }

        let Some(model) = &self.synthesis else {
            self.skip(report, Stage::Synthesis, "no synthesis model configured");
            self.skip(report, Stage::Visemes, "no synthesized speech");
            return;
        };
        let output = match model.infer(&translated, &self.config.target_lang).await {
            Ok(output) => output,
            Err(e) => {
                self.fail(report, Stage::Synthesis, &e);
                self.skip(report, Stage::Visemes, "no synthesized speech");
                return;
            }
        };
        report.record(Stage::Synthesis, StageStatus::Ok);
        if self.discard_if_stale(generation, report) {
            return;
        }

        let duration = if output.duration_secs.is_finite() && output.duration_secs > 0.0 {
            output.duration_secs
        } else {
            output.audio.duration_secs()
        };
        report.audio_duration = Some(duration);

        let events = self.viseme_events(&translated, &output, model.vocab_size(), duration);
        report.viseme_count = events.len();
        let start_at = self.clock.now() + self.config.playback_lead_secs;
        report.scheduled_at = Some(start_at);

        match &self.scheduler {
            Some(_) if events.is_empty() => {
                self.skip(report, Stage::Visemes, "no phonemes to animate");
            }
            Some(scheduler) => {
                let started = self.commit(generation, report, || {
                    scheduler
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .start(&events, start_at)
                });
                if started.is_none() {
                    return;
                }
                self.diagnostic(
                    Stage::Visemes,
                    format!("{} events over {:.2}s at t={:.3}", events.len(), duration, start_at),
                );
                report.record(Stage::Visemes, StageStatus::Ok);
            }
            None => self.skip(report, Stage::Visemes, "no avatar attached"),
        }

        match &self.playback {
            Some(playback) => {
                match self.commit(generation, report, || playback.play(&output.audio, start_at)) {
                    Some(Ok(())) => report.record(Stage::Playback, StageStatus::Ok),
                    Some(Err(e)) => self.fail(report, Stage::Playback, &e),
                    None => return,
                }
            }
            None => self.skip(report, Stage::Playback, "no playback sink"),
        }

        self.send_audio(generation, report, &output.audio);
    }

    async fn transcribe(&self, features: FeatureMatrix) -> Result<String> {
        let model = self
            .acoustic
            .as_ref()
            .ok_or_else(|| missing(Stage::Transcription, "no acoustic model configured"))?;
        let vocab = self
            .stt_vocab
            .as_ref()
            .ok_or_else(|| missing(Stage::Transcription, "no vocabulary configured"))?;

        let logits = model.infer(features).await?;
        Ok(self.decoder.decode_text(
            &logits,
            model.vocab_size(),
            vocab,
            vocab.id_of(defaults::EOS_TOKEN),
        ))
    }

    /// Model translation, falling back to the dictionary when the model or
    /// its vocabulary is missing. `None` ends the utterance.
    async fn translate(&self, transcript: &str, report: &mut UtteranceReport) -> Option<String> {
        let (source, target) = (&self.config.source_lang, &self.config.target_lang);
        if source.eq_ignore_ascii_case(target) {
            self.skip(report, Stage::Translation, "source and target language match");
            return Some(transcript.to_string());
        }

        let reason = match (&self.translation, &self.mt_vocab) {
            (Some(model), Some(vocab)) => match model.infer(transcript, source, target).await {
                Ok(logits) => {
                    let text = self.decoder.decode_text(
                        &logits,
                        model.vocab_size(),
                        vocab,
                        vocab.id_of(defaults::EOS_TOKEN),
                    );
                    if !text.is_empty() {
                        report.record(Stage::Translation, StageStatus::Ok);
                        return Some(text);
                    }
                    "translation model produced no tokens".to_string()
                }
                Err(e) if e.is_configuration() => e.to_string(),
                Err(e) => {
                    self.fail(report, Stage::Translation, &e);
                    return None;
                }
            },
            (None, _) => "no translation model configured".to_string(),
            (Some(_), None) => "no translation vocabulary configured".to_string(),
        };

        match self.dictionary.translate(transcript, source, target) {
            Ok(text) => {
                self.diagnostic(Stage::Translation, format!("dictionary fallback: {}", reason));
                report.record(
                    Stage::Translation,
                    StageStatus::Fallback(format!("dictionary ({})", reason)),
                );
                Some(text)
            }
            Err(e) => {
                self.fail(report, Stage::Translation, &e);
                None
            }
        }
    }

    /// Visemes from the synthesis model's phoneme tokens when a vocabulary
    /// for them is loaded, else from the translated text.
    fn viseme_events(
        &self,
        text: &str,
        output: &SynthesisOutput,
        vocab_size: usize,
        duration: f64,
    ) -> Vec<VisemeEvent> {
        let language = self.config.target_lang.as_str();
        if let Some(vocab) = &self.tts_vocab {
            let symbols = self.decoder.decode(
                &output.logits,
                vocab_size,
                vocab,
                vocab.id_of(defaults::EOS_TOKEN),
            );
            if !symbols.is_empty() {
                let phonemes: Vec<Phoneme> = symbols
                    .into_iter()
                    .map(|symbol| Phoneme::new(symbol, language))
                    .collect();
                return events_from_phonemes(&phonemes, duration);
            }
        }
        generate(text, language, duration)
    }

    /// Send `envelope` unless `generation` was cancelled. Returns false when
    /// the utterance is stale.
    fn send(
        &self,
        generation: u64,
        report: &mut UtteranceReport,
        envelope: MessageEnvelope,
    ) -> bool {
        let Some(channel) = &self.channel else {
            return !self.discard_if_stale(generation, report);
        };
        let Some(outcome) = self.commit(generation, report, || {
            channel
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .send(&envelope)
        }) else {
            return false;
        };
        match outcome {
            Ok(SendOutcome::Sent { .. }) => report.envelopes_sent += 1,
            Ok(SendOutcome::Dropped) => report.envelopes_dropped += 1,
            Err(e) => {
                // The channel has already reported it.
                report.envelopes_dropped += 1;
                report.record(
                    Stage::Send,
                    StageStatus::Failed(format!("{} envelope: {}", envelope.type_name(), e)),
                );
            }
        }
        true
    }

    /// Resample to the wire rate and send in chunks of at most
    /// `audio_chunk_secs`.
    fn send_audio(&self, generation: u64, report: &mut UtteranceReport, audio: &Waveform) {
        if self.channel.is_none() || audio.is_empty() {
            return;
        }
        let rate = self.config.wire_sample_rate;
        let samples = if audio.sample_rate == rate || audio.sample_rate == 0 {
            audio.samples.clone()
        } else {
            resample_linear(&audio.samples, audio.sample_rate, rate)
        };

        let chunk_len = ((self.config.audio_chunk_secs * rate as f64) as usize).max(1);
        for chunk in samples.chunks(chunk_len) {
            if !self.send(
                generation,
                report,
                MessageEnvelope::audio(samples_to_pcm16_le(chunk)),
            ) {
                return;
            }
        }
    }

    fn discard_if_stale(&self, generation: u64, report: &mut UtteranceReport) -> bool {
        if self.generation() == generation {
            return false;
        }
        self.mark_cancelled(report);
        true
    }

    /// Run `action` while `generation` is current, with `cancel()` held off
    /// until it returns. `None` when the utterance was cancelled.
    fn commit<T>(
        &self,
        generation: u64,
        report: &mut UtteranceReport,
        action: impl FnOnce() -> T,
    ) -> Option<T> {
        let current = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        if *current != generation {
            drop(current);
            self.mark_cancelled(report);
            return None;
        }
        let result = action();
        drop(current);
        Some(result)
    }

    fn mark_cancelled(&self, report: &mut UtteranceReport) {
        report.cancelled = true;
        if self.config.verbosity >= 2 {
            eprintln!("[pipeline] #{} cancelled, results discarded", report.utterance);
        }
    }

    fn fail(&self, report: &mut UtteranceReport, stage: Stage, error: &VoxbridgeError) {
        self.reporter.report(
            stage.as_str(),
            &StationError::Recoverable(error.to_string()),
        );
        report.record(stage, StageStatus::Failed(error.to_string()));
    }

    fn skip(&self, report: &mut UtteranceReport, stage: Stage, reason: &str) {
        self.diagnostic(stage, format!("skipped: {}", reason));
        report.record(stage, StageStatus::Skipped(reason.to_string()));
    }

    fn diagnostic(&self, stage: Stage, message: String) {
        if self.config.verbosity >= 2 {
            eprintln!("[{}] {}", stage, message);
        }
    }
}

fn missing(stage: Stage, message: &str) -> VoxbridgeError {
    VoxbridgeError::Configuration {
        stage: stage.as_str().to_string(),
        message: message.to_string(),
    }
}
