//! Inbound side of the peer link: plays received audio and forwards
//! received text to the host.

use crate::audio::{Waveform, pcm16_le_to_samples};
use crate::peer::EnvelopeHandler;
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use crate::pipeline::models::PlaybackSink;
use crate::pipeline::types::PeerEvent;
use crate::viseme::PlaybackClock;
use std::sync::Arc;

/// [`EnvelopeHandler`] that hands peer audio to a [`PlaybackSink`].
pub struct PeerRelay {
    clock: Arc<dyn PlaybackClock>,
    sample_rate: u32,
    lead_secs: f64,
    playback: Option<Arc<dyn PlaybackSink>>,
    events: Option<crossbeam_channel::Sender<PeerEvent>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl PeerRelay {
    /// `sample_rate` is the rate of the PCM16 payload in audio envelopes.
    pub fn new(clock: Arc<dyn PlaybackClock>, sample_rate: u32) -> Self {
        Self {
            clock,
            sample_rate,
            lead_secs: 0.0,
            playback: None,
            events: None,
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_playback(mut self, playback: Arc<dyn PlaybackSink>) -> Self {
        self.playback = Some(playback);
        self
    }

    pub fn with_lead(mut self, lead_secs: f64) -> Self {
        self.lead_secs = lead_secs;
        self
    }

    /// Forward every received item to `tx` (non-blocking).
    pub fn with_events(mut self, tx: crossbeam_channel::Sender<PeerEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    fn emit(&self, event: PeerEvent) {
        if let Some(tx) = &self.events
            && let Err(e) = tx.try_send(event)
        {
            self.reporter.report(
                "relay",
                &StationError::Recoverable(format!("peer event dropped: {}", e)),
            );
        }
    }
}

impl EnvelopeHandler for PeerRelay {
    fn on_audio(&mut self, audio: &[u8], _timestamp: u64) {
        let samples = pcm16_le_to_samples(audio);
        if samples.is_empty() {
            return;
        }
        let waveform = Waveform::new(samples, self.sample_rate);
        let start_at = self.clock.now() + self.lead_secs;

        if let Some(playback) = &self.playback
            && let Err(e) = playback.play(&waveform, start_at)
        {
            self.reporter
                .report("playback", &StationError::Recoverable(e.to_string()));
            return;
        }
        self.emit(PeerEvent::Audio {
            duration_secs: waveform.duration_secs(),
            start_at,
        });
    }

    fn on_transcript(&mut self, text: &str, language: &str, _timestamp: u64) {
        self.emit(PeerEvent::Transcript {
            text: text.to_string(),
            language: language.to_string(),
        });
    }

    fn on_translation(
        &mut self,
        original: &str,
        translated: &str,
        source_lang: &str,
        target_lang: &str,
        _timestamp: u64,
    ) {
        self.emit(PeerEvent::Translation {
            original: original.to_string(),
            translated: translated.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        });
    }
}
