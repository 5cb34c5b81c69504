//! Per-utterance results.

use std::fmt;
use std::time::Duration;

/// Pipeline stages, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Features,
    Transcription,
    Translation,
    Synthesis,
    Visemes,
    Playback,
    Send,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Features => "features",
            Stage::Transcription => "stt",
            Stage::Translation => "mt",
            Stage::Synthesis => "tts",
            Stage::Visemes => "visemes",
            Stage::Playback => "playback",
            Stage::Send => "send",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one stage ended for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum StageStatus {
    Ok,
    /// Ran a degraded path instead (e.g. dictionary translation).
    Fallback(String),
    /// Did not run.
    Skipped(String),
    Failed(String),
}

impl StageStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, StageStatus::Ok)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageStatus::Failed(_))
    }
}

/// Structured outcome of one utterance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UtteranceReport {
    /// Sequence number of the utterance, starting at 1.
    pub utterance: u64,
    /// Cancel generation the utterance started under.
    pub generation: u64,
    pub transcript: Option<String>,
    pub translation: Option<String>,
    pub viseme_count: usize,
    /// Seconds of synthesized speech.
    pub audio_duration: Option<f64>,
    /// Clock reading the audio and visemes were scheduled at.
    pub scheduled_at: Option<f64>,
    pub envelopes_sent: usize,
    pub envelopes_dropped: usize,
    /// `cancel()` was called while this utterance was in flight.
    pub cancelled: bool,
    pub stages: Vec<(Stage, StageStatus)>,
    pub elapsed: Duration,
}

impl UtteranceReport {
    pub fn new(utterance: u64, generation: u64) -> Self {
        Self {
            utterance,
            generation,
            ..Self::default()
        }
    }

    pub fn record(&mut self, stage: Stage, status: StageStatus) {
        self.stages.push((stage, status));
    }

    /// Last status recorded for `stage`.
    pub fn status(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages
            .iter()
            .rev()
            .find(|(s, _)| *s == stage)
            .map(|(_, status)| status)
    }

    /// True when no stage failed and the utterance was not cancelled.
    pub fn is_success(&self) -> bool {
        !self.cancelled && !self.stages.iter().any(|(_, status)| status.is_failed())
    }
}

/// Text received from the peer, forwarded to the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    Transcript {
        text: String,
        language: String,
    },
    Translation {
        original: String,
        translated: String,
        source_lang: String,
        target_lang: String,
    },
    /// Inbound audio handed to playback.
    Audio { duration_secs: f64, start_at: f64 },
}
