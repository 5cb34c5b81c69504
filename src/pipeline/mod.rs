//! Speech-translation pipeline.
//!
//! One utterance flows capture → features → STT → MT → TTS → visemes while
//! transcripts, translations and synthesized audio go out over the peer
//! channel. Inbound peer traffic is handled by [`PeerRelay`].

pub mod error;
pub mod models;
pub mod orchestrator;
pub mod relay;
pub mod types;

pub use error::{CollectingReporter, ErrorReporter, LogReporter, StationError};
pub use models::{
    AcousticModel, MockAcousticModel, MockSynthesisModel, MockTranslationModel, PlaybackSink,
    RecordingPlaybackSink, SynthesisModel, SynthesisOutput, TranslationModel, one_hot_logits,
};
pub use orchestrator::{PipelineConfig, PipelineOrchestrator};
pub use relay::PeerRelay;
pub use types::{PeerEvent, Stage, StageStatus, UtteranceReport};
