//! Avatar lip-sync: text to timed mouth shapes, played back against a clock.

pub mod phonemes;
pub mod scheduler;
pub mod timeline;
pub mod types;

pub use phonemes::{SUPPORTED_LANGUAGES, phonemize, viseme_for};
pub use scheduler::{
    ChannelListener, ManualClock, MonotonicClock, PlaybackClock, SchedulerState, SharedScheduler,
    VisemeChange, VisemeListener, VisemeScheduler,
};
pub use timeline::{events_from_phonemes, generate, total_span};
pub use types::{Phoneme, VisemeEvent, VisemeId};
