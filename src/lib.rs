//! voxbridge - Streaming speech-translation core
//!
//! Turns captured speech into translated speech and avatar lip-sync, and
//! exchanges transcripts, translations and audio with a remote peer.

// Library code propagates errors instead of panicking
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod decode;
pub mod defaults;
pub mod error;
pub mod features;
pub mod peer;
pub mod pipeline;
pub mod translate;
pub mod viseme;

// Core stages
pub use decode::{GreedyTokenDecoder, Vocabulary};
pub use features::{FeatureConfig, FeatureExtractor, FeatureMatrix};
pub use viseme::{VisemeEvent, VisemeId, VisemeScheduler};

// Peer messaging
pub use peer::{MessageEnvelope, PeerMessageChannel, Transport};

// Pipeline
pub use pipeline::{PipelineConfig, PipelineOrchestrator, UtteranceReport};

// Error handling
pub use error::{Result, VoxbridgeError};

// Config
pub use config::Config;

// Error reporting (for hosts that route diagnostics elsewhere)
pub use pipeline::error::{ErrorReporter, StationError};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
