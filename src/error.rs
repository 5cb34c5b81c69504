//! Error types for voxbridge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxbridgeError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    /// A stage is missing a resource it needs (vocabulary, model).
    #[error("Missing resource for {stage}: {message}")]
    Configuration { stage: String, message: String },

    // Audio errors
    #[error("Audio format error: {message}")]
    AudioFormat { message: String },

    // Model errors
    #[error("Inference failed in {stage}: {message}")]
    Inference { stage: String, message: String },

    // Translation errors
    #[error("Unsupported language pair: {source_lang} -> {target_lang}")]
    UnsupportedPair {
        source_lang: String,
        target_lang: String,
    },

    // Peer messaging errors
    #[error("Failed to decode envelope: {message}")]
    Decode { message: String },

    #[error("Frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("Signal rejected: {message}")]
    SignalRejected { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl VoxbridgeError {
    /// True for errors a stage should answer with a fallback rather than an abort.
    pub fn is_configuration(&self) -> bool {
        matches!(self, VoxbridgeError::Configuration { .. })
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxbridgeError>;
