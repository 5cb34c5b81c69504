//! TOML configuration with defaults and environment overrides.

use crate::defaults;
use crate::features::FeatureConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub features: FeatureConfig,
    pub decoder: DecoderConfig,
    pub translation: TranslationConfig,
    pub avatar: AvatarConfig,
    pub peer: PeerConfig,
}

/// Vocabulary files for the three decoding stages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DecoderConfig {
    pub stt_vocab: Option<PathBuf>,
    pub mt_vocab: Option<PathBuf>,
    pub tts_vocab: Option<PathBuf>,
}

/// Language pair configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationConfig {
    pub source_lang: String,
    pub target_lang: String,
    /// Extra dictionary entries merged over the built-in table
    pub dictionary: Option<PathBuf>,
}

/// Avatar animation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AvatarConfig {
    /// Seconds between scheduling the timeline and the first audible sample
    pub playback_lead_secs: f64,
}

/// Peer link configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PeerConfig {
    pub addr: String,
    pub max_frame_bytes: usize,
    /// Rate of the PCM16 audio carried in audio envelopes
    pub audio_sample_rate: u32,
    /// Longest stretch of audio carried by one envelope, in seconds
    pub audio_chunk_secs: f64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_lang: defaults::SOURCE_LANGUAGE.to_string(),
            target_lang: defaults::TARGET_LANGUAGE.to_string(),
            dictionary: None,
        }
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            playback_lead_secs: 0.05,
        }
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            addr: defaults::PEER_ADDR.to_string(),
            max_frame_bytes: defaults::MAX_FRAME_BYTES,
            audio_sample_rate: defaults::SAMPLE_RATE,
            audio_chunk_secs: defaults::AUDIO_CHUNK_SECS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Any other failure (unreadable file, invalid TOML) is returned.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXBRIDGE_SOURCE_LANG → translation.source_lang
    /// - VOXBRIDGE_TARGET_LANG → translation.target_lang
    /// - VOXBRIDGE_PEER_ADDR → peer.addr
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(lang) = std::env::var("VOXBRIDGE_SOURCE_LANG")
            && !lang.is_empty()
        {
            self.translation.source_lang = lang;
        }

        if let Ok(lang) = std::env::var("VOXBRIDGE_TARGET_LANG")
            && !lang.is_empty()
        {
            self.translation.target_lang = lang;
        }

        if let Ok(addr) = std::env::var("VOXBRIDGE_PEER_ADDR")
            && !addr.is_empty()
        {
            self.peer.addr = addr;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxbridge/config.toml on Linux, or None when the
    /// platform has no config directory.
    #[cfg(feature = "cli")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("voxbridge").join("config.toml"))
    }
}
