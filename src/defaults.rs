//! Default configuration constants for voxbridge.
//!
//! Shared by the configuration types and the stages so that a value is only
//! defined once.

/// Sample rate the acoustic front end works at, in Hz.
pub const SAMPLE_RATE: u32 = 16000;

/// Analysis window length in samples (25 ms at 16 kHz).
pub const FRAME_SIZE: usize = 400;

/// Hop between consecutive windows in samples (10 ms at 16 kHz).
pub const HOP_SIZE: usize = 160;

/// Transform length. Frames are zero-padded up to this size.
pub const FFT_SIZE: usize = 512;

/// Number of mel bands per feature vector.
pub const NUM_MELS: usize = 80;

/// Floor applied before the log so silent bands stay finite.
pub const LOG_EPSILON: f64 = 1e-10;

/// Default source language of the local speaker.
pub const SOURCE_LANGUAGE: &str = "en";

/// Default language the peer wants to hear.
pub const TARGET_LANGUAGE: &str = "es";

/// Largest single frame accepted from a stream transport (16 MiB).
///
/// Callers are expected to chunk audio well below this.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Longest stretch of audio one envelope carries, in seconds.
pub const AUDIO_CHUNK_SECS: f64 = 1.0;

/// Default TCP address for the peer link.
pub const PEER_ADDR: &str = "127.0.0.1:7878";

/// Reserved vocabulary symbols that never reach the final text.
pub const SOS_TOKEN: &str = "<sos>";
pub const EOS_TOKEN: &str = "<eos>";
pub const UNK_TOKEN: &str = "<unk>";
pub const PAD_TOKEN: &str = "<pad>";
