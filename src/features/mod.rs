//! Acoustic front end.
//!
//! ```text
//! waveform ─▶ resample ─▶ frame ─▶ Hamming ─▶ |FFT|² ─▶ log mel ─▶ z-score ─▶ FeatureMatrix
//! ```

pub mod extractor;
pub mod mel;
pub mod resample;
pub mod spectrum;

pub use extractor::{
    FeatureConfig, FeatureExtractor, FeatureMatrix, expected_num_frames, normalize_in_place,
};
pub use mel::MelFilterBank;
pub use resample::resample_linear;
pub use spectrum::{PowerSpectrum, hamming_window, power_spectrum_direct};
