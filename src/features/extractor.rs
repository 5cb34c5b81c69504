//! Waveform → normalized log-mel feature matrix.

use crate::defaults;
use crate::error::{Result, VoxbridgeError};
use crate::features::mel::MelFilterBank;
use crate::features::resample::resample_linear;
use crate::features::spectrum::{PowerSpectrum, hamming_window};
use serde::{Deserialize, Serialize};

/// Standard deviations below this are treated as a constant matrix.
const MIN_STD_DEV: f64 = 1e-8;

/// Front-end configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    /// Rate the waveform is resampled to before framing.
    pub sample_rate: u32,
    pub frame_size: usize,
    pub hop_size: usize,
    pub fft_size: usize,
    pub num_mels: usize,
    /// Lowest filterbank edge in Hz.
    pub f_min: f64,
    /// Highest filterbank edge in Hz; `None` means Nyquist.
    pub f_max: Option<f64>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            frame_size: defaults::FRAME_SIZE,
            hop_size: defaults::HOP_SIZE,
            fft_size: defaults::FFT_SIZE,
            num_mels: defaults::NUM_MELS,
            f_min: 0.0,
            f_max: None,
        }
    }
}

impl FeatureConfig {
    fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| VoxbridgeError::ConfigInvalidValue {
            key: format!("features.{key}"),
            message: message.to_string(),
        };

        if self.sample_rate == 0 {
            return Err(invalid("sample_rate", "must be positive"));
        }
        if self.frame_size == 0 {
            return Err(invalid("frame_size", "must be positive"));
        }
        if self.hop_size == 0 {
            return Err(invalid("hop_size", "must be positive"));
        }
        if self.fft_size < self.frame_size {
            return Err(invalid("fft_size", "must be at least frame_size"));
        }
        if self.num_mels == 0 {
            return Err(invalid("num_mels", "must be positive"));
        }
        let nyquist = self.sample_rate as f64 / 2.0;
        let f_max = self.f_max.unwrap_or(nyquist);
        if self.f_min < 0.0 || f_max <= self.f_min || f_max > nyquist {
            return Err(invalid("f_max", "filterbank range must lie within 0..=Nyquist"));
        }
        Ok(())
    }
}

/// Number of whole frames that fit in `len` samples.
///
/// `floor((len - frame_size) / hop_size) + 1`, or 0 when the signal is
/// shorter than one frame.
pub fn expected_num_frames(len: usize, frame_size: usize, hop_size: usize) -> usize {
    if len < frame_size || hop_size == 0 {
        0
    } else {
        (len - frame_size) / hop_size + 1
    }
}

/// `num_frames` feature vectors of `num_bands` values, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    num_frames: usize,
    num_bands: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    /// Build from a flat row-major buffer. `data.len()` must equal
    /// `num_frames * num_bands`.
    pub fn from_flat(num_frames: usize, num_bands: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != num_frames * num_bands {
            return Err(VoxbridgeError::Other(format!(
                "feature buffer holds {} values, expected {} x {}",
                data.len(),
                num_frames,
                num_bands
            )));
        }
        Ok(Self {
            num_frames,
            num_bands,
            data,
        })
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames == 0
    }

    /// Feature vector for one frame.
    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        if index >= self.num_frames {
            return None;
        }
        let start = index * self.num_bands;
        Some(&self.data[start..start + self.num_bands])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Mean and population standard deviation over every value.
    pub fn mean_and_std(&self) -> (f64, f64) {
        mean_and_std(&self.data)
    }
}

fn mean_and_std(values: &[f32]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

/// Z-score `values` in place with their own statistics.
///
/// A constant input (standard deviation ~0) is left unchanged.
pub fn normalize_in_place(values: &mut [f32]) {
    let (mean, std) = mean_and_std(values);
    if std < MIN_STD_DEV {
        return;
    }
    for v in values.iter_mut() {
        *v = ((*v as f64 - mean) / std) as f32;
    }
}

/// Acoustic front end: resample → frame → Hamming → power spectrum → log mel
/// → z-score.
///
/// Holds only precomputed tables, so one instance can serve concurrent
/// utterances through `&self`.
#[derive(Debug)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    window: Vec<f64>,
    spectrum: PowerSpectrum,
    filter_bank: MelFilterBank,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Result<Self> {
        config.validate()?;

        let f_max = config.f_max.unwrap_or(config.sample_rate as f64 / 2.0);
        let filter_bank = MelFilterBank::new(
            config.num_mels,
            config.fft_size,
            config.sample_rate,
            config.f_min,
            f_max,
        );

        Ok(Self {
            window: hamming_window(config.frame_size),
            spectrum: PowerSpectrum::new(config.fft_size),
            filter_bank,
            config,
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract normalized features from a mono waveform.
    pub fn extract(&self, waveform: &[f32], source_sample_rate: u32) -> Result<FeatureMatrix> {
        let mut matrix = self.extract_unnormalized(waveform, source_sample_rate)?;
        normalize_in_place(&mut matrix.data);
        Ok(matrix)
    }

    /// Everything up to and including the log mel energies.
    pub fn extract_unnormalized(
        &self,
        waveform: &[f32],
        source_sample_rate: u32,
    ) -> Result<FeatureMatrix> {
        if source_sample_rate == 0 {
            return Err(VoxbridgeError::AudioFormat {
                message: "source sample rate must be positive".to_string(),
            });
        }

        let resampled;
        let signal = if source_sample_rate == self.config.sample_rate {
            waveform
        } else {
            resampled = resample_linear(waveform, source_sample_rate, self.config.sample_rate);
            resampled.as_slice()
        };

        let frame_size = self.config.frame_size;
        let hop_size = self.config.hop_size;
        let num_frames = expected_num_frames(signal.len(), frame_size, hop_size);
        let num_bands = self.config.num_mels;

        let mut data = Vec::with_capacity(num_frames * num_bands);
        let mut frame = vec![0.0f64; frame_size];

        for index in 0..num_frames {
            let start = index * hop_size;
            for (n, slot) in frame.iter_mut().enumerate() {
                *slot = signal[start + n] as f64 * self.window[n];
            }

            let power = self.spectrum.compute(&frame);
            data.extend(
                self.filter_bank
                    .log_energies(&power)
                    .into_iter()
                    .map(|e| e as f32),
            );
        }

        FeatureMatrix::from_flat(num_frames, num_bands, data)
    }
}
