//! HTK mel scale and triangular filterbank.
//!
//! `mel = 2595 × log10(1 + freq / 700)`

use crate::defaults::LOG_EPSILON;

/// Convert frequency in Hz to mel.
pub fn hz_to_mel(freq: f64) -> f64 {
    2595.0 * (1.0 + freq / 700.0).log10()
}

/// Convert mel to frequency in Hz.
pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank over `fft_size / 2` power-spectrum bins.
#[derive(Debug, Clone)]
pub struct MelFilterBank {
    /// One weight row per band, each `num_bins` long.
    weights: Vec<Vec<f64>>,
}

impl MelFilterBank {
    pub fn new(num_mels: usize, fft_size: usize, sample_rate: u32, f_min: f64, f_max: f64) -> Self {
        let num_bins = fft_size / 2;

        let bin_freqs: Vec<f64> = (0..num_bins)
            .map(|k| k as f64 * sample_rate as f64 / fft_size as f64)
            .collect();

        let mel_min = hz_to_mel(f_min);
        let mel_max = hz_to_mel(f_max);
        let num_points = num_mels + 2;
        let edges: Vec<f64> = (0..num_points)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (num_points - 1) as f64))
            .collect();

        let mut weights = vec![vec![0.0; num_bins]; num_mels];
        for (band, row) in weights.iter_mut().enumerate() {
            let lower = edges[band];
            let center = edges[band + 1];
            let upper = edges[band + 2];

            for (k, &freq) in bin_freqs.iter().enumerate() {
                if freq >= lower && freq <= center && center > lower {
                    row[k] = (freq - lower) / (center - lower);
                } else if freq > center && freq <= upper && upper > center {
                    row[k] = (upper - freq) / (upper - center);
                }
            }
        }

        Self { weights }
    }

    pub fn num_mels(&self) -> usize {
        self.weights.len()
    }

    pub fn num_bins(&self) -> usize {
        self.weights.first().map(|row| row.len()).unwrap_or(0)
    }

    /// Weight row for one band.
    pub fn band(&self, index: usize) -> Option<&[f64]> {
        self.weights.get(index).map(|row| row.as_slice())
    }

    /// Log band energies `ln(max(Σ w·p, ε))` for one power spectrum.
    pub fn log_energies(&self, power: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|row| {
                let sum: f64 = row.iter().zip(power).map(|(w, p)| w * p).sum();
                sum.max(LOG_EPSILON).ln()
            })
            .collect()
    }
}
