//! Windowing and power spectrum.

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::f64::consts::PI;
use std::sync::Arc;

/// Symmetric Hamming window: `0.54 - 0.46 * cos(2πn / (N - 1))`.
pub fn hamming_window(size: usize) -> Vec<f64> {
    if size == 1 {
        return vec![1.0];
    }
    let denom = (size - 1) as f64;
    (0..size)
        .map(|n| 0.54 - 0.46 * (2.0 * PI * n as f64 / denom).cos())
        .collect()
}

/// Power spectrum of one windowed frame over `fft_size / 2` bins.
///
/// The frame is zero-padded to `fft_size` and transformed with a forward FFT,
/// so bin `k` holds `re² + im²` with `θ = -2πkn / fft_size`. Bins are in
/// ascending frequency order.
pub struct PowerSpectrum {
    fft: Arc<dyn Fft<f64>>,
    fft_size: usize,
}

impl PowerSpectrum {
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            fft: planner.plan_fft_forward(fft_size),
            fft_size,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of output bins.
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2
    }

    /// Compute the power spectrum of `frame` (already windowed).
    ///
    /// Samples past `fft_size` are ignored; shorter frames are zero-padded.
    pub fn compute(&self, frame: &[f64]) -> Vec<f64> {
        let mut buffer: Vec<Complex<f64>> = (0..self.fft_size)
            .map(|n| Complex::new(frame.get(n).copied().unwrap_or(0.0), 0.0))
            .collect();

        self.fft.process(&mut buffer);

        buffer[..self.num_bins()]
            .iter()
            .map(|c| c.norm_sqr())
            .collect()
    }
}

impl std::fmt::Debug for PowerSpectrum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerSpectrum")
            .field("fft_size", &self.fft_size)
            .finish()
    }
}

/// Reference O(fft_size · frame_len) summation of the same spectrum.
///
/// Kept to cross-check the FFT path.
pub fn power_spectrum_direct(frame: &[f64], fft_size: usize) -> Vec<f64> {
    let len = frame.len().min(fft_size);
    (0..fft_size / 2)
        .map(|k| {
            let mut real = 0.0;
            let mut imag = 0.0;
            for (n, &x) in frame[..len].iter().enumerate() {
                let theta = -2.0 * PI * k as f64 * n as f64 / fft_size as f64;
                real += x * theta.cos();
                imag += x * theta.sin();
            }
            real * real + imag * imag
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_window_endpoints_and_peak() {
        let window = hamming_window(401);
        assert_eq!(window.len(), 401);
        assert!((window[0] - 0.08).abs() < 1e-9);
        assert!((window[400] - 0.08).abs() < 1e-9);
        assert!((window[200] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn hamming_window_is_symmetric() {
        let window = hamming_window(400);
        for n in 0..200 {
            assert!((window[n] - window[399 - n]).abs() < 1e-12);
        }
    }

    #[test]
    fn hamming_window_single_sample() {
        assert_eq!(hamming_window(1), vec![1.0]);
    }

    #[test]
    fn fft_matches_direct_summation() {
        let frame: Vec<f64> = (0..400)
            .map(|n| (n as f64 * 0.05).sin() + 0.3 * (n as f64 * 0.71).cos())
            .collect();

        let spectrum = PowerSpectrum::new(512);
        let fast = spectrum.compute(&frame);
        let slow = power_spectrum_direct(&frame, 512);

        assert_eq!(fast.len(), 256);
        assert_eq!(slow.len(), 256);
        for (k, (a, b)) in fast.iter().zip(slow.iter()).enumerate() {
            let tolerance = 1e-6 * b.abs().max(1.0);
            assert!((a - b).abs() < tolerance, "bin {k}: fft {a} vs direct {b}");
        }
    }

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        let fft_size = 512;
        let bin = 32;
        let frame: Vec<f64> = (0..fft_size)
            .map(|n| (2.0 * PI * bin as f64 * n as f64 / fft_size as f64).cos())
            .collect();

        let power = PowerSpectrum::new(fft_size).compute(&frame);
        let peak = power
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (k, &p)| if p > best.1 { (k, p) } else { best });

        assert_eq!(peak.0, bin);
    }

    #[test]
    fn silence_has_zero_power() {
        let power = PowerSpectrum::new(512).compute(&[0.0; 400]);
        assert!(power.iter().all(|&p| p == 0.0));
    }
}
