//! Linear-interpolation sample-rate conversion.
//!
//! No anti-aliasing filter is applied before decimation, so energy above the
//! target Nyquist folds back into the band. That is acceptable for feeding a
//! speech front end at 16 kHz; it is not a general purpose resampler.

/// Resample `samples` from `from_rate` to `to_rate`.
///
/// With `ratio = to_rate / from_rate` the output has `ceil(len * ratio)`
/// samples. Output sample `i` reads position `i / ratio` in the input and
/// blends the two neighbouring samples by the fractional distance; the last
/// input sample is held at the tail.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let last = samples.len() - 1;

    (0..output_len)
        .map(|i| {
            let orig = i as f64 / ratio;
            let idx = (orig.floor() as usize).min(last);
            let fraction = orig - idx as f64;

            if idx >= last {
                samples[last]
            } else {
                let left = samples[idx] as f64;
                let right = samples[idx + 1] as f64;
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_rates_match() {
        let samples = vec![0.1, -0.2, 0.3, -0.4];
        assert_eq!(resample_linear(&samples, 16000, 16000), samples);
    }

    #[test]
    fn upsample_doubles_length_and_interpolates() {
        let samples = vec![0.0, 1.0, 2.0];
        let resampled = resample_linear(&samples, 8000, 16000);

        assert_eq!(resampled.len(), 6);
        assert_eq!(resampled[0], 0.0);
        assert!((resampled[1] - 0.5).abs() < 1e-6);
        assert_eq!(resampled[2], 1.0);
        assert!((resampled[3] - 1.5).abs() < 1e-6);
        // Tail holds the last sample
        assert_eq!(resampled[5], 2.0);
    }

    #[test]
    fn downsample_thirds_length() {
        let samples = vec![0.25f32; 48000];
        let resampled = resample_linear(&samples, 48000, 16000);

        assert_eq!(resampled.len(), 16000);
        assert!(resampled.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn downsample_picks_every_third_sample_of_a_ramp() {
        let samples: Vec<f32> = (0..9).map(|i| i as f32).collect();
        let resampled = resample_linear(&samples, 48000, 16000);

        assert_eq!(resampled, vec![0.0, 3.0, 6.0]);
    }

    #[test]
    fn non_integer_ratio_length() {
        let samples = vec![0.0f32; 44100];
        let resampled = resample_linear(&samples, 44100, 16000);
        // ceil() may round up by one sample on an inexact ratio
        assert!((16000..=16001).contains(&resampled.len()));
    }

    #[test]
    fn handles_edge_cases() {
        assert!(resample_linear(&[], 16000, 8000).is_empty());

        let single = resample_linear(&[0.7], 16000, 8000);
        assert_eq!(single, vec![0.7]);
    }
}
