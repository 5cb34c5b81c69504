//! Captured mono audio.

/// Mono `f32` samples in `[-1.0, 1.0]` at a declared rate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// `duration_secs` of silence.
    pub fn silence(duration_secs: f64, sample_rate: u32) -> Self {
        let len = (duration_secs.max(0.0) * sample_rate as f64).round() as usize;
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds; zero when the rate is unknown.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Append another chunk captured at the same rate.
    pub fn extend(&mut self, other: &Waveform) {
        self.samples.extend_from_slice(&other.samples);
    }

    /// Split into consecutive chunks of at most `chunk_len` samples.
    pub fn chunks(&self, chunk_len: usize) -> Vec<Waveform> {
        if chunk_len == 0 {
            return Vec::new();
        }
        self.samples
            .chunks(chunk_len)
            .map(|c| Waveform::new(c.to_vec(), self.sample_rate))
            .collect()
    }
}
