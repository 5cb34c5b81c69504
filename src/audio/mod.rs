//! Audio capture helpers, WAV I/O and payload encoding.

pub mod pcm;
pub mod source;
pub mod wav;
pub mod waveform;

pub use pcm::{i16_to_f32, pcm16_le_to_samples, samples_to_pcm16_le};
pub use source::{CaptureSource, MockCaptureSource};
pub use wav::{WavCaptureSource, downmix, load_wav, read_wav, write_wav};
pub use waveform::Waveform;
