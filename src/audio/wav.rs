//! WAV file input and output.

use crate::audio::source::CaptureSource;
use crate::audio::waveform::Waveform;
use crate::error::{Result, VoxbridgeError};
use std::io::{Read, Seek, Write};
use std::path::Path;

/// Decode WAV data into a mono waveform at the file's own sample rate.
///
/// Integer and float formats are accepted; channels are averaged.
pub fn read_wav<R: Read>(reader: R) -> Result<Waveform> {
    let mut wav_reader = hound::WavReader::new(reader).map_err(|e| VoxbridgeError::AudioFormat {
        message: format!("Failed to parse WAV file: {}", e),
    })?;

    let spec = wav_reader.spec();
    if spec.channels == 0 {
        return Err(VoxbridgeError::AudioFormat {
            message: "WAV file declares zero channels".to_string(),
        });
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => wav_reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>(),
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            wav_reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
        }
    }
    .map_err(|e| VoxbridgeError::AudioFormat {
        message: format!("Failed to read WAV samples: {}", e),
    })?;

    Ok(Waveform::new(
        downmix(&interleaved, spec.channels as usize),
        spec.sample_rate,
    ))
}

/// Read a WAV file from disk.
pub fn load_wav(path: &Path) -> Result<Waveform> {
    let file = std::fs::File::open(path)?;
    read_wav(std::io::BufReader::new(file))
}

/// Encode a waveform as 16-bit mono WAV.
pub fn write_wav<W: Write + Seek>(writer: W, waveform: &Waveform) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let to_format_err = |e: hound::Error| VoxbridgeError::AudioFormat {
        message: format!("Failed to write WAV: {}", e),
    };

    let mut wav_writer = hound::WavWriter::new(writer, spec).map_err(to_format_err)?;
    for &sample in &waveform.samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        wav_writer.write_sample(value).map_err(to_format_err)?;
    }
    wav_writer.finalize().map_err(to_format_err)
}

/// Average interleaved frames down to one channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Capture source that replays a decoded WAV file in fixed-size chunks.
pub struct WavCaptureSource {
    waveform: Waveform,
    position: usize,
    chunk_size: usize,
}

impl WavCaptureSource {
    /// 100 ms chunks at the file's rate.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::from_waveform(read_wav(reader)?))
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_waveform(load_wav(path)?))
    }

    pub fn from_waveform(waveform: Waveform) -> Self {
        let chunk_size = (waveform.sample_rate as usize / 10).max(1);
        Self {
            waveform,
            position: 0,
            chunk_size,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Consume the source and return the whole waveform.
    pub fn into_waveform(self) -> Waveform {
        self.waveform
    }
}

impl CaptureSource for WavCaptureSource {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_chunk(&mut self) -> Result<Option<Waveform>> {
        if self.position >= self.waveform.len() {
            return Ok(None);
        }

        let end = std::cmp::min(self.position + self.chunk_size, self.waveform.len());
        let chunk = self.waveform.samples[self.position..end].to_vec();
        self.position = end;

        Ok(Some(Waveform::new(chunk, self.waveform.sample_rate)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_wav_data(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn read_wav_mono_keeps_rate_and_scales() {
        let wav_data = make_wav_data(16000, 1, &[0, 16384, -16384, i16::MIN]);

        let wave = read_wav(Cursor::new(wav_data)).unwrap();

        assert_eq!(wave.sample_rate, 16000);
        assert_eq!(wave.samples, vec![0.0, 0.5, -0.5, -1.0]);
    }

    #[test]
    fn read_wav_stereo_downmixes_to_mono() {
        // Stereo pairs: (16384, 0), (-16384, -16384)
        let wav_data = make_wav_data(44100, 2, &[16384, 0, -16384, -16384]);

        let wave = read_wav(Cursor::new(wav_data)).unwrap();

        assert_eq!(wave.sample_rate, 44100);
        assert_eq!(wave.samples, vec![0.25, -0.5]);
    }

    #[test]
    fn read_wav_float_format() {
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for s in [0.25f32, -0.75] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let wave = read_wav(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(wave.samples, vec![0.25, -0.75]);
    }

    #[test]
    fn read_wav_rejects_garbage() {
        let err = read_wav(Cursor::new(b"definitely not a wav".to_vec())).unwrap_err();
        assert!(matches!(err, VoxbridgeError::AudioFormat { .. }));
    }

    #[test]
    fn write_then_read_preserves_shape() {
        let wave = Waveform::new(vec![0.0, 0.5, -0.5], 22050);
        let mut cursor = Cursor::new(Vec::new());
        write_wav(&mut cursor, &wave).unwrap();

        let back = read_wav(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(back.sample_rate, 22050);
        assert_eq!(back.len(), 3);
        for (a, b) in wave.samples.iter().zip(&back.samples) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn downmix_averages_channels() {
        assert_eq!(downmix(&[1.0, 0.0, 0.0, 0.0, 0.5, 1.0], 3), vec![1.0 / 3.0, 0.5]);
        assert_eq!(downmix(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn capture_source_returns_chunks_of_correct_size() {
        let wav_data = make_wav_data(16000, 1, &vec![1i16; 5000]);
        let mut source = WavCaptureSource::from_reader(Cursor::new(wav_data)).unwrap();

        let sizes: Vec<usize> = std::iter::from_fn(|| source.next_chunk().unwrap())
            .map(|c| c.len())
            .collect();

        // 5000 = 3 * 1600 + 200
        assert_eq!(sizes, vec![1600, 1600, 1600, 200]);
        assert!(source.next_chunk().unwrap().is_none());
    }

    #[test]
    fn capture_source_custom_chunk_size() {
        let mut source =
            WavCaptureSource::from_waveform(Waveform::new(vec![0.0; 10], 16000)).with_chunk_size(4);
        assert_eq!(source.next_chunk().unwrap().unwrap().len(), 4);
        assert_eq!(source.read_all().unwrap().len(), 6);
    }

    #[test]
    fn load_wav_reports_missing_file() {
        let err = load_wav(Path::new("/nonexistent/voxbridge.wav")).unwrap_err();
        assert!(matches!(err, VoxbridgeError::Io(_)));
    }
}
