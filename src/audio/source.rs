use crate::audio::waveform::Waveform;
use crate::defaults;
use crate::error::{Result, VoxbridgeError};
use std::collections::VecDeque;

/// Pull-based source of captured audio chunks.
///
/// This trait allows swapping implementations (microphone, file, mock).
pub trait CaptureSource: Send {
    /// Start capturing.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing.
    fn stop(&mut self) -> Result<()>;

    /// Next chunk of audio, or `None` once the source is exhausted.
    fn next_chunk(&mut self) -> Result<Option<Waveform>>;

    /// Drain the source into one waveform.
    fn read_all(&mut self) -> Result<Waveform> {
        let mut all: Option<Waveform> = None;
        while let Some(chunk) = self.next_chunk()? {
            match all.as_mut() {
                Some(acc) if acc.sample_rate != chunk.sample_rate => {
                    return Err(VoxbridgeError::AudioFormat {
                        message: format!(
                            "sample rate changed mid-capture: {} Hz -> {} Hz",
                            acc.sample_rate, chunk.sample_rate
                        ),
                    });
                }
                Some(acc) => acc.extend(&chunk),
                None => all = Some(chunk),
            }
        }
        Ok(all.unwrap_or_else(|| Waveform::new(Vec::new(), defaults::SAMPLE_RATE)))
    }
}

/// Mock capture source for testing
#[derive(Debug, Clone)]
pub struct MockCaptureSource {
    is_started: bool,
    chunks: VecDeque<Waveform>,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockCaptureSource {
    /// Create a mock yielding 100 ms of silence at the default rate
    pub fn new() -> Self {
        Self {
            is_started: false,
            chunks: VecDeque::from([Waveform::silence(0.1, defaults::SAMPLE_RATE)]),
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock capture error".to_string(),
        }
    }

    /// Configure the chunks returned, in order
    pub fn with_chunks(mut self, chunks: Vec<Waveform>) -> Self {
        self.chunks = chunks.into();
        self
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on read
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockCaptureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for MockCaptureSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(VoxbridgeError::AudioFormat {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn next_chunk(&mut self) -> Result<Option<Waveform>> {
        if self.should_fail_read {
            return Err(VoxbridgeError::AudioFormat {
                message: self.error_message.clone(),
            });
        }
        Ok(self.chunks.pop_front())
    }
}
