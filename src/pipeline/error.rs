//! Stage-local errors and the reporting seam shared by the pipeline and the
//! peer channel.

use std::fmt;
use std::sync::Mutex;

/// Errors raised while one stage handles one utterance or message.
#[derive(Debug, Clone, PartialEq)]
pub enum StationError {
    /// The stage skipped this item; later items are unaffected.
    Recoverable(String),
    /// The stage cannot continue.
    Fatal(String),
}

impl StationError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StationError::Fatal(_))
    }

    pub fn message(&self) -> &str {
        match self {
            StationError::Recoverable(msg) | StationError::Fatal(msg) => msg,
        }
    }
}

impl fmt::Display for StationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationError::Recoverable(msg) => write!(f, "Recoverable error: {}", msg),
            StationError::Fatal(msg) => write!(f, "Fatal error: {}", msg),
        }
    }
}

impl std::error::Error for StationError {}

/// Receives stage and channel failures.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, station: &str, error: &StationError);
}

/// Writes `[station] error` to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, station: &str, error: &StationError) {
        eprintln!("[{}] {}", station, error);
    }
}

/// Keeps every report in memory, for tests and for hosts that surface
/// errors in their own UI.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<(String, StationError)>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(String, StationError)> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Reports raised by `station`.
    pub fn for_station(&self, station: &str) -> Vec<StationError> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(s, _)| s == station)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, station: &str, error: &StationError) {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((station.to_string(), error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_error_display() {
        let recoverable = StationError::Recoverable("vocabulary missing".to_string());
        assert_eq!(
            recoverable.to_string(),
            "Recoverable error: vocabulary missing"
        );

        let fatal = StationError::Fatal("transport gone".to_string());
        assert_eq!(fatal.to_string(), "Fatal error: transport gone");
        assert!(fatal.is_fatal());
        assert_eq!(fatal.message(), "transport gone");
    }

    #[test]
    fn test_log_reporter() {
        let reporter = LogReporter;
        let error = StationError::Recoverable("test error".to_string());
        // Just ensure it doesn't panic
        reporter.report("TestStation", &error);
    }

    #[test]
    fn test_collecting_reporter_groups_by_station() {
        let reporter = CollectingReporter::new();
        assert!(reporter.is_empty());

        reporter.report("stt", &StationError::Recoverable("a".to_string()));
        reporter.report("peer", &StationError::Fatal("b".to_string()));
        reporter.report("stt", &StationError::Recoverable("c".to_string()));

        assert_eq!(reporter.reports().len(), 3);
        assert_eq!(
            reporter.for_station("stt"),
            vec![
                StationError::Recoverable("a".to_string()),
                StationError::Recoverable("c".to_string())
            ]
        );
    }
}
