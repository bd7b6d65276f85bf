//! Error types for the analysis engine
//!
//! Only contract violations reach the caller. Data-quality problems are
//! absorbed into the report (dropped records, skipped detectors, default
//! risk factors).

#[derive(Debug)]
pub enum EngineError {
    /// Caller handed over something that is not a swap batch at all
    ContractViolation(String),
    Serialization(serde_json::Error),
    Io(std::io::Error),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err)
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::ContractViolation(e) => write!(f, "Contract violation: {}", e),
            EngineError::Serialization(e) => write!(f, "Serialization error: {}", e),
            EngineError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

/// Internal failure of a single detector; the engine turns it into a skip
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorError {
    InvalidTimestamp(i64),
    Panicked(String),
}

impl std::fmt::Display for DetectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorError::InvalidTimestamp(ts) => write!(f, "timestamp {} is out of range", ts),
            DetectorError::Panicked(msg) => write!(f, "detector panicked: {}", msg),
        }
    }
}

impl std::error::Error for DetectorError {}
