//! Job file input and report output for the batch worker

use crate::analysis_core::{AnalysisReport, EngineError};
use serde_json::Value;
use std::{fs, path::Path};

/// Read one analysis job (a JSON document) from disk
pub fn load_job(file_path: &Path) -> Result<Value, EngineError> {
    let json = fs::read_to_string(file_path)?;
    let payload: Value = serde_json::from_str(&json)?;

    log::debug!("Loaded job from {}", file_path.display());
    Ok(payload)
}

pub fn render_report(report: &AnalysisReport, compact: bool) -> Result<String, EngineError> {
    let json = if compact {
        serde_json::to_string(report)?
    } else {
        serde_json::to_string_pretty(report)?
    };
    Ok(json)
}

/// Write the report, creating parent directories as needed
pub fn save_report(report: &AnalysisReport, file_path: &Path, compact: bool) -> Result<(), EngineError> {
    if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    fs::write(file_path, render_report(report, compact)?)?;

    log::info!(
        "Wrote report ({} findings, risk {}) to {}",
        report.summary.findings.len(),
        report.risk.total_score,
        file_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis_core::AnalysisEngine;
    use crate::config::EngineConfig;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_job_and_save_report() {
        let mut input = NamedTempFile::new().unwrap();
        write!(
            input,
            r#"{{"swaps": [{{"signature": "s1", "timestamp": 1700000000000, "wallet": "w1", "direction": "buy", "amountIn": "42", "amountInUsd": 10.5}}]}}"#
        )
        .unwrap();

        let payload = load_job(input.path()).unwrap();
        let report = AnalysisEngine::new(EngineConfig::default()).analyze_value(&payload).unwrap();

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("reports").join("job.json");
        save_report(&report, &output, false).unwrap();

        let written: AnalysisReport = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, report);
    }

    #[test]
    fn test_load_job_rejects_invalid_json() {
        let mut input = NamedTempFile::new().unwrap();
        write!(input, "not json").unwrap();
        assert!(matches!(load_job(input.path()), Err(EngineError::Serialization(_))));
    }

    #[test]
    fn test_missing_job_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(load_job(&missing), Err(EngineError::Io(_))));
    }
}
