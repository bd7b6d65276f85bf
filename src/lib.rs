pub mod analysis_core;
pub mod config;
pub mod job_file;

pub use analysis_core::{AnalysisContext, AnalysisEngine, AnalysisReport, EngineError};
pub use config::EngineConfig;
