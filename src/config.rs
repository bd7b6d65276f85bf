use std::env;
use std::path::Path;

/// Engine settings loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// N for the top-wallet and top-trader lists
    pub top_wallets: usize,
    /// Run detector passes on the rayon pool
    pub parallel_detectors: bool,
    /// Findings named in the narrative before "+N more"
    pub narrative_findings: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_wallets: 10,
            parallel_detectors: true,
            narrative_findings: 5,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Unset or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            top_wallets: env::var("POOLFLOW_TOP_WALLETS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.top_wallets),
            parallel_detectors: env::var("POOLFLOW_PARALLEL_DETECTORS")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.parallel_detectors),
            narrative_findings: env::var("POOLFLOW_MAX_FINDINGS_IN_NARRATIVE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.narrative_findings),
        }
    }

    pub fn sequential() -> Self {
        Self {
            parallel_detectors: false,
            ..Self::default()
        }
    }
}

/// Load `.env` (or the given file) into the process environment and return
/// the stderr logger builder. The file is read first so a `RUST_LOG` in it
/// applies to the logger.
pub fn load_environment(env_file: Option<&Path>) -> env_logger::Builder {
    load_environment_with(env_file, "RUST_LOG")
}

fn load_environment_with(env_file: Option<&Path>, filter_var: &str) -> env_logger::Builder {
    match env_file {
        Some(path) => dotenv::from_path(path).ok(),
        None => dotenv::dotenv().ok().map(|_| ()),
    };

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().filter_or(filter_var, "info"));
    builder.target(env_logger::Target::Stderr);
    builder
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.top_wallets, 10);
        assert!(config.parallel_detectors);
        assert_eq!(config.narrative_findings, 5);
        assert!(!EngineConfig::sequential().parallel_detectors);
    }

    #[test]
    fn test_env_file_filter_reaches_logger() {
        let mut env_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(env_file, "POOLFLOW_TEST_LOG_FILTER=warn").unwrap();

        let logger = load_environment_with(Some(env_file.path()), "POOLFLOW_TEST_LOG_FILTER").build();
        assert_eq!(logger.filter(), log::LevelFilter::Warn);
    }

    #[test]
    fn test_logger_defaults_to_info() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join(".env");

        let logger = load_environment_with(Some(&missing), "POOLFLOW_TEST_UNSET_LOG_FILTER").build();
        assert_eq!(logger.filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
