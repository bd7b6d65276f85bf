//! Analysis Engine - orchestration of one batch run
//!
//! ```text
//! raw records
//!     ↓
//! normalize_swaps()          (drops malformed records, counts reasons)
//!     ↓
//! aggregate_wallets()        (one WalletAggregate per address)
//!     ↓
//! Detector registry          (rayon par_iter or sequential, panics -> skipped)
//!     ↓
//! RiskScorer::score()        (six weighted factors)
//!     ↓
//! SummaryAssembler           (TransactionSummary + narrative)
//! ```
//!
//! A run is a pure function of its input apart from `analyzed_at`, which
//! comes from the injectable clock.

use super::context::AnalysisContext;
use super::detectors::{default_detectors, DetectionContext, Detector};
use super::error::{DetectorError, EngineError};
use super::finding::Finding;
use super::normalizer::{normalize_swaps, normalize_values, NormalizationReport, NormalizedBatch, RawSwap};
use super::scorer::{RiskInputs, RiskScoreBreakdown, RiskScorer};
use super::summary::{SummaryAssembler, SummaryInputs, TransactionSummary};
use super::wallet::aggregate_wallets;
use crate::config::EngineConfig;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};

/// Detector that failed internally and contributed no findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDetector {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub summary: TransactionSummary,
    pub risk: RiskScoreBreakdown,
    pub normalization: NormalizationReport,
    pub skipped_detectors: Vec<SkippedDetector>,
    pub analyzed_at: DateTime<Utc>,
}

pub struct AnalysisEngine {
    config: EngineConfig,
    detectors: Vec<Box<dyn Detector>>,
    scorer: RiskScorer,
    assembler: SummaryAssembler,

    /// Clock for `analyzed_at` (mockable in tests)
    now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::new_with_clock(config, Box::new(Utc::now))
    }

    /// Engine with a custom clock, for reproducible output
    pub fn new_with_clock(config: EngineConfig, now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        let assembler = SummaryAssembler::new(config.top_wallets, config.narrative_findings);
        Self {
            config,
            detectors: default_detectors(),
            scorer: RiskScorer::new(),
            assembler,
            now_fn,
        }
    }

    /// Replace the detector registry; registration order is output order
    pub fn with_detectors(mut self, detectors: Vec<Box<dyn Detector>>) -> Self {
        self.detectors = detectors;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn analyze(&self, records: Vec<RawSwap>, context: &AnalysisContext) -> AnalysisReport {
        self.analyze_batch(normalize_swaps(records), context)
    }

    pub fn analyze_values(&self, records: &[Value], context: &AnalysisContext) -> AnalysisReport {
        self.analyze_batch(normalize_values(records), context)
    }

    /// Analyze an untyped job payload
    ///
    /// Accepts either a bare array of swap records or an object with a
    /// `swaps` array plus optional `pool`, `walletProfiles` and `history`.
    /// Anything else is a contract violation. Context sections that fail to
    /// parse are logged and treated as absent.
    pub fn analyze_value(&self, payload: &Value) -> Result<AnalysisReport, EngineError> {
        match payload {
            Value::Array(records) => Ok(self.analyze_values(records, &AnalysisContext::default())),
            Value::Object(fields) => {
                let records = match fields.get("swaps") {
                    Some(Value::Array(records)) => records,
                    Some(other) => {
                        return Err(EngineError::ContractViolation(format!(
                            "\"swaps\" must be an array, got {}",
                            json_type(other)
                        )))
                    }
                    None => {
                        return Err(EngineError::ContractViolation(
                            "payload has no \"swaps\" array".to_string(),
                        ))
                    }
                };

                let context = AnalysisContext {
                    pool: context_section(payload, "pool"),
                    wallet_profiles: context_section(payload, "walletProfiles"),
                    history: context_section(payload, "history"),
                };
                Ok(self.analyze_values(records, &context))
            }
            other => Err(EngineError::ContractViolation(format!(
                "expected a swap array or job object, got {}",
                json_type(other)
            ))),
        }
    }

    pub fn analyze_batch(&self, batch: NormalizedBatch, context: &AnalysisContext) -> AnalysisReport {
        let NormalizedBatch { swaps, report } = batch;
        if report.dropped > 0 {
            log::info!(
                "Normalized {} of {} swap records ({} dropped)",
                report.accepted,
                report.received,
                report.dropped
            );
        }

        let wallets = aggregate_wallets(&swaps);
        let pool_liquidity_usd = context.pool_liquidity_usd();
        let detection = DetectionContext::new(&swaps, &wallets, pool_liquidity_usd);

        let (findings, skipped_detectors) = self.run_detectors(&detection);

        let risk = self.scorer.score(&RiskInputs {
            swaps: &swaps,
            wallets: &wallets,
            pool: context.pool.as_ref(),
            wallet_profiles: context.wallet_profiles.as_deref(),
            history: context.history.as_ref(),
        });

        log::debug!(
            "Analyzed {} swaps / {} wallets: {} findings, risk {} ({})",
            swaps.len(),
            wallets.len(),
            findings.len(),
            risk.total_score,
            risk.tier.as_str()
        );

        let summary = self.assembler.assemble(SummaryInputs {
            swaps: &swaps,
            wallets: &wallets,
            findings,
            risk: &risk,
            pool_liquidity_usd,
        });

        AnalysisReport {
            summary,
            risk,
            normalization: report,
            skipped_detectors,
            analyzed_at: (self.now_fn)(),
        }
    }

    /// Findings in (registration index, kind) order plus the detectors that failed
    fn run_detectors(&self, ctx: &DetectionContext<'_>) -> (Vec<Finding>, Vec<SkippedDetector>) {
        let outcomes: Vec<Result<Vec<Finding>, DetectorError>> = if self.config.parallel_detectors {
            self.detectors
                .par_iter()
                .map(|detector| run_detector(detector.as_ref(), ctx))
                .collect()
        } else {
            self.detectors
                .iter()
                .map(|detector| run_detector(detector.as_ref(), ctx))
                .collect()
        };

        let mut indexed = Vec::new();
        let mut skipped = Vec::new();

        for (index, (detector, outcome)) in self.detectors.iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(findings) => indexed.extend(findings.into_iter().map(|f| (index, f))),
                Err(e) => {
                    log::warn!("Detector {} skipped: {}", detector.name(), e);
                    skipped.push(SkippedDetector {
                        name: detector.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        indexed.sort_by_key(|(index, finding)| (*index, finding.kind));
        (indexed.into_iter().map(|(_, f)| f).collect(), skipped)
    }
}

fn run_detector(detector: &dyn Detector, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
    match panic::catch_unwind(AssertUnwindSafe(|| detector.detect(ctx))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(DetectorError::Panicked(message))
        }
    }
}

fn context_section<T: serde::de::DeserializeOwned>(payload: &Value, key: &str) -> Option<T> {
    let value = payload.get(key).filter(|v| !v.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("Ignoring malformed \"{}\" context: {}", key, e);
            None
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
