//! Analysis Core - DEX swap forensics for a single pool
//!
//! Turns one batch of swap records into an activity summary, a catalogue of
//! suspicious-pattern findings and a weighted risk score.
//!
//! # Architecture
//!
//! ```text
//! Raw swap records (any upstream parser)
//!     ↓
//! Swap Normalizer (drop malformed, U256 amounts, USD left absent when unknown)
//!     ↓
//! Wallet Aggregator (address → WalletAggregate)
//!     ↓
//! Pattern Detection Engine (17 independent detectors → Findings)
//!     ↓
//! Risk Scorer (six weighted factors → RiskScoreBreakdown)
//!     ↓
//! Summary Assembler (TransactionSummary + narrative)
//! ```

pub mod amount;
pub mod context;
pub mod cost_basis;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod finding;
pub mod normalizer;
pub mod scorer;
pub mod summary;
pub mod wallet;

pub use context::{AnalysisContext, HistoricalTrend, PoolContext, WalletProfile};
pub use detectors::{default_detectors, DetectionContext, Detector};
pub use engine::{AnalysisEngine, AnalysisReport, SkippedDetector};
pub use error::{DetectorError, EngineError};
pub use finding::{Finding, FindingDetail, FindingKind, Severity};
pub use normalizer::{normalize_swaps, NormalizationReport, NormalizedBatch, RawSwap, Swap, TradeDirection};
pub use scorer::{RiskCategory, RiskFactor, RiskScoreBreakdown, RiskScorer, RiskTier};
pub use summary::{SummaryAssembler, TransactionSummary};
pub use wallet::{aggregate_wallets, WalletAggregate, WalletMap};
