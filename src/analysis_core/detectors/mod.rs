//! Pattern detection passes
//!
//! Every detector is a pure function of the swap batch and the wallet
//! aggregates. Detectors never share state, so the engine may run them on
//! the rayon pool; output order comes from the registry, not from completion.
//!
//! # Registry order
//!
//! ```text
//! activity:  wash_trading, whale_concentration, buy_sell_imbalance,
//!            rapid_cycle, large_transaction
//! timing:    time_clustering
//! activity:  new_wallet_dominance
//! timing:    volume_spike
//! activity:  bot_signature
//! price:     price_volatility
//! timing:    synchronized_cluster
//! price:     profit_pressure
//! timing:    bait_pattern
//! flow:      diamond_hands
//! timing:    panic_fomo
//! flow:      new_wallet_flow, manipulation_wallet
//! ```

pub mod activity;
pub mod flow;
pub mod price;
pub mod timing;

use super::error::DetectorError;
use super::finding::Finding;
use super::normalizer::{PriceSource, Swap};
use super::wallet::WalletMap;
use chrono::{DateTime, Timelike, Utc};

/// Read-only view handed to every detector
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    pub swaps: &'a [Swap],
    pub wallets: &'a WalletMap,
    pub pool_liquidity_usd: Option<f64>,
    pub price_source: PriceSource,
}

impl<'a> DetectionContext<'a> {
    pub fn new(swaps: &'a [Swap], wallets: &'a WalletMap, pool_liquidity_usd: Option<f64>) -> Self {
        Self {
            swaps,
            wallets,
            pool_liquidity_usd,
            price_source: PriceSource::for_batch(swaps),
        }
    }

    /// Price of a swap on the batch's price series
    pub fn price(&self, swap: &Swap) -> Option<f64> {
        swap.price_from(self.price_source)
    }

    /// Sum of known USD sizes
    pub fn total_volume_usd(&self) -> f64 {
        self.swaps.iter().map(Swap::usd_or_zero).sum()
    }

    /// USD sizes of the trades that have one
    pub fn sized_values(&self) -> Vec<f64> {
        self.swaps.iter().filter_map(Swap::usd_value).collect()
    }

    /// Mean USD size over sized trades
    pub fn average_trade_usd(&self) -> Option<f64> {
        let sized = self.sized_values();
        if sized.is_empty() {
            return None;
        }
        Some(sized.iter().sum::<f64>() / sized.len() as f64)
    }

    /// Swaps in time order; ties keep a stable signature order
    pub fn chronological(&self) -> Vec<&'a Swap> {
        let mut sorted: Vec<&'a Swap> = self.swaps.iter().collect();
        sorted.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.signature.cmp(&b.signature))
        });
        sorted
    }
}

pub trait Detector: Send + Sync {
    /// Stable identifier used in logs and skip reports
    fn name(&self) -> &'static str;

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError>;
}

/// All detectors in registration order
pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(activity::WashTradingDetector),
        Box::new(activity::WhaleConcentrationDetector),
        Box::new(activity::BuySellImbalanceDetector),
        Box::new(activity::RapidCycleDetector),
        Box::new(activity::LargeTransactionDetector),
        Box::new(timing::TimeClusteringDetector),
        Box::new(activity::NewWalletDominanceDetector),
        Box::new(timing::VolumeSpikeDetector),
        Box::new(activity::BotSignatureDetector),
        Box::new(price::PriceVolatilityDetector),
        Box::new(timing::SynchronizedClusterDetector),
        Box::new(price::ProfitPressureDetector),
        Box::new(timing::BaitPatternDetector),
        Box::new(flow::DiamondHandsDetector),
        Box::new(timing::PanicFomoDetector),
        Box::new(flow::NewWalletFlowDetector),
        Box::new(flow::ManipulationWalletDetector),
    ]
}

/// UTC hour of a millisecond timestamp
pub(crate) fn hour_of_day(timestamp_ms: i64) -> Result<u32, DetectorError> {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.hour())
        .ok_or(DetectorError::InvalidTimestamp(timestamp_ms))
}

/// Start of the most recent 20%-by-time window and of the window before it
pub(crate) fn recent_window_bounds(sorted: &[&Swap]) -> Option<(i64, i64, i64)> {
    let first = sorted.first()?.timestamp;
    let last = sorted.last()?.timestamp;
    let span = last - first;
    let recent_start = last - span / 5;
    let previous_start = last - 2 * span / 5;
    Some((previous_start, recent_start, last))
}
