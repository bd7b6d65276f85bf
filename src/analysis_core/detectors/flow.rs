//! Holder and capital-flow detectors
//!
//! These follow who entered when and what they did afterwards: early
//! buyers that hold or flip, the share of flow coming from first-time
//! wallets, and wallets that pair outsized buys with quick outsized sells.

use super::{recent_window_bounds, DetectionContext, Detector};
use crate::analysis_core::error::DetectorError;
use crate::analysis_core::finding::{
    percent, EarlyBuyerOutcome, Finding, FindingDetail, NewWalletFlowKind, Severity,
};
use crate::analysis_core::normalizer::Swap;
use std::collections::{BTreeMap, BTreeSet};

mod thresholds {
    pub const EARLY_SLICE_DIVISOR: usize = 10; // earliest 10% of trades
    pub const HOLDER_SHARE_MIN: f64 = 0.50;
    pub const HOLDER_VOLUME_SHARE_MIN: f64 = 0.30;
    pub const EARLY_EXIT_HOLDER_SHARE: f64 = 0.20;

    pub const FLOW_MIN_SAMPLE: usize = 20; // strictly more trades than this
    pub const ORGANIC_VOLUME_SHARE: f64 = 0.50;
    pub const ORGANIC_TRADE_SHARE: f64 = 0.60;
    pub const CLOSED_LOOP_VOLUME_SHARE: f64 = 0.20;
    pub const CLOSED_LOOP_TRADE_SHARE: f64 = 0.30;

    pub const MANIPULATION_SIZE_MULTIPLIER: f64 = 3.0; // x average USD size
    pub const MANIPULATION_WINDOW_MS: i64 = 5 * 60 * 1000;
}

use thresholds::*;

pub struct DiamondHandsDetector;

impl Detector for DiamondHandsDetector {
    fn name(&self) -> &'static str {
        "diamond_hands"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let sorted = ctx.chronological();
        let early_count = sorted.len() / EARLY_SLICE_DIVISOR;
        if early_count == 0 {
            return Ok(Vec::new());
        }
        let early = &sorted[..early_count];

        let early_buyers: BTreeSet<&str> = early
            .iter()
            .filter(|s| s.is_buy())
            .map(|s| s.wallet.as_str())
            .collect();
        if early_buyers.is_empty() {
            return Ok(Vec::new());
        }

        let holders: BTreeSet<&str> = early_buyers
            .iter()
            .copied()
            .filter(|w| ctx.wallets.get(*w).map_or(false, |agg| agg.sell_count == 0))
            .collect();

        let early_volume: f64 = early.iter().map(|s| s.usd_or_zero()).sum();
        let holder_volume: f64 = early
            .iter()
            .filter(|s| s.is_buy() && holders.contains(s.wallet.as_str()))
            .map(|s| s.usd_or_zero())
            .sum();

        let holder_share = holders.len() as f64 / early_buyers.len() as f64;
        let holder_volume_share = if early_volume > 0.0 {
            holder_volume / early_volume
        } else {
            0.0
        };

        let (outcome, severity) =
            if holder_share > HOLDER_SHARE_MIN && holder_volume_share > HOLDER_VOLUME_SHARE_MIN {
                (EarlyBuyerOutcome::Holding, Severity::above(holder_share, 0.65, 0.8))
            } else if holder_share < EARLY_EXIT_HOLDER_SHARE {
                (EarlyBuyerOutcome::EarlyExit, Severity::below(holder_share, 0.1, 0.05))
            } else {
                return Ok(Vec::new());
            };

        Ok(vec![Finding::new(
            severity,
            FindingDetail::DiamondHands {
                outcome,
                early_buyers: early_buyers.len(),
                holders: holders.len(),
                holder_share_pct: holder_share * 100.0,
                holder_volume_share_pct: holder_volume_share * 100.0,
            },
        )])
    }
}

/// Share of flow coming from each wallet's first trade in the batch
pub struct NewWalletFlowDetector;

impl Detector for NewWalletFlowDetector {
    fn name(&self) -> &'static str {
        "new_wallet_flow"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        if ctx.swaps.len() <= FLOW_MIN_SAMPLE {
            return Ok(Vec::new());
        }

        let sorted = ctx.chronological();
        let Some((_, recent_start, _)) = recent_window_bounds(&sorted) else {
            return Ok(Vec::new());
        };

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut total = FlowTally::default();
        let mut recent = FlowTally::default();

        for swap in &sorted {
            let is_new = seen.insert(swap.wallet.as_str());
            total.add(swap, is_new);
            if swap.timestamp >= recent_start {
                recent.add(swap, is_new);
            }
        }

        let recent_volume_share = recent.new_volume_share();
        let recent_trade_share = recent.new_trade_share();
        if recent.volume > 0.0
            && recent_volume_share > ORGANIC_VOLUME_SHARE
            && recent_trade_share > ORGANIC_TRADE_SHARE
        {
            return Ok(vec![Finding::new(
                Severity::above(recent_volume_share, 0.65, 0.8),
                FindingDetail::NewWalletFlow {
                    flow: NewWalletFlowKind::OrganicGrowth,
                    volume_share_pct: recent_volume_share * 100.0,
                    trade_share_pct: recent_trade_share * 100.0,
                },
            )]);
        }

        let volume_share = total.new_volume_share();
        let trade_share = total.new_trade_share();
        if total.volume > 0.0
            && volume_share < CLOSED_LOOP_VOLUME_SHARE
            && trade_share < CLOSED_LOOP_TRADE_SHARE
        {
            return Ok(vec![Finding::new(
                Severity::below(trade_share, 0.2, 0.1),
                FindingDetail::NewWalletFlow {
                    flow: NewWalletFlowKind::ClosedLoop,
                    volume_share_pct: volume_share * 100.0,
                    trade_share_pct: trade_share * 100.0,
                },
            )]);
        }

        Ok(Vec::new())
    }
}

#[derive(Default)]
struct FlowTally {
    trades: usize,
    volume: f64,
    new_trades: usize,
    new_volume: f64,
}

impl FlowTally {
    fn add(&mut self, swap: &Swap, is_new: bool) {
        let usd = swap.usd_or_zero();
        self.trades += 1;
        self.volume += usd;
        if is_new {
            self.new_trades += 1;
            self.new_volume += usd;
        }
    }

    fn new_volume_share(&self) -> f64 {
        percent(self.new_volume, self.volume) / 100.0
    }

    fn new_trade_share(&self) -> f64 {
        percent(self.new_trades as f64, self.trades as f64) / 100.0
    }
}

/// Outsized buy followed within five minutes by an outsized sell from the same wallet
pub struct ManipulationWalletDetector;

impl ManipulationWalletDetector {
    /// (buy USD, sell USD) of every matched pair for one wallet's time-ordered trades
    fn matched_pairs(trades: &[&Swap], threshold_usd: f64) -> Vec<(f64, f64)> {
        let is_large = |s: &Swap| s.usd_value().map_or(false, |usd| usd > threshold_usd);
        let mut used = vec![false; trades.len()];
        let mut pairs = Vec::new();

        for (i, entry) in trades.iter().enumerate() {
            if !entry.is_buy() || !is_large(*entry) {
                continue;
            }

            let exit = trades.iter().enumerate().skip(i + 1).find(|(j, exit)| {
                !used[*j]
                    && exit.is_sell()
                    && is_large(**exit)
                    && exit.timestamp - entry.timestamp <= MANIPULATION_WINDOW_MS
            });

            if let Some((j, exit)) = exit {
                used[j] = true;
                pairs.push((entry.usd_or_zero(), exit.usd_or_zero()));
            }
        }

        pairs
    }
}

impl Detector for ManipulationWalletDetector {
    fn name(&self) -> &'static str {
        "manipulation_wallet"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let Some(average_usd) = ctx.average_trade_usd() else {
            return Ok(Vec::new());
        };
        if average_usd <= 0.0 {
            return Ok(Vec::new());
        }
        let threshold_usd = average_usd * MANIPULATION_SIZE_MULTIPLIER;

        let mut by_wallet: BTreeMap<&str, Vec<&Swap>> = BTreeMap::new();
        for swap in ctx.chronological() {
            by_wallet.entry(swap.wallet.as_str()).or_default().push(swap);
        }

        let mut wallets = Vec::new();
        let mut buy_volume_usd = 0.0;
        let mut sell_volume_usd = 0.0;

        for (wallet, trades) in &by_wallet {
            let pairs = Self::matched_pairs(trades, threshold_usd);
            if pairs.is_empty() {
                continue;
            }
            wallets.push(wallet.to_string());
            for (buy, sell) in pairs {
                buy_volume_usd += buy;
                sell_volume_usd += sell;
            }
        }

        if wallets.is_empty() {
            return Ok(Vec::new());
        }

        let price_impact_pct = ctx
            .pool_liquidity_usd
            .filter(|tvl| *tvl > 0.0)
            .map(|tvl| (buy_volume_usd + sell_volume_usd) / tvl * 100.0);

        let severity = match price_impact_pct {
            Some(impact) => Severity::above(impact, 3.0, 10.0),
            None if wallets.len() >= 3 => Severity::Moderate,
            None => Severity::Weak,
        };

        Ok(vec![Finding::new(
            severity,
            FindingDetail::ManipulationWallet {
                wallets,
                buy_volume_usd,
                sell_volume_usd,
                price_impact_pct,
            },
        )])
    }
}
