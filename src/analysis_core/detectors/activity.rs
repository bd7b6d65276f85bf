//! Wallet-activity detectors: wash trading, whales, imbalance, rapid cycles,
//! large transactions, new-wallet dominance and bot-sized trades

use super::{DetectionContext, Detector};
use crate::analysis_core::error::DetectorError;
use crate::analysis_core::finding::{percent, Finding, FindingDetail, ImbalanceDirection, Severity};
use std::collections::BTreeMap;

mod thresholds {
    pub const WASH_MIN_ROUND_TRIPS: usize = 10; // min(buys, sells) per wallet
    pub const WHALE_SHARE_MIN: f64 = 0.30; // strictly above 30% of USD volume
    pub const PUMP_BUY_RATIO_MIN: f64 = 0.85;
    pub const DUMP_BUY_RATIO_MAX: f64 = 0.15;
    pub const RAPID_MIN_ROUND_TRIPS: usize = 5;
    pub const RAPID_MAX_TX_COUNT: usize = 20; // strictly fewer trades than this
    pub const LARGE_TX_MULTIPLIER: f64 = 10.0; // x average USD size
    pub const NEW_WALLET_MAX_TXS: usize = 2;
    pub const NEW_WALLET_SHARE_MIN: f64 = 0.50;
    pub const NEW_WALLET_MIN_WALLETS: usize = 10; // strictly more wallets than this
    pub const BOT_BUCKET_USD: f64 = 10.0; // round trade sizes to nearest $10
    pub const BOT_BUCKET_SHARE_MIN: f64 = 0.30;
    pub const BOT_MIN_SAMPLE: usize = 20; // strictly more sized trades than this
}

use thresholds::*;

pub struct WashTradingDetector;

impl Detector for WashTradingDetector {
    fn name(&self) -> &'static str {
        "wash_trading"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        Ok(ctx
            .wallets
            .values()
            .filter(|w| w.round_trips() >= WASH_MIN_ROUND_TRIPS)
            .map(|w| {
                let round_trips = w.round_trips();
                Finding::new(
                    Severity::above(round_trips as f64, 19.0, 29.0),
                    FindingDetail::WashTrading {
                        wallet: w.address.clone(),
                        round_trips,
                        buy_count: w.buy_count,
                        sell_count: w.sell_count,
                    },
                )
            })
            .collect())
    }
}

pub struct WhaleConcentrationDetector;

impl Detector for WhaleConcentrationDetector {
    fn name(&self) -> &'static str {
        "whale_concentration"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let total_volume = ctx.total_volume_usd();
        if total_volume <= 0.0 {
            return Ok(Vec::new());
        }

        Ok(ctx
            .wallets
            .values()
            .filter(|w| w.total_volume_usd / total_volume > WHALE_SHARE_MIN)
            .map(|w| {
                let share = w.total_volume_usd / total_volume;
                Finding::new(
                    Severity::above(share, 0.4, 0.5),
                    FindingDetail::WhaleConcentration {
                        wallet: w.address.clone(),
                        volume_usd: w.total_volume_usd,
                        share_pct: share * 100.0,
                    },
                )
            })
            .collect())
    }
}

pub struct BuySellImbalanceDetector;

impl Detector for BuySellImbalanceDetector {
    fn name(&self) -> &'static str {
        "buy_sell_imbalance"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let total = ctx.swaps.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let buy_count = ctx.swaps.iter().filter(|s| s.is_buy()).count();
        let sell_count = total - buy_count;
        let buy_ratio = buy_count as f64 / total as f64;

        let (direction, severity) = if buy_ratio > PUMP_BUY_RATIO_MIN {
            (ImbalanceDirection::Pump, Severity::above(buy_ratio, 0.9, 0.95))
        } else if buy_ratio < DUMP_BUY_RATIO_MAX {
            (ImbalanceDirection::Dump, Severity::below(buy_ratio, 0.1, 0.05))
        } else {
            return Ok(Vec::new());
        };

        Ok(vec![Finding::new(
            severity,
            FindingDetail::BuySellImbalance {
                direction,
                buy_count,
                sell_count,
                buy_ratio_pct: buy_ratio * 100.0,
            },
        )])
    }
}

pub struct RapidCycleDetector;

impl Detector for RapidCycleDetector {
    fn name(&self) -> &'static str {
        "rapid_cycle"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let cyclers: Vec<_> = ctx
            .wallets
            .values()
            .filter(|w| w.round_trips() >= RAPID_MIN_ROUND_TRIPS && w.tx_count < RAPID_MAX_TX_COUNT)
            .collect();

        if cyclers.is_empty() {
            return Ok(Vec::new());
        }

        let round_trips = cyclers.iter().map(|w| w.round_trips()).sum();
        let wallets: Vec<String> = cyclers.iter().map(|w| w.address.clone()).collect();

        Ok(vec![Finding::new(
            Severity::above(wallets.len() as f64, 2.0, 9.0),
            FindingDetail::RapidCycle { wallets, round_trips },
        )])
    }
}

pub struct LargeTransactionDetector;

impl Detector for LargeTransactionDetector {
    fn name(&self) -> &'static str {
        "large_transaction"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let Some(average_usd) = ctx.average_trade_usd() else {
            return Ok(Vec::new());
        };
        if average_usd <= 0.0 {
            return Ok(Vec::new());
        }

        let threshold_usd = average_usd * LARGE_TX_MULTIPLIER;
        let count = ctx
            .swaps
            .iter()
            .filter_map(|s| s.usd_value())
            .filter(|usd| *usd > threshold_usd)
            .count();

        if count == 0 {
            return Ok(Vec::new());
        }

        let share = count as f64 / ctx.swaps.len() as f64;
        Ok(vec![Finding::new(
            Severity::above(share, 0.02, 0.05),
            FindingDetail::LargeTransaction {
                count,
                share_pct: share * 100.0,
                threshold_usd,
                average_usd,
            },
        )])
    }
}

pub struct NewWalletDominanceDetector;

impl Detector for NewWalletDominanceDetector {
    fn name(&self) -> &'static str {
        "new_wallet_dominance"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let total_wallets = ctx.wallets.len();
        if total_wallets <= NEW_WALLET_MIN_WALLETS {
            return Ok(Vec::new());
        }

        let new_wallets = ctx
            .wallets
            .values()
            .filter(|w| w.tx_count <= NEW_WALLET_MAX_TXS)
            .count();
        let share = new_wallets as f64 / total_wallets as f64;

        if share <= NEW_WALLET_SHARE_MIN {
            return Ok(Vec::new());
        }

        Ok(vec![Finding::new(
            Severity::above(share, 0.65, 0.8),
            FindingDetail::NewWalletDominance {
                new_wallets,
                total_wallets,
                share_pct: share * 100.0,
            },
        )])
    }
}

/// Repeated identical trade sizes are the fingerprint of scripted trading
pub struct BotSignatureDetector;

impl Detector for BotSignatureDetector {
    fn name(&self) -> &'static str {
        "bot_signature"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let sized = ctx.sized_values();
        if sized.len() <= BOT_MIN_SAMPLE {
            return Ok(Vec::new());
        }

        let mut buckets: BTreeMap<i64, usize> = BTreeMap::new();
        for usd in &sized {
            let bucket = ((usd / BOT_BUCKET_USD).round() * BOT_BUCKET_USD) as i64;
            *buckets.entry(bucket).or_insert(0) += 1;
        }

        // Smallest bucket wins ties
        let mut top: Option<(i64, usize)> = None;
        for (&bucket, &count) in &buckets {
            if top.map_or(true, |(_, best)| count > best) {
                top = Some((bucket, count));
            }
        }

        let Some((bucket_usd, trade_count)) = top else {
            return Ok(Vec::new());
        };

        let share = trade_count as f64 / sized.len() as f64;
        if share <= BOT_BUCKET_SHARE_MIN {
            return Ok(Vec::new());
        }

        Ok(vec![Finding::new(
            Severity::above(share, 0.45, 0.6),
            FindingDetail::BotSignature {
                bucket_usd,
                trade_count,
                share_pct: percent(trade_count as f64, sized.len() as f64),
            },
        )])
    }
}
