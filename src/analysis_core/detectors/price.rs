//! Price-path detectors: volatility and unrealized profit/loss pressure

use super::{DetectionContext, Detector};
use crate::analysis_core::cost_basis;
use crate::analysis_core::error::DetectorError;
use crate::analysis_core::finding::{Finding, FindingDetail, PressureSide, Severity};

mod thresholds {
    pub const VOLATILITY_MIN_SAMPLE: usize = 10; // strictly more price moves than this
    pub const VOLATILE_MOVE: f64 = 0.10; // |delta| / previous price
    pub const VOLATILE_SHARE_MIN: f64 = 0.20;

    pub const PROFIT_GAIN_RATIO: f64 = 1.5; // current >= 1.5x entry
    pub const PROFIT_WALLET_SHARE: f64 = 0.70;
    pub const PROFIT_VOLUME_SHARE: f64 = 0.30;
    pub const LOSS_GAIN_RATIO: f64 = 0.9; // current < 0.9x entry
    pub const LOSS_WALLET_SHARE: f64 = 0.60;
}

use thresholds::*;

pub struct PriceVolatilityDetector;

impl Detector for PriceVolatilityDetector {
    fn name(&self) -> &'static str {
        "price_volatility"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let prices: Vec<f64> = ctx
            .chronological()
            .iter()
            .filter_map(|s| ctx.price(s))
            .collect();

        let moves: Vec<f64> = prices
            .windows(2)
            .filter(|pair| pair[0] > 0.0)
            .map(|pair| ((pair[1] - pair[0]) / pair[0]).abs())
            .collect();

        let total_moves = moves.len();
        if total_moves <= VOLATILITY_MIN_SAMPLE {
            return Ok(Vec::new());
        }

        let volatile_moves = moves.iter().filter(|m| **m > VOLATILE_MOVE).count();
        let share = volatile_moves as f64 / total_moves as f64;
        if share <= VOLATILE_SHARE_MIN {
            return Ok(Vec::new());
        }

        let max_move = moves.iter().copied().fold(0.0, f64::max);
        Ok(vec![Finding::new(
            Severity::above(share, 0.35, 0.5),
            FindingDetail::PriceVolatility {
                volatile_moves,
                total_moves,
                share_pct: share * 100.0,
                max_move_pct: max_move * 100.0,
            },
        )])
    }
}

/// Holders sitting on large unrealized gains (or losses) relative to their entry
pub struct ProfitPressureDetector;

impl Detector for ProfitPressureDetector {
    fn name(&self) -> &'static str {
        "profit_pressure"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let Some(current_price) = cost_basis::current_price(ctx.swaps) else {
            return Ok(Vec::new());
        };
        let bases = cost_basis::reconstruct(ctx.swaps);
        if bases.is_empty() {
            return Ok(Vec::new());
        }

        let cost_basis_wallets = bases.len();
        let total_volume = ctx.total_volume_usd();
        let wallet_volume = |wallet: &str| ctx.wallets.get(wallet).map_or(0.0, |w| w.total_volume_usd);

        let profit: Vec<&str> = bases
            .values()
            .filter(|b| b.gain_ratio(current_price) >= PROFIT_GAIN_RATIO)
            .map(|b| b.wallet.as_str())
            .collect();
        let loss: Vec<&str> = bases
            .values()
            .filter(|b| b.gain_ratio(current_price) < LOSS_GAIN_RATIO)
            .map(|b| b.wallet.as_str())
            .collect();

        let volume_share = |wallets: &[&str]| {
            if total_volume > 0.0 {
                wallets.iter().map(|w| wallet_volume(*w)).sum::<f64>() / total_volume
            } else {
                0.0
            }
        };

        let profit_share = profit.len() as f64 / cost_basis_wallets as f64;
        let profit_volume_share = volume_share(&profit);
        if profit_share > PROFIT_WALLET_SHARE && profit_volume_share > PROFIT_VOLUME_SHARE {
            return Ok(vec![Finding::new(
                Severity::above(profit_share, 0.8, 0.9),
                FindingDetail::ProfitPressure {
                    side: PressureSide::Profit,
                    wallet_count: profit.len(),
                    cost_basis_wallets,
                    wallet_share_pct: profit_share * 100.0,
                    volume_share_pct: profit_volume_share * 100.0,
                    current_price,
                },
            )]);
        }

        let loss_share = loss.len() as f64 / cost_basis_wallets as f64;
        if loss_share > LOSS_WALLET_SHARE {
            return Ok(vec![Finding::new(
                Severity::above(loss_share, 0.75, 0.85),
                FindingDetail::ProfitPressure {
                    side: PressureSide::Loss,
                    wallet_count: loss.len(),
                    cost_basis_wallets,
                    wallet_share_pct: loss_share * 100.0,
                    volume_share_pct: volume_share(&loss) * 100.0,
                    current_price,
                },
            )]);
        }

        Ok(Vec::new())
    }
}
