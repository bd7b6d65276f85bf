//! Summary assembly
//!
//! Last stage of the pipeline: folds the batch, the wallet aggregates, the
//! ordered findings and the risk breakdown into one `TransactionSummary`.
//! Position distribution and price levels are only attached when the batch
//! is large enough and carries reported prices.

use super::amount;
use super::cost_basis::{self, CostBasis};
use super::finding::{percent, Finding};
use super::normalizer::Swap;
use super::scorer::RiskScoreBreakdown;
use super::wallet::{ranked_by_activity, ranked_by_volume, WalletMap};
use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod thresholds {
    pub const LARGE_FLOW_MULTIPLIER: f64 = 10.0; // x average USD size

    pub const POSITION_MIN_SWAPS: usize = 50; // strictly more swaps than this
    pub const BREAK_EVEN_BAND_PCT: f64 = 1.0; // +/- 1% counts as break-even
    pub const HIGH_RISK_PROFIT_SHARE: f64 = 0.60;
    pub const HIGH_RISK_AVG_GAIN_PCT: f64 = 50.0;
    pub const MEDIUM_RISK_PROFIT_SHARE: f64 = 0.40;
    pub const MEDIUM_RISK_AVG_GAIN_PCT: f64 = 25.0;
    pub const SMART_MONEY_LIMIT: usize = 5;

    pub const LEVELS_MIN_PRICED: usize = 100; // strictly more priced swaps than this
    pub const LEVEL_BIN_RATIO: f64 = 1.02; // geometric bins 2% wide
    pub const LEVELS_PER_SIDE: usize = 3;
}

use thresholds::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopWallet {
    pub address: String,
    /// Sum of raw `amountIn`
    #[serde(with = "amount::decimal")]
    pub raw_volume: U256,
    pub volume_usd: f64,
    pub share_pct: f64,
    pub tx_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopTrader {
    pub address: String,
    pub buy_count: usize,
    pub sell_count: usize,
    pub buy_volume_usd: f64,
    pub sell_volume_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

/// Outsized trades relative to pool depth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargeFlowRatios {
    pub threshold_usd: f64,
    pub large_buy_volume_usd: f64,
    pub large_sell_volume_usd: f64,
    pub large_buy_pct_of_liquidity: f64,
    pub large_sell_pct_of_liquidity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfitTakingRisk {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartMoneyWallet {
    pub address: String,
    pub entry_price: f64,
    pub gain_pct: f64,
    pub buy_volume_usd: f64,
}

/// Where cost-basis wallets stand against the current price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDistribution {
    pub current_price: f64,
    pub wallets_with_cost_basis: usize,
    pub in_profit: usize,
    pub in_loss: usize,
    pub break_even: usize,
    pub profit_pct: f64,
    pub loss_pct: f64,
    pub break_even_pct: f64,
    pub average_profit_gain_pct: f64,
    pub profit_taking_risk: ProfitTakingRisk,
    pub smart_money: Vec<SmartMoneyWallet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLevel {
    pub price: f64,
    pub trade_count: usize,
    pub volume_usd: f64,
    pub distance_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLevels {
    pub current_price: f64,
    pub support: Vec<PriceLevel>,
    pub resistance: Vec<PriceLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub total_transactions: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub unique_wallets: usize,
    pub average_transaction_usd: f64,
    pub total_volume_usd: f64,
    pub buy_volume_usd: f64,
    pub sell_volume_usd: f64,
    pub top_wallets: Vec<TopWallet>,
    pub top_traders: Vec<TopTrader>,
    pub findings: Vec<Finding>,
    pub narrative: String,
    pub time_range: Option<TimeRange>,
    pub large_flow: Option<LargeFlowRatios>,
    pub position_distribution: Option<PositionDistribution>,
    pub price_levels: Option<PriceLevels>,
}

pub struct SummaryInputs<'a> {
    pub swaps: &'a [Swap],
    pub wallets: &'a WalletMap,
    pub findings: Vec<Finding>,
    pub risk: &'a RiskScoreBreakdown,
    pub pool_liquidity_usd: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SummaryAssembler {
    top_n: usize,
    narrative_findings: usize,
}

impl SummaryAssembler {
    pub fn new(top_n: usize, narrative_findings: usize) -> Self {
        Self {
            top_n,
            narrative_findings,
        }
    }

    pub fn assemble(&self, inputs: SummaryInputs<'_>) -> TransactionSummary {
        let swaps = inputs.swaps;
        let buy_count = swaps.iter().filter(|s| s.is_buy()).count();
        let buy_volume_usd: f64 = swaps.iter().filter(|s| s.is_buy()).map(Swap::usd_or_zero).sum();
        let sell_volume_usd: f64 = swaps.iter().filter(|s| s.is_sell()).map(Swap::usd_or_zero).sum();
        let total_volume_usd = buy_volume_usd + sell_volume_usd;

        let sized: Vec<f64> = swaps.iter().filter_map(Swap::usd_value).collect();
        let average_transaction_usd = if sized.is_empty() {
            0.0
        } else {
            sized.iter().sum::<f64>() / sized.len() as f64
        };

        let mut summary = TransactionSummary {
            total_transactions: swaps.len(),
            buy_count,
            sell_count: swaps.len() - buy_count,
            unique_wallets: inputs.wallets.len(),
            average_transaction_usd,
            total_volume_usd,
            buy_volume_usd,
            sell_volume_usd,
            top_wallets: self.top_wallets(inputs.wallets, total_volume_usd),
            top_traders: self.top_traders(inputs.wallets),
            findings: inputs.findings,
            narrative: String::new(),
            time_range: time_range(swaps),
            large_flow: large_flow(swaps, average_transaction_usd, inputs.pool_liquidity_usd),
            position_distribution: position_distribution(swaps),
            price_levels: price_levels(swaps),
        };
        summary.narrative = self.narrative(&summary, inputs.risk);
        summary
    }

    fn top_wallets(&self, wallets: &WalletMap, total_volume_usd: f64) -> Vec<TopWallet> {
        ranked_by_volume(wallets)
            .into_iter()
            .take(self.top_n)
            .map(|w| TopWallet {
                address: w.address.clone(),
                raw_volume: w.total_volume,
                volume_usd: w.total_volume_usd,
                share_pct: percent(w.total_volume_usd, total_volume_usd),
                tx_count: w.tx_count,
            })
            .collect()
    }

    fn top_traders(&self, wallets: &WalletMap) -> Vec<TopTrader> {
        ranked_by_activity(wallets)
            .into_iter()
            .take(self.top_n)
            .map(|w| TopTrader {
                address: w.address.clone(),
                buy_count: w.buy_count,
                sell_count: w.sell_count,
                buy_volume_usd: w.buy_volume_usd,
                sell_volume_usd: w.sell_volume_usd,
            })
            .collect()
    }

    fn narrative(&self, summary: &TransactionSummary, risk: &RiskScoreBreakdown) -> String {
        let mut parts = Vec::new();

        if summary.total_transactions == 0 {
            parts.push("No swaps to analyze.".to_string());
        } else {
            parts.push(format!(
                "Analyzed {} swaps from {} wallets (${:.2} volume, {:.1}% buys).",
                summary.total_transactions,
                summary.unique_wallets,
                summary.total_volume_usd,
                percent(summary.buy_count as f64, summary.total_transactions as f64)
            ));
        }

        parts.push(format!(
            "Risk tier {} (score {}).",
            risk.tier.as_str(),
            risk.total_score
        ));

        if summary.findings.is_empty() {
            parts.push("No suspicious patterns detected.".to_string());
        } else {
            let named: Vec<&str> = summary
                .findings
                .iter()
                .take(self.narrative_findings)
                .map(|f| f.description.as_str())
                .collect();
            let hidden = summary.findings.len().saturating_sub(named.len());
            let mut line = format!("Findings: {}", named.join("; "));
            if hidden > 0 {
                line.push_str(&format!(" (+{} more)", hidden));
            }
            line.push('.');
            parts.push(line);
        }

        parts.join(" ")
    }
}

fn time_range(swaps: &[Swap]) -> Option<TimeRange> {
    let earliest = swaps.iter().map(|s| s.timestamp).min()?;
    let latest = swaps.iter().map(|s| s.timestamp).max()?;
    Some(TimeRange {
        earliest: DateTime::<Utc>::from_timestamp_millis(earliest)?,
        latest: DateTime::<Utc>::from_timestamp_millis(latest)?,
    })
}

fn large_flow(swaps: &[Swap], average_usd: f64, liquidity_usd: Option<f64>) -> Option<LargeFlowRatios> {
    let tvl = liquidity_usd.filter(|tvl| *tvl > 0.0)?;
    if average_usd <= 0.0 {
        return None;
    }

    let threshold_usd = average_usd * LARGE_FLOW_MULTIPLIER;
    let large = |swap: &&Swap| swap.usd_value().map_or(false, |usd| usd > threshold_usd);
    let large_buy_volume_usd: f64 = swaps.iter().filter(|s| s.is_buy()).filter(large).map(Swap::usd_or_zero).sum();
    let large_sell_volume_usd: f64 = swaps.iter().filter(|s| s.is_sell()).filter(large).map(Swap::usd_or_zero).sum();

    Some(LargeFlowRatios {
        threshold_usd,
        large_buy_volume_usd,
        large_sell_volume_usd,
        large_buy_pct_of_liquidity: large_buy_volume_usd / tvl * 100.0,
        large_sell_pct_of_liquidity: large_sell_volume_usd / tvl * 100.0,
    })
}

fn position_distribution(swaps: &[Swap]) -> Option<PositionDistribution> {
    if swaps.len() <= POSITION_MIN_SWAPS {
        return None;
    }
    let current_price = cost_basis::current_price(swaps)?;
    let bases = cost_basis::reconstruct(swaps);
    if bases.is_empty() {
        return None;
    }

    let mut profitable: Vec<&CostBasis> = Vec::new();
    let mut in_loss = 0usize;
    let mut break_even = 0usize;
    for basis in bases.values() {
        let gain = basis.gain_pct(current_price);
        if gain > BREAK_EVEN_BAND_PCT {
            profitable.push(basis);
        } else if gain < -BREAK_EVEN_BAND_PCT {
            in_loss += 1;
        } else {
            break_even += 1;
        }
    }

    let total = bases.len() as f64;
    let profit_share = profitable.len() as f64 / total;
    let average_profit_gain_pct = if profitable.is_empty() {
        0.0
    } else {
        profitable.iter().map(|b| b.gain_pct(current_price)).sum::<f64>() / profitable.len() as f64
    };

    let profit_taking_risk = if profit_share > HIGH_RISK_PROFIT_SHARE && average_profit_gain_pct > HIGH_RISK_AVG_GAIN_PCT {
        ProfitTakingRisk::High
    } else if profit_share > MEDIUM_RISK_PROFIT_SHARE || average_profit_gain_pct > MEDIUM_RISK_AVG_GAIN_PCT {
        ProfitTakingRisk::Medium
    } else {
        ProfitTakingRisk::Low
    };

    profitable.sort_by(|a, b| {
        b.gain_ratio(current_price)
            .total_cmp(&a.gain_ratio(current_price))
            .then_with(|| a.wallet.cmp(&b.wallet))
    });
    let smart_money = profitable
        .iter()
        .take(SMART_MONEY_LIMIT)
        .map(|b| SmartMoneyWallet {
            address: b.wallet.clone(),
            entry_price: b.entry_price,
            gain_pct: b.gain_pct(current_price),
            buy_volume_usd: b.buy_volume_usd,
        })
        .collect();

    Some(PositionDistribution {
        current_price,
        wallets_with_cost_basis: bases.len(),
        in_profit: profitable.len(),
        in_loss,
        break_even,
        profit_pct: profit_share * 100.0,
        loss_pct: in_loss as f64 / total * 100.0,
        break_even_pct: break_even as f64 / total * 100.0,
        average_profit_gain_pct,
        profit_taking_risk,
        smart_money,
    })
}

#[derive(Default)]
struct LevelBin {
    trade_count: usize,
    volume_usd: f64,
}

fn price_levels(swaps: &[Swap]) -> Option<PriceLevels> {
    if cost_basis::priced_count(swaps) <= LEVELS_MIN_PRICED {
        return None;
    }
    let current_price = cost_basis::current_price(swaps)?;
    if current_price <= 0.0 {
        return None;
    }

    // Bin k is centred on current * 1.02^k; bin 0 is the current band
    let step = LEVEL_BIN_RATIO.ln();
    let mut bins: BTreeMap<i64, LevelBin> = BTreeMap::new();
    for swap in swaps {
        let Some(price) = swap.known_price() else {
            continue;
        };
        let k = ((price / current_price).ln() / step).round() as i64;
        let bin = bins.entry(k).or_default();
        bin.trade_count += 1;
        bin.volume_usd += swap.usd_or_zero();
    }

    let level = |k: i64, bin: &LevelBin| {
        let factor = LEVEL_BIN_RATIO.powi(k as i32);
        PriceLevel {
            price: current_price * factor,
            trade_count: bin.trade_count,
            volume_usd: bin.volume_usd,
            distance_pct: (factor - 1.0) * 100.0,
        }
    };

    // Busiest first, nearer band wins a tie
    let pick = |mut side: Vec<(i64, &LevelBin)>| -> Vec<PriceLevel> {
        side.sort_by(|a, b| {
            b.1.trade_count
                .cmp(&a.1.trade_count)
                .then_with(|| a.0.abs().cmp(&b.0.abs()))
        });
        side.into_iter().take(LEVELS_PER_SIDE).map(|(k, bin)| level(k, bin)).collect()
    };

    let support = pick(bins.iter().filter(|(k, _)| **k < 0).map(|(k, b)| (*k, b)).collect());
    let resistance = pick(bins.iter().filter(|(k, _)| **k > 0).map(|(k, b)| (*k, b)).collect());

    Some(PriceLevels {
        current_price,
        support,
        resistance,
    })
}
