//! Composite risk scoring
//!
//! Six factors, each 0-100 where higher means riskier, combined with fixed
//! weights. Factors backed by missing context fall back to a documented
//! default score and reason instead of failing the analysis.

use super::context::{HistoricalTrend, PoolContext, RiskTrend, StabilityLevel, TrendDirection, WalletProfile};
use super::normalizer::Swap;
use super::wallet::{ranked_by_volume, WalletMap};
use serde::{Deserialize, Serialize};

mod weights {
    pub const LIQUIDITY: f64 = 0.25;
    pub const AUTHORITIES: f64 = 0.20;
    pub const TRADING_ACTIVITY: f64 = 0.15;
    pub const WALLET_CONCENTRATION: f64 = 0.15;
    pub const BOT_ACTIVITY: f64 = 0.10;
    pub const HISTORICAL_TREND: f64 = 0.15;
}

/// Factors scoring at least this are named in the summary
const SUMMARY_MIN_SCORE: u8 = 50;
const SUMMARY_MAX_FACTORS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Liquidity,
    Authorities,
    TradingActivity,
    WalletConcentration,
    BotActivity,
    HistoricalTrend,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 6] = [
        RiskCategory::Liquidity,
        RiskCategory::Authorities,
        RiskCategory::TradingActivity,
        RiskCategory::WalletConcentration,
        RiskCategory::BotActivity,
        RiskCategory::HistoricalTrend,
    ];

    pub fn weight(&self) -> f64 {
        match self {
            RiskCategory::Liquidity => weights::LIQUIDITY,
            RiskCategory::Authorities => weights::AUTHORITIES,
            RiskCategory::TradingActivity => weights::TRADING_ACTIVITY,
            RiskCategory::WalletConcentration => weights::WALLET_CONCENTRATION,
            RiskCategory::BotActivity => weights::BOT_ACTIVITY,
            RiskCategory::HistoricalTrend => weights::HISTORICAL_TREND,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskCategory::Liquidity => "Liquidity",
            RiskCategory::Authorities => "Token authorities",
            RiskCategory::TradingActivity => "Trading activity",
            RiskCategory::WalletConcentration => "Wallet concentration",
            RiskCategory::BotActivity => "Bot activity",
            RiskCategory::HistoricalTrend => "Historical trend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactor {
    pub name: RiskCategory,
    pub score: u8,
    pub weight: f64,
    pub reason: String,
}

impl RiskFactor {
    pub fn new(name: RiskCategory, score: u8, reason: impl Into<String>) -> Self {
        Self {
            name,
            score: score.min(100),
            weight: name.weight(),
            reason: reason.into(),
        }
    }

    pub fn weighted(&self) -> f64 {
        self.score as f64 * self.weight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s < 20 => RiskTier::VeryLow,
            s if s < 40 => RiskTier::Low,
            s if s < 60 => RiskTier::Medium,
            s if s < 80 => RiskTier::High,
            _ => RiskTier::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::VeryLow => "very_low",
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskScoreBreakdown {
    pub total_score: u32,
    pub tier: RiskTier,
    pub factors: Vec<RiskFactor>,
    pub summary: String,
}

/// What the scorer reads; everything but the batch is optional
#[derive(Debug, Clone, Copy)]
pub struct RiskInputs<'a> {
    pub swaps: &'a [Swap],
    pub wallets: &'a WalletMap,
    pub pool: Option<&'a PoolContext>,
    pub wallet_profiles: Option<&'a [WalletProfile]>,
    pub history: Option<&'a HistoricalTrend>,
}

#[derive(Debug, Clone, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, inputs: &RiskInputs<'_>) -> RiskScoreBreakdown {
        let factors = vec![
            self.liquidity_risk(inputs.pool),
            self.authority_risk(inputs.pool),
            self.trading_activity_risk(inputs.swaps),
            self.concentration_risk(inputs.wallets),
            self.bot_activity_risk(inputs.wallet_profiles),
            self.historical_trend_risk(inputs.history),
        ];
        self.combine(factors)
    }

    pub fn liquidity_risk(&self, pool: Option<&PoolContext>) -> RiskFactor {
        let Some(tvl) = pool.and_then(PoolContext::liquidity_usd) else {
            return RiskFactor::new(RiskCategory::Liquidity, 90, "Liquidity data unavailable");
        };

        let (score, reason) = match tvl {
            t if t >= 1_000_000.0 => (0, "Deep liquidity"),
            t if t >= 500_000.0 => (10, "Healthy liquidity"),
            t if t >= 100_000.0 => (30, "Moderate liquidity"),
            t if t >= 10_000.0 => (60, "Thin liquidity"),
            _ => (90, "Very low liquidity"),
        };
        RiskFactor::new(RiskCategory::Liquidity, score, format!("{} (${:.0} TVL)", reason, tvl))
    }

    pub fn authority_risk(&self, pool: Option<&PoolContext>) -> RiskFactor {
        let Some(pool) = pool else {
            return RiskFactor::new(RiskCategory::Authorities, 50, "Token authority data unavailable");
        };

        match (pool.has_freeze_authority(), pool.has_mint_authority()) {
            (true, true) => RiskFactor::new(
                RiskCategory::Authorities,
                90,
                "Freeze and mint authorities are both active",
            ),
            (true, false) => RiskFactor::new(RiskCategory::Authorities, 70, "Freeze authority is active"),
            (false, true) => RiskFactor::new(RiskCategory::Authorities, 50, "Mint authority is active"),
            (false, false) => RiskFactor::new(RiskCategory::Authorities, 0, "Authorities revoked"),
        }
    }

    pub fn trading_activity_risk(&self, swaps: &[Swap]) -> RiskFactor {
        if swaps.is_empty() {
            return RiskFactor::new(RiskCategory::TradingActivity, 80, "No trading activity");
        }

        let buy_ratio = swaps.iter().filter(|s| s.is_buy()).count() as f64 / swaps.len() as f64;
        let imbalance = (buy_ratio - 0.5).abs() * 2.0;
        let score = match imbalance {
            i if i < 0.2 => 0,
            i if i < 0.4 => 30,
            i if i < 0.6 => 60,
            _ => 90,
        };
        RiskFactor::new(
            RiskCategory::TradingActivity,
            score,
            format!("Buy ratio {:.1}% (imbalance {:.2})", buy_ratio * 100.0, imbalance),
        )
    }

    pub fn concentration_risk(&self, wallets: &WalletMap) -> RiskFactor {
        let total_volume: f64 = wallets.values().map(|w| w.total_volume_usd).sum();
        let top = ranked_by_volume(wallets).into_iter().next();

        let Some(top) = top.filter(|_| total_volume > 0.0) else {
            return RiskFactor::new(RiskCategory::WalletConcentration, 50, "No volume to measure concentration");
        };

        let share_pct = top.total_volume_usd / total_volume * 100.0;
        let score = match share_pct {
            s if s < 10.0 => 0,
            s if s < 20.0 => 25,
            s if s < 35.0 => 50,
            s if s < 50.0 => 70,
            _ => 90,
        };
        RiskFactor::new(
            RiskCategory::WalletConcentration,
            score,
            format!("Top wallet holds {:.1}% of volume", share_pct),
        )
    }

    pub fn bot_activity_risk(&self, profiles: Option<&[WalletProfile]>) -> RiskFactor {
        let profiles = match profiles {
            Some(p) if !p.is_empty() => p,
            _ => return RiskFactor::new(RiskCategory::BotActivity, 0, "No wallet profile data"),
        };

        let bots = profiles.iter().filter(|p| p.is_likely_bot).count();
        let fraction = bots as f64 / profiles.len() as f64;
        let score = match fraction {
            f if f <= 0.0 => 0,
            f if f < 0.25 => 20,
            f if f < 0.5 => 50,
            _ => 80,
        };
        RiskFactor::new(
            RiskCategory::BotActivity,
            score,
            format!("{} of {} profiled wallets look automated", bots, profiles.len()),
        )
    }

    pub fn historical_trend_risk(&self, history: Option<&HistoricalTrend>) -> RiskFactor {
        let Some(history) = history else {
            return RiskFactor::new(
                RiskCategory::HistoricalTrend,
                50,
                "No historical data available; exercise caution",
            );
        };

        let mut score: u32 = 0;
        let mut signals = Vec::new();

        if history.tvl_trend == Some(TrendDirection::Decreasing) {
            score += 30;
            signals.push("TVL declining");
        }
        if history.volume_trend == Some(TrendDirection::Decreasing) {
            score += 20;
            signals.push("volume declining");
        }
        match history.stability_level {
            Some(StabilityLevel::Volatile) => {
                score += 25;
                signals.push("volatile");
            }
            Some(StabilityLevel::Moderate) => {
                score += 10;
                signals.push("moderately stable");
            }
            _ => {}
        }
        if history.risk_trend == Some(RiskTrend::Worsening) {
            score += 25;
            signals.push("risk worsening");
        }

        let reason = if signals.is_empty() {
            "Historical trends stable".to_string()
        } else {
            signals.join(", ")
        };
        RiskFactor::new(RiskCategory::HistoricalTrend, score.min(100) as u8, reason)
    }

    /// Weighted total, tier and summary for an arbitrary factor set
    pub fn combine(&self, factors: Vec<RiskFactor>) -> RiskScoreBreakdown {
        let weighted: f64 = factors.iter().map(RiskFactor::weighted).sum();
        let total_score = weighted.round().clamp(0.0, 100.0) as u32;

        let mut top: Vec<&RiskFactor> = factors.iter().filter(|f| f.score >= SUMMARY_MIN_SCORE).collect();
        top.sort_by(|a, b| b.score.cmp(&a.score));
        top.truncate(SUMMARY_MAX_FACTORS);

        let summary = if top.is_empty() {
            "No major risk factors identified".to_string()
        } else {
            let named: Vec<String> = top
                .iter()
                .map(|f| format!("{} ({}): {}", f.name.label(), f.score, f.reason))
                .collect();
            format!("Key risk factors: {}", named.join("; "))
        };

        RiskScoreBreakdown {
            total_score,
            tier: RiskTier::from_score(total_score),
            factors,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis_core::normalizer::TradeDirection;
    use crate::analysis_core::wallet::aggregate_wallets;
    use alloy_primitives::U256;

    fn create_test_swap(timestamp: i64, wallet: &str, direction: TradeDirection, usd: f64) -> Swap {
        Swap {
            signature: format!("sig_{}_{}", wallet, timestamp),
            timestamp,
            wallet: wallet.to_string(),
            direction,
            amount_in: U256::from(1u64),
            amount_out: U256::from(1u64),
            amount_in_usd: Some(usd),
            amount_out_usd: None,
            price_token: None,
            source: None,
        }
    }

    fn pool(tvl: f64) -> PoolContext {
        PoolContext {
            tvl_usd: Some(tvl),
            ..Default::default()
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = RiskCategory::ALL.iter().map(|c| c.weight()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_liquidity_steps() {
        let scorer = RiskScorer::new();
        let cases = [
            (2_000_000.0, 0),
            (1_000_000.0, 0),
            (999_999.0, 10),
            (500_000.0, 10),
            (100_000.0, 30),
            (10_000.0, 60),
            (9_999.0, 90),
            (0.0, 90),
        ];
        for (tvl, expected) in cases {
            assert_eq!(scorer.liquidity_risk(Some(&pool(tvl))).score, expected, "tvl {}", tvl);
        }
        assert_eq!(scorer.liquidity_risk(None).score, 90);
    }

    #[test]
    fn test_authority_combinations() {
        let scorer = RiskScorer::new();
        let mut p = pool(1.0);
        assert_eq!(scorer.authority_risk(Some(&p)).score, 0);

        p.token_b_mint_authority = Some("Mint".to_string());
        assert_eq!(scorer.authority_risk(Some(&p)).score, 50);

        p.token_a_freeze_authority = Some("Frz".to_string());
        assert_eq!(scorer.authority_risk(Some(&p)).score, 90);

        p.token_b_mint_authority = None;
        assert_eq!(scorer.authority_risk(Some(&p)).score, 70);
    }

    #[test]
    fn test_trading_activity_imbalance() {
        let scorer = RiskScorer::new();
        assert_eq!(scorer.trading_activity_risk(&[]).score, 80);

        // 15 buys / 5 sells: imbalance 0.5 lands in the 60 step
        let swaps: Vec<Swap> = (0..20)
            .map(|i| {
                let direction = if i < 15 { TradeDirection::Buy } else { TradeDirection::Sell };
                create_test_swap(i + 1, "w", direction, 1.0)
            })
            .collect();
        assert_eq!(scorer.trading_activity_risk(&swaps).score, 60);
    }

    #[test]
    fn test_concentration_steps() {
        let scorer = RiskScorer::new();
        let mut swaps = vec![create_test_swap(1, "top", TradeDirection::Buy, 60.0)];
        swaps.extend((0..4).map(|i| create_test_swap(2 + i, &format!("w{}", i), TradeDirection::Buy, 10.0)));

        let factor = scorer.concentration_risk(&aggregate_wallets(&swaps));
        assert_eq!(factor.score, 90);
        assert_eq!(scorer.concentration_risk(&WalletMap::new()).score, 50);
    }

    #[test]
    fn test_bot_activity_degrades_without_profiles() {
        let scorer = RiskScorer::new();
        assert_eq!(scorer.bot_activity_risk(None).score, 0);
        let empty: Vec<WalletProfile> = Vec::new();
        assert_eq!(scorer.bot_activity_risk(Some(empty.as_slice())).score, 0);

        let profiles: Vec<WalletProfile> = (0..4)
            .map(|i| WalletProfile {
                address: format!("w{}", i),
                is_likely_bot: i == 0,
                age_in_days: None,
            })
            .collect();
        // exactly 25% is not "< 25%"
        assert_eq!(scorer.bot_activity_risk(Some(profiles.as_slice())).score, 50);
    }

    #[test]
    fn test_history_accumulates_and_caps() {
        let scorer = RiskScorer::new();
        assert_eq!(scorer.historical_trend_risk(None).score, 50);

        let everything_bad = HistoricalTrend {
            tvl_trend: Some(TrendDirection::Decreasing),
            volume_trend: Some(TrendDirection::Decreasing),
            stability_level: Some(StabilityLevel::Volatile),
            risk_trend: Some(RiskTrend::Worsening),
        };
        assert_eq!(scorer.historical_trend_risk(Some(&everything_bad)).score, 100);

        let mild = HistoricalTrend {
            stability_level: Some(StabilityLevel::Moderate),
            ..Default::default()
        };
        assert_eq!(scorer.historical_trend_risk(Some(&mild)).score, 10);
    }

    #[test]
    fn test_tier_breakpoints() {
        assert_eq!(RiskTier::from_score(19), RiskTier::VeryLow);
        assert_eq!(RiskTier::from_score(20), RiskTier::Low);
        assert_eq!(RiskTier::from_score(59), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(60), RiskTier::High);
        assert_eq!(RiskTier::from_score(80), RiskTier::Critical);
    }

    #[test]
    fn test_combine_summary_lists_top_three() {
        let scorer = RiskScorer::new();
        let factors = vec![
            RiskFactor::new(RiskCategory::Liquidity, 90, "thin"),
            RiskFactor::new(RiskCategory::Authorities, 70, "freeze"),
            RiskFactor::new(RiskCategory::TradingActivity, 40, "ok"),
            RiskFactor::new(RiskCategory::WalletConcentration, 50, "top"),
            RiskFactor::new(RiskCategory::BotActivity, 80, "bots"),
            RiskFactor::new(RiskCategory::HistoricalTrend, 60, "none"),
        ];
        let breakdown = scorer.combine(factors);

        // 22.5 + 14 + 6 + 7.5 + 8 + 9 = 67
        assert_eq!(breakdown.total_score, 67);
        assert_eq!(breakdown.tier, RiskTier::High);
        assert_eq!(
            breakdown.summary,
            "Key risk factors: Liquidity (90): thin; Bot activity (80): bots; Token authorities (70): freeze"
        );
    }

    #[test]
    fn test_combine_without_major_factors() {
        let scorer = RiskScorer::new();
        let factors = RiskCategory::ALL.iter().map(|c| RiskFactor::new(*c, 10, "fine")).collect();
        let breakdown = scorer.combine(factors);
        assert_eq!(breakdown.total_score, 10);
        assert_eq!(breakdown.summary, "No major risk factors identified");
    }
}
