//! Optional context supplied by collaborators alongside the swap batch
//!
//! Every field is optional on the wire. Missing context never fails an
//! analysis; the risk scorer falls back to its documented defaults.

use serde::{Deserialize, Serialize};

/// Pool liquidity and token authority snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolContext {
    #[serde(rename = "tvlUSD", alias = "tvlUsd")]
    pub tvl_usd: Option<f64>,
    pub token_a_freeze_authority: Option<String>,
    pub token_a_mint_authority: Option<String>,
    pub token_b_freeze_authority: Option<String>,
    pub token_b_mint_authority: Option<String>,
}

impl PoolContext {
    /// TVL usable as a denominator
    pub fn liquidity_usd(&self) -> Option<f64> {
        self.tvl_usd.filter(|tvl| tvl.is_finite() && *tvl >= 0.0)
    }

    pub fn has_freeze_authority(&self) -> bool {
        is_set(&self.token_a_freeze_authority) || is_set(&self.token_b_freeze_authority)
    }

    pub fn has_mint_authority(&self) -> bool {
        is_set(&self.token_a_mint_authority) || is_set(&self.token_b_mint_authority)
    }
}

fn is_set(authority: &Option<String>) -> bool {
    authority.as_deref().map_or(false, |a| !a.trim().is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletProfile {
    pub address: String,
    pub is_likely_bot: bool,
    pub age_in_days: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilityLevel {
    Stable,
    Moderate,
    Volatile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTrend {
    Improving,
    Stable,
    Worsening,
}

/// Trend signals computed elsewhere from earlier snapshots of the pool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoricalTrend {
    pub tvl_trend: Option<TrendDirection>,
    pub volume_trend: Option<TrendDirection>,
    pub stability_level: Option<StabilityLevel>,
    pub risk_trend: Option<RiskTrend>,
}

/// Everything besides the swaps that an analysis may use
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisContext {
    pub pool: Option<PoolContext>,
    pub wallet_profiles: Option<Vec<WalletProfile>>,
    pub history: Option<HistoricalTrend>,
}

impl AnalysisContext {
    pub fn pool_liquidity_usd(&self) -> Option<f64> {
        self.pool.as_ref().and_then(PoolContext::liquidity_usd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_context_wire_names() {
        let pool: PoolContext = serde_json::from_str(
            r#"{"tvlUSD": 125000.5, "tokenAFreezeAuthority": "Frz1", "tokenBMintAuthority": ""}"#,
        )
        .unwrap();

        assert_eq!(pool.tvl_usd, Some(125000.5));
        assert!(pool.has_freeze_authority());
        // blank authority counts as revoked
        assert!(!pool.has_mint_authority());
    }

    #[test]
    fn test_negative_tvl_is_not_liquidity() {
        let pool = PoolContext {
            tvl_usd: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(pool.liquidity_usd(), None);
    }

    #[test]
    fn test_history_parses_lowercase_signals() {
        let history: HistoricalTrend = serde_json::from_str(
            r#"{"tvlTrend": "decreasing", "stabilityLevel": "volatile", "riskTrend": "worsening"}"#,
        )
        .unwrap();

        assert_eq!(history.tvl_trend, Some(TrendDirection::Decreasing));
        assert_eq!(history.volume_trend, None);
        assert_eq!(history.stability_level, Some(StabilityLevel::Volatile));
        assert_eq!(history.risk_trend, Some(RiskTrend::Worsening));
    }

    #[test]
    fn test_wallet_profile_ignores_extra_fields() {
        let profile: WalletProfile =
            serde_json::from_str(r#"{"address": "w1", "isLikelyBot": true, "ageInDays": 3.5, "label": "x"}"#)
                .unwrap();
        assert!(profile.is_likely_bot);
        assert_eq!(profile.age_in_days, Some(3.5));
    }
}
