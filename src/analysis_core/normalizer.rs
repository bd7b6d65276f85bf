//! Swap normalization from upstream parser records to the unified Swap struct
//!
//! Malformed records are dropped and counted; the batch itself never fails here.

use super::amount::{self, RawAmount};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Swap record as emitted by a chain/DEX specific parser
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSwap {
    #[serde(default, alias = "txId", alias = "transactionId")]
    pub signature: Option<String>,
    /// Milliseconds since epoch
    #[serde(default, alias = "blockTime")]
    pub timestamp: Option<i64>,
    #[serde(default, alias = "owner", alias = "walletAddress")]
    pub wallet: Option<String>,
    #[serde(default, alias = "type", alias = "side")]
    pub direction: Option<String>,
    #[serde(default)]
    pub amount_in: Option<RawAmount>,
    #[serde(default)]
    pub amount_out: Option<RawAmount>,
    #[serde(default)]
    pub amount_in_usd: Option<f64>,
    #[serde(default)]
    pub amount_out_usd: Option<f64>,
    #[serde(default)]
    pub price_token: Option<f64>,
    #[serde(default, alias = "chain")]
    pub source: Option<String>,
}

impl RawSwap {
    /// Parse a RawSwap from a JSONL line
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(TradeDirection::Buy),
            "sell" => Some(TradeDirection::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Buy => "buy",
            TradeDirection::Sell => "sell",
        }
    }
}

/// Validated swap, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swap {
    pub signature: String,
    pub timestamp: i64,
    pub wallet: String,
    pub direction: TradeDirection,
    #[serde(with = "amount::decimal")]
    pub amount_in: U256,
    #[serde(with = "amount::decimal")]
    pub amount_out: U256,
    pub amount_in_usd: Option<f64>,
    pub amount_out_usd: Option<f64>,
    pub price_token: Option<f64>,
    pub source: Option<String>,
}

impl Swap {
    /// Check if this swap is a buy of the tracked token
    pub fn is_buy(&self) -> bool {
        matches!(self.direction, TradeDirection::Buy)
    }

    /// Check if this swap is a sell of the tracked token
    pub fn is_sell(&self) -> bool {
        matches!(self.direction, TradeDirection::Sell)
    }

    /// USD size of the trade: the input leg when priced, else the output leg.
    pub fn usd_value(&self) -> Option<f64> {
        self.amount_in_usd.or(self.amount_out_usd)
    }

    /// USD size with unknown treated as zero contribution
    pub fn usd_or_zero(&self) -> f64 {
        self.usd_value().unwrap_or(0.0)
    }

    /// Raw units of the tracked token moved by this swap
    pub fn token_quantity(&self) -> U256 {
        match self.direction {
            TradeDirection::Buy => self.amount_out,
            TradeDirection::Sell => self.amount_in,
        }
    }

    /// Token price reported by the parser
    pub fn known_price(&self) -> Option<f64> {
        self.price_token
    }

    /// Price per raw token unit derived from the USD size
    pub fn implied_price(&self) -> Option<f64> {
        let usd = self.usd_value()?;
        let quantity = amount::to_f64(&self.token_quantity());
        if quantity > 0.0 && usd > 0.0 {
            Some(usd / quantity)
        } else {
            None
        }
    }

    /// Price on the given scale only; never mixes reported and implied prices
    pub fn price_from(&self, source: PriceSource) -> Option<f64> {
        match source {
            PriceSource::Reported => self.known_price(),
            PriceSource::Implied => self.implied_price(),
        }
    }
}

/// Which price series a batch is read on.
///
/// `priceToken` is per whole token while the implied price is per raw unit,
/// so the two differ by the token's decimals and cannot be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Reported,
    Implied,
}

impl PriceSource {
    /// Reported prices when any swap carries one, implied prices otherwise
    pub fn for_batch(swaps: &[Swap]) -> Self {
        if swaps.iter().any(|s| s.price_token.is_some()) {
            PriceSource::Reported
        } else {
            PriceSource::Implied
        }
    }
}

/// Why a record was dropped
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeError {
    MissingSignature,
    MissingWallet,
    MissingTimestamp,
    NonPositiveTimestamp(i64),
    InvalidDirection(Option<String>),
    InvalidAmount(&'static str),
    Unparseable(String),
}

impl NormalizeError {
    /// Stable key used when counting drop reasons
    pub fn reason(&self) -> &'static str {
        match self {
            NormalizeError::MissingSignature => "missing_signature",
            NormalizeError::MissingWallet => "missing_wallet",
            NormalizeError::MissingTimestamp => "missing_timestamp",
            NormalizeError::NonPositiveTimestamp(_) => "non_positive_timestamp",
            NormalizeError::InvalidDirection(_) => "invalid_direction",
            NormalizeError::InvalidAmount(_) => "invalid_amount",
            NormalizeError::Unparseable(_) => "unparseable",
        }
    }
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::MissingSignature => write!(f, "missing transaction signature"),
            NormalizeError::MissingWallet => write!(f, "missing wallet address"),
            NormalizeError::MissingTimestamp => write!(f, "missing timestamp"),
            NormalizeError::NonPositiveTimestamp(ts) => write!(f, "non-positive timestamp {}", ts),
            NormalizeError::InvalidDirection(Some(d)) => write!(f, "invalid direction '{}'", d),
            NormalizeError::InvalidDirection(None) => write!(f, "missing direction"),
            NormalizeError::InvalidAmount(field) => write!(f, "invalid amount in {}", field),
            NormalizeError::Unparseable(e) => write!(f, "unparseable record: {}", e),
        }
    }
}

impl std::error::Error for NormalizeError {}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Keep USD estimates only when they are usable numbers
fn usable_usd(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

fn usable_price(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn coerce_amount(value: Option<&RawAmount>, field: &'static str) -> Result<U256, NormalizeError> {
    match value {
        None => Ok(U256::ZERO),
        Some(raw) => raw.to_u256().ok_or(NormalizeError::InvalidAmount(field)),
    }
}

impl TryFrom<RawSwap> for Swap {
    type Error = NormalizeError;

    fn try_from(raw: RawSwap) -> Result<Self, Self::Error> {
        let signature = non_empty(raw.signature).ok_or(NormalizeError::MissingSignature)?;
        let wallet = non_empty(raw.wallet).ok_or(NormalizeError::MissingWallet)?;
        let timestamp = raw.timestamp.ok_or(NormalizeError::MissingTimestamp)?;
        if timestamp <= 0 {
            return Err(NormalizeError::NonPositiveTimestamp(timestamp));
        }

        let direction = match raw.direction.as_deref() {
            Some(d) => TradeDirection::parse(d)
                .ok_or_else(|| NormalizeError::InvalidDirection(Some(d.to_string())))?,
            None => return Err(NormalizeError::InvalidDirection(None)),
        };

        let amount_in = coerce_amount(raw.amount_in.as_ref(), "amountIn")?;
        let amount_out = coerce_amount(raw.amount_out.as_ref(), "amountOut")?;

        Ok(Swap {
            signature,
            timestamp,
            wallet,
            direction,
            amount_in,
            amount_out,
            amount_in_usd: usable_usd(raw.amount_in_usd),
            amount_out_usd: usable_usd(raw.amount_out_usd),
            price_token: usable_price(raw.price_token),
            source: non_empty(raw.source),
        })
    }
}

/// Output of a normalization pass
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub swaps: Vec<Swap>,
    pub report: NormalizationReport,
}

/// Data-quality counters carried into the analysis report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationReport {
    pub received: usize,
    pub accepted: usize,
    pub dropped: usize,
    pub drop_reasons: BTreeMap<String, usize>,
}

impl NormalizationReport {
    fn record_drop(&mut self, error: &NormalizeError) {
        self.dropped += 1;
        *self.drop_reasons.entry(error.reason().to_string()).or_insert(0) += 1;
    }
}

impl NormalizedBatch {
    fn push(&mut self, result: Result<Swap, NormalizeError>) {
        self.report.received += 1;
        match result {
            Ok(swap) => {
                self.report.accepted += 1;
                self.swaps.push(swap);
            }
            Err(e) => {
                log::debug!("Dropping malformed swap record #{}: {}", self.report.received, e);
                self.report.record_drop(&e);
            }
        }
    }
}

/// Normalize typed raw records, preserving input order
pub fn normalize_swaps<I>(records: I) -> NormalizedBatch
where
    I: IntoIterator<Item = RawSwap>,
{
    let mut batch = NormalizedBatch::default();
    for raw in records {
        batch.push(Swap::try_from(raw));
    }
    batch
}

/// Normalize untyped JSON records; elements that do not even parse as a record are dropped
pub fn normalize_values(records: &[serde_json::Value]) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for value in records {
        let result = serde_json::from_value::<RawSwap>(value.clone())
            .map_err(|e| NormalizeError::Unparseable(e.to_string()))
            .and_then(Swap::try_from);
        batch.push(result);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_raw_swap(signature: &str, wallet: &str, direction: &str) -> RawSwap {
        RawSwap {
            signature: Some(signature.to_string()),
            timestamp: Some(1_763_026_318_000),
            wallet: Some(wallet.to_string()),
            direction: Some(direction.to_string()),
            amount_in: Some(RawAmount::Text("1000000000".to_string())),
            amount_out: Some(RawAmount::Unsigned(250_000)),
            amount_in_usd: Some(150.0),
            amount_out_usd: None,
            price_token: Some(0.0006),
            source: Some("raydium".to_string()),
        }
    }

    #[test]
    fn test_parse_jsonl_swap() {
        let line = r#"{"signature":"7JLwTTCQhtKx8xwjDDkZt6sAeLGNMsJnSmtPfj3cSKHR","timestamp":1763026318000,"wallet":"EcBxqSKKzWyBLhLLiw9VCrCvd6UwHG9A4TZ1sphpGqxf","direction":"SELL","amountIn":"1234567890123456789","amountOut":7463367327,"amountInUsd":null,"amountOutUsd":1119.5,"priceToken":0.00091,"source":"orca"}"#;

        let raw = RawSwap::from_jsonl(line).unwrap();
        let swap = Swap::try_from(raw).unwrap();
        assert_eq!(swap.direction, TradeDirection::Sell);
        assert!(swap.is_sell());
        assert_eq!(swap.amount_in.to_string(), "1234567890123456789");
        assert_eq!(swap.amount_in_usd, None);
        assert_eq!(swap.usd_value(), Some(1119.5));
        assert_eq!(swap.source.as_deref(), Some("orca"));
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let mut raw = create_raw_swap("sig", "wallet", "buy");
        raw.signature = None;
        assert_eq!(Swap::try_from(raw), Err(NormalizeError::MissingSignature));

        let mut raw = create_raw_swap("sig", "wallet", "buy");
        raw.wallet = Some("   ".to_string());
        assert_eq!(Swap::try_from(raw), Err(NormalizeError::MissingWallet));

        let mut raw = create_raw_swap("sig", "wallet", "buy");
        raw.timestamp = None;
        assert_eq!(Swap::try_from(raw), Err(NormalizeError::MissingTimestamp));

        let mut raw = create_raw_swap("sig", "wallet", "buy");
        raw.timestamp = Some(0);
        assert_eq!(Swap::try_from(raw), Err(NormalizeError::NonPositiveTimestamp(0)));
    }

    #[test]
    fn test_invalid_direction_and_amount() {
        let raw = create_raw_swap("sig", "wallet", "transfer");
        assert!(matches!(
            Swap::try_from(raw),
            Err(NormalizeError::InvalidDirection(Some(_)))
        ));

        let mut raw = create_raw_swap("sig", "wallet", "buy");
        raw.amount_in = Some(RawAmount::Text("-10".to_string()));
        assert_eq!(Swap::try_from(raw), Err(NormalizeError::InvalidAmount("amountIn")));
    }

    #[test]
    fn test_usd_fields_stay_absent() {
        let mut raw = create_raw_swap("sig", "wallet", "buy");
        raw.amount_in_usd = None;
        raw.price_token = Some(f64::NAN);
        let swap = Swap::try_from(raw).unwrap();
        assert_eq!(swap.amount_in_usd, None);
        assert_eq!(swap.usd_value(), None);
        assert_eq!(swap.usd_or_zero(), 0.0);
        assert_eq!(swap.price_token, None);
    }

    #[test]
    fn test_batch_preserves_order_and_counts_drops() {
        let mut bad = create_raw_swap("bad", "w", "buy");
        bad.wallet = None;

        let batch = normalize_swaps(vec![
            create_raw_swap("b", "w1", "buy"),
            bad,
            create_raw_swap("a", "w2", "sell"),
        ]);

        assert_eq!(batch.swaps.len(), 2);
        assert_eq!(batch.swaps[0].signature, "b");
        assert_eq!(batch.swaps[1].signature, "a");
        assert_eq!(batch.report.received, 3);
        assert_eq!(batch.report.dropped, 1);
        assert_eq!(batch.report.drop_reasons.get("missing_wallet"), Some(&1));
    }

    #[test]
    fn test_normalize_values_large_amounts() {
        let values = vec![
            json!({"signature": "s1", "timestamp": 5, "wallet": "w", "direction": "buy",
                   "amountIn": "123456789012345678901234567890"}),
            serde_json::from_str(
                r#"{"signature": "s2", "timestamp": 6, "wallet": "w", "direction": "buy",
                    "amountIn": 123456789012345678901234567890}"#,
            )
            .unwrap(),
        ];

        let batch = normalize_values(&values);
        assert_eq!(batch.swaps.len(), 1);
        assert_eq!(batch.swaps[0].amount_in.to_string(), "123456789012345678901234567890");
        assert_eq!(batch.report.drop_reasons.get("invalid_amount"), Some(&1));
    }

    #[test]
    fn test_normalize_values_drops_non_records() {
        let values = vec![
            json!({"signature": "s1", "timestamp": 5, "wallet": "w", "direction": "buy"}),
            json!("not a record"),
            json!({"signature": "s2", "timestamp": "yesterday", "wallet": "w", "direction": "buy"}),
        ];

        let batch = normalize_values(&values);
        assert_eq!(batch.swaps.len(), 1);
        assert_eq!(batch.swaps[0].amount_in, U256::ZERO);
        assert_eq!(batch.report.drop_reasons.get("unparseable"), Some(&2));
    }

    #[test]
    fn test_implied_price_from_usd() {
        let swap = Swap::try_from(create_raw_swap("sig", "wallet", "buy")).unwrap();
        // buy: 150 USD for 250_000 raw units
        assert_eq!(swap.implied_price(), Some(150.0 / 250_000.0));
        assert_eq!(swap.price_from(PriceSource::Implied), Some(0.0006));
        assert_eq!(swap.price_from(PriceSource::Reported), None);
    }

    #[test]
    fn test_price_source_prefers_reported_series() {
        let unpriced = Swap::try_from(create_raw_swap("s1", "wallet", "buy")).unwrap();
        let mut priced = unpriced.clone();
        priced.signature = "s2".to_string();
        priced.price_token = Some(0.6);

        assert_eq!(PriceSource::for_batch(&[unpriced.clone()]), PriceSource::Implied);
        assert_eq!(PriceSource::for_batch(&[unpriced, priced]), PriceSource::Reported);
        assert_eq!(PriceSource::for_batch(&[]), PriceSource::Implied);
    }
}
