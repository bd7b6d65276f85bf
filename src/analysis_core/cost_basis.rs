//! Per-wallet cost basis reconstruction
//!
//! Volume-weighted average entry price from buy-side trades that carry a
//! reported `priceToken`. Shared by the profit-pressure detector and the
//! position distribution in the summary so the weighting is computed one way.

use super::amount;
use super::normalizer::Swap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct CostBasis {
    pub wallet: String,
    /// Weighted by token quantity received
    pub entry_price: f64,
    pub quantity: f64,
    pub buy_volume_usd: f64,
}

impl CostBasis {
    /// current / entry; 1.0 is break-even
    pub fn gain_ratio(&self, current_price: f64) -> f64 {
        current_price / self.entry_price
    }

    pub fn gain_pct(&self, current_price: f64) -> f64 {
        (self.gain_ratio(current_price) - 1.0) * 100.0
    }
}

#[derive(Default)]
struct Accumulator {
    weighted_price: f64,
    quantity: f64,
    buy_volume_usd: f64,
}

/// Wallets with at least one priced buy of non-zero quantity
pub fn reconstruct(swaps: &[Swap]) -> BTreeMap<String, CostBasis> {
    let mut accumulators: BTreeMap<&str, Accumulator> = BTreeMap::new();

    for swap in swaps.iter().filter(|s| s.is_buy()) {
        let Some(price) = swap.known_price() else {
            continue;
        };
        let quantity = amount::to_f64(&swap.token_quantity());
        if quantity <= 0.0 {
            continue;
        }

        let acc = accumulators.entry(swap.wallet.as_str()).or_default();
        acc.weighted_price += price * quantity;
        acc.quantity += quantity;
        acc.buy_volume_usd += swap.usd_or_zero();
    }

    accumulators
        .into_iter()
        .filter(|(_, acc)| acc.quantity > 0.0)
        .map(|(wallet, acc)| {
            let basis = CostBasis {
                wallet: wallet.to_string(),
                entry_price: acc.weighted_price / acc.quantity,
                quantity: acc.quantity,
                buy_volume_usd: acc.buy_volume_usd,
            };
            (wallet.to_string(), basis)
        })
        .collect()
}

/// Most recent reported price; later signature wins a timestamp tie
pub fn current_price(swaps: &[Swap]) -> Option<f64> {
    swaps
        .iter()
        .filter_map(|s| s.known_price().map(|price| (s.timestamp, s.signature.as_str(), price)))
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)))
        .map(|(_, _, price)| price)
}

/// Count of swaps carrying a reported price
pub fn priced_count(swaps: &[Swap]) -> usize {
    swaps.iter().filter(|s| s.known_price().is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis_core::normalizer::TradeDirection;
    use alloy_primitives::U256;

    fn create_test_swap(timestamp: i64, wallet: &str, direction: TradeDirection, quantity: u64, price: Option<f64>) -> Swap {
        Swap {
            signature: format!("sig_{}_{}", wallet, timestamp),
            timestamp,
            wallet: wallet.to_string(),
            direction,
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(quantity),
            amount_in_usd: Some(10.0),
            amount_out_usd: None,
            price_token: price,
            source: None,
        }
    }

    #[test]
    fn test_weighted_entry_price() {
        let swaps = vec![
            create_test_swap(1, "a", TradeDirection::Buy, 100, Some(1.0)),
            create_test_swap(2, "a", TradeDirection::Buy, 300, Some(2.0)),
            // ignored: sell, unpriced, zero quantity
            create_test_swap(3, "a", TradeDirection::Sell, 100, Some(9.0)),
            create_test_swap(4, "a", TradeDirection::Buy, 100, None),
            create_test_swap(5, "b", TradeDirection::Buy, 0, Some(3.0)),
        ];

        let basis = reconstruct(&swaps);
        assert_eq!(basis.len(), 1);
        let a = &basis["a"];
        assert!((a.entry_price - 1.75).abs() < 1e-12);
        assert_eq!(a.quantity, 400.0);
        assert_eq!(a.buy_volume_usd, 20.0);
        assert!((a.gain_ratio(3.5) - 2.0).abs() < 1e-12);
        assert!((a.gain_pct(3.5) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_current_price_ignores_input_order() {
        let swaps = vec![
            create_test_swap(30, "a", TradeDirection::Sell, 1, Some(3.0)),
            create_test_swap(10, "a", TradeDirection::Buy, 1, Some(1.0)),
            create_test_swap(40, "a", TradeDirection::Buy, 1, None),
        ];
        assert_eq!(current_price(&swaps), Some(3.0));
        assert_eq!(priced_count(&swaps), 2);
        assert_eq!(current_price(&[]), None);
    }
}
