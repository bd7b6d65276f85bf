//! Per-wallet aggregation over a normalized swap batch

use super::amount;
use super::normalizer::{Swap, TradeDirection};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wallet address -> aggregate. Ordered so iteration is deterministic.
pub type WalletMap = BTreeMap<String, WalletAggregate>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAggregate {
    pub address: String,
    pub tx_count: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    /// Sum of raw `amountIn`
    #[serde(with = "amount::decimal")]
    pub total_volume: U256,
    pub total_volume_usd: f64,
    pub buy_volume_usd: f64,
    pub sell_volume_usd: f64,
    pub first_seen: i64,
    pub last_seen: i64,
}

impl WalletAggregate {
    pub fn new(address: String, timestamp: i64) -> Self {
        Self {
            address,
            tx_count: 0,
            buy_count: 0,
            sell_count: 0,
            total_volume: U256::ZERO,
            total_volume_usd: 0.0,
            buy_volume_usd: 0.0,
            sell_volume_usd: 0.0,
            first_seen: timestamp,
            last_seen: timestamp,
        }
    }

    pub fn add_swap(&mut self, swap: &Swap) {
        let usd = swap.usd_or_zero();

        match swap.direction {
            TradeDirection::Buy => {
                self.buy_count += 1;
                self.buy_volume_usd += usd;
            }
            TradeDirection::Sell => {
                self.sell_count += 1;
                self.sell_volume_usd += usd;
            }
        }

        self.tx_count += 1;
        self.total_volume = self.total_volume.saturating_add(swap.amount_in);
        self.total_volume_usd += usd;
        self.first_seen = self.first_seen.min(swap.timestamp);
        self.last_seen = self.last_seen.max(swap.timestamp);
    }

    /// Completed buy/sell pairs
    pub fn round_trips(&self) -> usize {
        self.buy_count.min(self.sell_count)
    }
}

/// Single pass over the swaps, one aggregate per distinct wallet
pub fn aggregate_wallets(swaps: &[Swap]) -> WalletMap {
    let mut wallets = WalletMap::new();

    for swap in swaps {
        wallets
            .entry(swap.wallet.clone())
            .or_insert_with(|| WalletAggregate::new(swap.wallet.clone(), swap.timestamp))
            .add_swap(swap);
    }

    wallets
}

/// Wallets sorted by USD volume, largest first; ties broken by address
pub fn ranked_by_volume(wallets: &WalletMap) -> Vec<&WalletAggregate> {
    let mut ranked: Vec<&WalletAggregate> = wallets.values().collect();
    ranked.sort_by(|a, b| {
        b.total_volume_usd
            .total_cmp(&a.total_volume_usd)
            .then_with(|| a.address.cmp(&b.address))
    });
    ranked
}

/// Wallets sorted by trade count, most active first; ties broken by USD volume then address
pub fn ranked_by_activity(wallets: &WalletMap) -> Vec<&WalletAggregate> {
    let mut ranked: Vec<&WalletAggregate> = wallets.values().collect();
    ranked.sort_by(|a, b| {
        b.tx_count
            .cmp(&a.tx_count)
            .then_with(|| b.total_volume_usd.total_cmp(&a.total_volume_usd))
            .then_with(|| a.address.cmp(&b.address))
    });
    ranked
}
