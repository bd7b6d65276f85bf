//! Structured findings emitted by the detectors
//!
//! Each finding carries its metrics as typed fields. The human readable
//! description is rendered from those metrics, so callers can re-render or
//! machine-parse without string matching.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    WashTrading,
    WhaleConcentration,
    BuySellImbalance,
    RapidCycle,
    LargeTransaction,
    TimeClustering,
    NewWalletDominance,
    VolumeSpike,
    BotSignature,
    PriceVolatility,
    SynchronizedCluster,
    ProfitPressure,
    BaitPattern,
    DiamondHands,
    PanicSell,
    FomoBuy,
    NewWalletFlow,
    ManipulationWallet,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::WashTrading => "wash-trading",
            FindingKind::WhaleConcentration => "whale-concentration",
            FindingKind::BuySellImbalance => "buy-sell-imbalance",
            FindingKind::RapidCycle => "rapid-cycle",
            FindingKind::LargeTransaction => "large-transaction",
            FindingKind::TimeClustering => "time-clustering",
            FindingKind::NewWalletDominance => "new-wallet-dominance",
            FindingKind::VolumeSpike => "volume-spike",
            FindingKind::BotSignature => "bot-signature",
            FindingKind::PriceVolatility => "price-volatility",
            FindingKind::SynchronizedCluster => "synchronized-cluster",
            FindingKind::ProfitPressure => "profit-pressure",
            FindingKind::BaitPattern => "bait-pattern",
            FindingKind::DiamondHands => "diamond-hands",
            FindingKind::PanicSell => "panic-sell",
            FindingKind::FomoBuy => "fomo-buy",
            FindingKind::NewWalletFlow => "new-wallet-flow",
            FindingKind::ManipulationWallet => "manipulation-wallet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Weak,
    Moderate,
    Strong,
}

impl Severity {
    /// Grade a value that grows with suspicion
    pub fn above(value: f64, moderate_at: f64, strong_at: f64) -> Self {
        if value > strong_at {
            Severity::Strong
        } else if value > moderate_at {
            Severity::Moderate
        } else {
            Severity::Weak
        }
    }

    /// Grade a value that shrinks with suspicion
    pub fn below(value: f64, moderate_at: f64, strong_at: f64) -> Self {
        if value < strong_at {
            Severity::Strong
        } else if value < moderate_at {
            Severity::Moderate
        } else {
            Severity::Weak
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImbalanceDirection {
    Pump,
    Dump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureSide {
    Profit,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarlyBuyerOutcome {
    Holding,
    EarlyExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewWalletFlowKind {
    OrganicGrowth,
    ClosedLoop,
}

/// Supporting metrics, one variant per finding kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum FindingDetail {
    WashTrading {
        wallet: String,
        round_trips: usize,
        buy_count: usize,
        sell_count: usize,
    },
    WhaleConcentration {
        wallet: String,
        volume_usd: f64,
        share_pct: f64,
    },
    BuySellImbalance {
        direction: ImbalanceDirection,
        buy_count: usize,
        sell_count: usize,
        buy_ratio_pct: f64,
    },
    RapidCycle {
        wallets: Vec<String>,
        round_trips: usize,
    },
    LargeTransaction {
        count: usize,
        share_pct: f64,
        threshold_usd: f64,
        average_usd: f64,
    },
    TimeClustering {
        peak_hour: u32,
        trade_count: usize,
        share_pct: f64,
    },
    NewWalletDominance {
        new_wallets: usize,
        total_wallets: usize,
        share_pct: f64,
    },
    VolumeSpike {
        window_index: usize,
        peak_volume_usd: f64,
        mean_volume_usd: f64,
        multiplier: f64,
    },
    BotSignature {
        bucket_usd: i64,
        trade_count: usize,
        share_pct: f64,
    },
    PriceVolatility {
        volatile_moves: usize,
        total_moves: usize,
        share_pct: f64,
        max_move_pct: f64,
    },
    SynchronizedCluster {
        cluster_seconds: usize,
        wallet_count: usize,
        volume_usd: f64,
        volume_share_pct: f64,
    },
    ProfitPressure {
        side: PressureSide,
        wallet_count: usize,
        cost_basis_wallets: usize,
        wallet_share_pct: f64,
        volume_share_pct: f64,
        current_price: f64,
    },
    BaitPattern {
        bait_windows: usize,
        total_windows: usize,
        share_pct: f64,
    },
    DiamondHands {
        outcome: EarlyBuyerOutcome,
        early_buyers: usize,
        holders: usize,
        holder_share_pct: f64,
        holder_volume_share_pct: f64,
    },
    PanicSell {
        velocity_ratio: f64,
        price_change_pct: f64,
        sell_volume_usd: f64,
        buy_volume_usd: f64,
    },
    FomoBuy {
        velocity_ratio: f64,
        price_change_pct: f64,
        sell_volume_usd: f64,
        buy_volume_usd: f64,
    },
    NewWalletFlow {
        flow: NewWalletFlowKind,
        volume_share_pct: f64,
        trade_share_pct: f64,
    },
    ManipulationWallet {
        wallets: Vec<String>,
        buy_volume_usd: f64,
        sell_volume_usd: f64,
        price_impact_pct: Option<f64>,
    },
}

impl FindingDetail {
    pub fn kind(&self) -> FindingKind {
        match self {
            FindingDetail::WashTrading { .. } => FindingKind::WashTrading,
            FindingDetail::WhaleConcentration { .. } => FindingKind::WhaleConcentration,
            FindingDetail::BuySellImbalance { .. } => FindingKind::BuySellImbalance,
            FindingDetail::RapidCycle { .. } => FindingKind::RapidCycle,
            FindingDetail::LargeTransaction { .. } => FindingKind::LargeTransaction,
            FindingDetail::TimeClustering { .. } => FindingKind::TimeClustering,
            FindingDetail::NewWalletDominance { .. } => FindingKind::NewWalletDominance,
            FindingDetail::VolumeSpike { .. } => FindingKind::VolumeSpike,
            FindingDetail::BotSignature { .. } => FindingKind::BotSignature,
            FindingDetail::PriceVolatility { .. } => FindingKind::PriceVolatility,
            FindingDetail::SynchronizedCluster { .. } => FindingKind::SynchronizedCluster,
            FindingDetail::ProfitPressure { .. } => FindingKind::ProfitPressure,
            FindingDetail::BaitPattern { .. } => FindingKind::BaitPattern,
            FindingDetail::DiamondHands { .. } => FindingKind::DiamondHands,
            FindingDetail::PanicSell { .. } => FindingKind::PanicSell,
            FindingDetail::FomoBuy { .. } => FindingKind::FomoBuy,
            FindingDetail::NewWalletFlow { .. } => FindingKind::NewWalletFlow,
            FindingDetail::ManipulationWallet { .. } => FindingKind::ManipulationWallet,
        }
    }

    /// Human readable description of the metrics
    pub fn render(&self) -> String {
        match self {
            FindingDetail::WashTrading { wallet, round_trips, .. } => format!(
                "Possible wash trading: wallet {} completed {} buy/sell round trips",
                short_address(wallet),
                round_trips
            ),
            FindingDetail::WhaleConcentration { wallet, volume_usd, share_pct } => format!(
                "Whale concentration: wallet {} accounts for {:.1}% of volume (${:.2})",
                short_address(wallet),
                share_pct,
                volume_usd
            ),
            FindingDetail::BuySellImbalance { direction, buy_ratio_pct, .. } => match direction {
                ImbalanceDirection::Pump => format!(
                    "Buy-side imbalance ({:.1}% buys) suggests a possible pump",
                    buy_ratio_pct
                ),
                ImbalanceDirection::Dump => format!(
                    "Sell-side imbalance ({:.1}% sells) suggests a possible dump",
                    100.0 - buy_ratio_pct
                ),
            },
            FindingDetail::RapidCycle { wallets, round_trips } => format!(
                "{} wallet(s) cycled in and out rapidly ({} round trips in under 20 trades each)",
                wallets.len(),
                round_trips
            ),
            FindingDetail::LargeTransaction { count, share_pct, threshold_usd, .. } => format!(
                "{} large transaction(s) above ${:.2} ({:.1}% of trades)",
                count, threshold_usd, share_pct
            ),
            FindingDetail::TimeClustering { peak_hour, share_pct, .. } => format!(
                "Trading clustered at {:02}:00 UTC ({:.1}% of trades in one hour)",
                peak_hour, share_pct
            ),
            FindingDetail::NewWalletDominance { new_wallets, total_wallets, share_pct } => format!(
                "{} of {} wallets ({:.1}%) made two or fewer trades",
                new_wallets, total_wallets, share_pct
            ),
            FindingDetail::VolumeSpike { window_index, multiplier, .. } => format!(
                "Volume spike: window {} of 10 carried {:.1}x the mean window volume",
                window_index + 1,
                multiplier
            ),
            FindingDetail::BotSignature { bucket_usd, share_pct, .. } => format!(
                "Bot signature: {:.1}% of sized trades are ~${}",
                share_pct, bucket_usd
            ),
            FindingDetail::PriceVolatility { share_pct, max_move_pct, .. } => format!(
                "Price volatility: {:.1}% of consecutive trades moved price more than 10% (max {:.1}%)",
                share_pct, max_move_pct
            ),
            FindingDetail::SynchronizedCluster { wallet_count, volume_share_pct, .. } => format!(
                "Synchronized cluster: {} wallets trading in the same seconds moved {:.1}% of volume",
                wallet_count, volume_share_pct
            ),
            FindingDetail::ProfitPressure { side, wallet_share_pct, volume_share_pct, .. } => match side {
                PressureSide::Profit => format!(
                    "Profit-taking pressure: {:.1}% of cost-basis wallets hold 1.5x+ gains ({:.1}% of volume)",
                    wallet_share_pct, volume_share_pct
                ),
                PressureSide::Loss => format!(
                    "Loss pressure: {:.1}% of cost-basis wallets are below 0.9x their entry",
                    wallet_share_pct
                ),
            },
            FindingDetail::BaitPattern { bait_windows, total_windows, share_pct } => format!(
                "Bait pattern: {} of {} minutes ({:.1}%) show many tiny trades with a flat price",
                bait_windows, total_windows, share_pct
            ),
            FindingDetail::DiamondHands { outcome, holder_share_pct, early_buyers, .. } => match outcome {
                EarlyBuyerOutcome::Holding => format!(
                    "Diamond hands: {:.1}% of {} early buyers never sold",
                    holder_share_pct, early_buyers
                ),
                EarlyBuyerOutcome::EarlyExit => format!(
                    "Early exit: only {:.1}% of {} early buyers still hold",
                    holder_share_pct, early_buyers
                ),
            },
            FindingDetail::PanicSell { velocity_ratio, price_change_pct, .. } => format!(
                "Panic selling: trade velocity up {:.1}x while price fell {:.1}%",
                velocity_ratio,
                price_change_pct.abs()
            ),
            FindingDetail::FomoBuy { velocity_ratio, price_change_pct, .. } => format!(
                "FOMO buying: trade velocity up {:.1}x while price rose {:.1}%",
                velocity_ratio, price_change_pct
            ),
            FindingDetail::NewWalletFlow { flow, volume_share_pct, trade_share_pct } => match flow {
                NewWalletFlowKind::OrganicGrowth => format!(
                    "Organic growth: new wallets drove {:.1}% of recent volume and {:.1}% of recent trades",
                    volume_share_pct, trade_share_pct
                ),
                NewWalletFlowKind::ClosedLoop => format!(
                    "Closed loop: new wallets brought only {:.1}% of volume and {:.1}% of trades",
                    volume_share_pct, trade_share_pct
                ),
            },
            FindingDetail::ManipulationWallet { wallets, buy_volume_usd, sell_volume_usd, price_impact_pct } => {
                let impact = match price_impact_pct {
                    Some(pct) => format!(", ~{:.1}% of pool liquidity", pct),
                    None => String::new(),
                };
                format!(
                    "{} wallet(s) paired large buys with large sells within 5 minutes (${:.2} in, ${:.2} out{})",
                    wallets.len(),
                    buy_volume_usd,
                    sell_volume_usd,
                    impact
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub description: String,
    pub detail: FindingDetail,
}

impl Finding {
    pub fn new(severity: Severity, detail: FindingDetail) -> Self {
        Self {
            kind: detail.kind(),
            severity,
            description: detail.render(),
            detail,
        }
    }

    /// Re-render the description from the metrics
    pub fn render(&self) -> String {
        self.detail.render()
    }
}

/// Abbreviate long base58/hex addresses for display
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Ratio expressed as a percentage, zero when the denominator is empty
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
