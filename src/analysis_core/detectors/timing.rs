//! Time-based detectors
//!
//! All of these need the batch in chronological order and sort it
//! themselves through [`DetectionContext::chronological`]; the normalizer
//! keeps the caller's order.

use super::{hour_of_day, recent_window_bounds, DetectionContext, Detector};
use crate::analysis_core::error::DetectorError;
use crate::analysis_core::finding::{Finding, FindingDetail, Severity};
use crate::analysis_core::normalizer::{PriceSource, Swap};
use std::collections::{BTreeMap, BTreeSet};

mod thresholds {
    pub const CLUSTER_MIN_SAMPLE: usize = 10; // strictly more trades than this
    pub const CLUSTER_PEAK_HOUR_SHARE: f64 = 0.20;

    pub const SPIKE_MIN_SAMPLE: usize = 100; // strictly more trades than this
    pub const SPIKE_WINDOWS: usize = 10;
    pub const SPIKE_MULTIPLIER: f64 = 3.0; // peak window vs mean window

    pub const SYNC_BUCKET_MS: i64 = 1_000;
    pub const SYNC_MIN_WALLETS: usize = 3; // distinct wallets in the same second
    pub const SYNC_VOLUME_SHARE: f64 = 0.20;

    pub const BAIT_MIN_SAMPLE: usize = 100;
    pub const BAIT_BUCKET_MS: i64 = 60_000;
    pub const BAIT_MIN_TRADES: usize = 20; // strictly more trades in the minute
    pub const BAIT_MAX_AVG_USD: f64 = 10.0;
    pub const BAIT_MAX_PRICE_MOVE: f64 = 0.02;
    pub const BAIT_WINDOW_SHARE: f64 = 0.20;

    pub const VELOCITY_RATIO_MIN: f64 = 3.0;
    pub const PANIC_PRICE_DROP: f64 = -0.05;
    pub const FOMO_PRICE_RISE: f64 = 0.10;
}

use thresholds::*;

pub struct TimeClusteringDetector;

impl Detector for TimeClusteringDetector {
    fn name(&self) -> &'static str {
        "time_clustering"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let total = ctx.swaps.len();
        if total <= CLUSTER_MIN_SAMPLE {
            return Ok(Vec::new());
        }

        let mut hours = [0usize; 24];
        for swap in ctx.swaps {
            hours[hour_of_day(swap.timestamp)? as usize] += 1;
        }

        // Earliest hour wins ties
        let mut peak_hour = 0usize;
        for (hour, &count) in hours.iter().enumerate() {
            if count > hours[peak_hour] {
                peak_hour = hour;
            }
        }

        let trade_count = hours[peak_hour];
        let share = trade_count as f64 / total as f64;
        if share <= CLUSTER_PEAK_HOUR_SHARE {
            return Ok(Vec::new());
        }

        Ok(vec![Finding::new(
            Severity::above(share, 0.3, 0.4),
            FindingDetail::TimeClustering {
                peak_hour: peak_hour as u32,
                trade_count,
                share_pct: share * 100.0,
            },
        )])
    }
}

pub struct VolumeSpikeDetector;

impl Detector for VolumeSpikeDetector {
    fn name(&self) -> &'static str {
        "volume_spike"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let n = ctx.swaps.len();
        if n <= SPIKE_MIN_SAMPLE {
            return Ok(Vec::new());
        }

        let sorted = ctx.chronological();
        let windows: Vec<f64> = (0..SPIKE_WINDOWS)
            .map(|i| {
                let start = i * n / SPIKE_WINDOWS;
                let end = (i + 1) * n / SPIKE_WINDOWS;
                sorted[start..end].iter().map(|s| s.usd_or_zero()).sum()
            })
            .collect();

        let mean_volume_usd = windows.iter().sum::<f64>() / SPIKE_WINDOWS as f64;
        if mean_volume_usd <= 0.0 {
            return Ok(Vec::new());
        }

        let mut window_index = 0usize;
        for (i, volume) in windows.iter().enumerate() {
            if *volume > windows[window_index] {
                window_index = i;
            }
        }

        let peak_volume_usd = windows[window_index];
        let multiplier = peak_volume_usd / mean_volume_usd;
        if multiplier <= SPIKE_MULTIPLIER {
            return Ok(Vec::new());
        }

        Ok(vec![Finding::new(
            Severity::above(multiplier, 4.5, 6.0),
            FindingDetail::VolumeSpike {
                window_index,
                peak_volume_usd,
                mean_volume_usd,
                multiplier,
            },
        )])
    }
}

/// Several wallets trading inside the same second
pub struct SynchronizedClusterDetector;

impl Detector for SynchronizedClusterDetector {
    fn name(&self) -> &'static str {
        "synchronized_cluster"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let total_volume = ctx.total_volume_usd();
        if total_volume <= 0.0 {
            return Ok(Vec::new());
        }

        let mut seconds: BTreeMap<i64, Vec<&Swap>> = BTreeMap::new();
        for swap in ctx.swaps {
            seconds
                .entry(swap.timestamp.div_euclid(SYNC_BUCKET_MS))
                .or_default()
                .push(swap);
        }

        let mut cluster_seconds = 0usize;
        let mut clustered_wallets: BTreeSet<&str> = BTreeSet::new();
        let mut volume_usd = 0.0;

        for bucket in seconds.values() {
            let wallets: BTreeSet<&str> = bucket.iter().map(|s| s.wallet.as_str()).collect();
            if wallets.len() < SYNC_MIN_WALLETS {
                continue;
            }
            cluster_seconds += 1;
            volume_usd += bucket.iter().map(|s| s.usd_or_zero()).sum::<f64>();
            clustered_wallets.extend(wallets);
        }

        let share = volume_usd / total_volume;
        if cluster_seconds == 0 || share <= SYNC_VOLUME_SHARE {
            return Ok(Vec::new());
        }

        Ok(vec![Finding::new(
            Severity::above(share, 0.35, 0.5),
            FindingDetail::SynchronizedCluster {
                cluster_seconds,
                wallet_count: clustered_wallets.len(),
                volume_usd,
                volume_share_pct: share * 100.0,
            },
        )])
    }
}

/// Busy minutes of tiny flat trades that paint activity without moving price
pub struct BaitPatternDetector;

impl BaitPatternDetector {
    fn is_bait_window(window: &[&Swap], source: PriceSource) -> bool {
        if window.len() <= BAIT_MIN_TRADES {
            return false;
        }

        let sized: Vec<f64> = window.iter().filter_map(|s| s.usd_value()).collect();
        if sized.is_empty() {
            return false;
        }
        let average = sized.iter().sum::<f64>() / sized.len() as f64;

        average < BAIT_MAX_AVG_USD && price_movement(window, source) < BAIT_MAX_PRICE_MOVE
    }
}

/// (max - min) / min over the window's prices; zero with fewer than two prices
fn price_movement(window: &[&Swap], source: PriceSource) -> f64 {
    let prices: Vec<f64> = window.iter().filter_map(|s| s.price_from(source)).collect();
    if prices.len() < 2 {
        return 0.0;
    }

    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min <= 0.0 {
        return 0.0;
    }
    (max - min) / min
}

impl Detector for BaitPatternDetector {
    fn name(&self) -> &'static str {
        "bait_pattern"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        if ctx.swaps.len() <= BAIT_MIN_SAMPLE {
            return Ok(Vec::new());
        }

        let mut minutes: BTreeMap<i64, Vec<&Swap>> = BTreeMap::new();
        for swap in ctx.swaps {
            minutes
                .entry(swap.timestamp.div_euclid(BAIT_BUCKET_MS))
                .or_default()
                .push(swap);
        }

        let total_windows = minutes.len();
        let bait_windows = minutes
            .values()
            .filter(|window| Self::is_bait_window(window, ctx.price_source))
            .count();

        let share = bait_windows as f64 / total_windows as f64;
        if share <= BAIT_WINDOW_SHARE {
            return Ok(Vec::new());
        }

        Ok(vec![Finding::new(
            Severity::above(share, 0.35, 0.5),
            FindingDetail::BaitPattern {
                bait_windows,
                total_windows,
                share_pct: share * 100.0,
            },
        )])
    }
}

/// Compares the most recent 20% of the time span with the 20% before it
pub struct PanicFomoDetector;

impl Detector for PanicFomoDetector {
    fn name(&self) -> &'static str {
        "panic_fomo"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vec<Finding>, DetectorError> {
        let sorted = ctx.chronological();
        let Some((previous_start, recent_start, _)) = recent_window_bounds(&sorted) else {
            return Ok(Vec::new());
        };
        if recent_start <= previous_start {
            return Ok(Vec::new());
        }

        let previous: Vec<&Swap> = sorted
            .iter()
            .copied()
            .filter(|s| s.timestamp >= previous_start && s.timestamp < recent_start)
            .collect();
        let recent: Vec<&Swap> = sorted
            .iter()
            .copied()
            .filter(|s| s.timestamp >= recent_start)
            .collect();

        if previous.is_empty() {
            return Ok(Vec::new());
        }

        let velocity_ratio = recent.len() as f64 / previous.len() as f64;
        if velocity_ratio <= VELOCITY_RATIO_MIN {
            return Ok(Vec::new());
        }

        let reference_price = sorted
            .iter()
            .take_while(|s| s.timestamp < recent_start)
            .filter_map(|s| ctx.price(s))
            .last();
        let current_price = recent.iter().filter_map(|s| ctx.price(s)).last();

        let (Some(reference_price), Some(current_price)) = (reference_price, current_price) else {
            return Ok(Vec::new());
        };
        if reference_price <= 0.0 {
            return Ok(Vec::new());
        }

        let change = (current_price - reference_price) / reference_price;
        let buy_volume_usd: f64 = recent.iter().filter(|s| s.is_buy()).map(|s| s.usd_or_zero()).sum();
        let sell_volume_usd: f64 = recent.iter().filter(|s| s.is_sell()).map(|s| s.usd_or_zero()).sum();
        let severity = Severity::above(velocity_ratio, 4.5, 6.0);
        let price_change_pct = change * 100.0;

        let detail = if change < PANIC_PRICE_DROP {
            FindingDetail::PanicSell {
                velocity_ratio,
                price_change_pct,
                sell_volume_usd,
                buy_volume_usd,
            }
        } else if change > FOMO_PRICE_RISE {
            FindingDetail::FomoBuy {
                velocity_ratio,
                price_change_pct,
                sell_volume_usd,
                buy_volume_usd,
            }
        } else {
            return Ok(Vec::new());
        };

        Ok(vec![Finding::new(severity, detail)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis_core::detectors::test_support::*;
    use crate::analysis_core::finding::FindingKind;
    use crate::analysis_core::normalizer::TradeDirection;
    use crate::analysis_core::wallet::aggregate_wallets;

    // 2023-11-14T22:13:20Z
    const BASE_TS: i64 = 1_700_000_000_000;
    const HOUR_MS: i64 = 3_600_000;

    fn run(detector: &dyn Detector, swaps: &[Swap]) -> Result<Vec<Finding>, DetectorError> {
        let wallets = aggregate_wallets(swaps);
        let ctx = DetectionContext::new(swaps, &wallets, None);
        detector.detect(&ctx)
    }

    #[test]
    fn test_time_clustering_peak_hour() {
        // 6 trades at 22:xx, one in each of 5 other hours
        let mut swaps: Vec<Swap> = (0..6).map(|i| buy(BASE_TS + i * 1_000, "a", 1.0)).collect();
        swaps.extend((1..=5).map(|h| buy(BASE_TS + h * HOUR_MS, "b", 1.0)));

        let findings = run(&TimeClusteringDetector, &swaps).unwrap();
        assert_eq!(findings.len(), 1);
        match &findings[0].detail {
            FindingDetail::TimeClustering { peak_hour, trade_count, .. } => {
                assert_eq!(*peak_hour, 22);
                assert_eq!(*trade_count, 6);
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_time_clustering_needs_sample() {
        let swaps: Vec<Swap> = (0..10).map(|i| buy(BASE_TS + i, "a", 1.0)).collect();
        assert!(run(&TimeClusteringDetector, &swaps).unwrap().is_empty());
    }

    #[test]
    fn test_time_clustering_bad_timestamp_is_an_error() {
        let mut swaps: Vec<Swap> = (0..11).map(|i| buy(BASE_TS + i, "a", 1.0)).collect();
        swaps[3].timestamp = i64::MAX;
        assert_eq!(
            run(&TimeClusteringDetector, &swaps),
            Err(DetectorError::InvalidTimestamp(i64::MAX))
        );
    }

    #[test]
    fn test_volume_spike() {
        // 110 trades of $10 with the last window boosted to $100 each
        let swaps: Vec<Swap> = (0..110)
            .map(|i| {
                let usd = if i >= 99 { 100.0 } else { 10.0 };
                buy(BASE_TS + i * 1_000, &format!("w{}", i), usd)
            })
            .collect();

        let findings = run(&VolumeSpikeDetector, &swaps).unwrap();
        assert_eq!(findings.len(), 1);
        match &findings[0].detail {
            FindingDetail::VolumeSpike { window_index, multiplier, .. } => {
                assert_eq!(*window_index, 9);
                assert!(*multiplier > 3.0);
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_volume_spike_flat_volume_is_silent() {
        let swaps: Vec<Swap> = (0..200).map(|i| buy(BASE_TS + i, "a", 5.0)).collect();
        assert!(run(&VolumeSpikeDetector, &swaps).unwrap().is_empty());
    }

    #[test]
    fn test_volume_spike_sample_boundary() {
        // Every swap from index 90 on is ten times larger
        let batch = |n: i64| -> Vec<Swap> {
            (0..n)
                .map(|i| {
                    let usd = if i >= 90 { 100.0 } else { 10.0 };
                    buy(BASE_TS + i * 1_000, &format!("w{}", i), usd)
                })
                .collect()
        };

        assert!(run(&VolumeSpikeDetector, &batch(100)).unwrap().is_empty());

        let findings = run(&VolumeSpikeDetector, &batch(101)).unwrap();
        assert_eq!(findings.len(), 1);
        match &findings[0].detail {
            FindingDetail::VolumeSpike { window_index, multiplier, .. } => {
                assert_eq!(*window_index, 9);
                assert!((*multiplier - 5.5).abs() < 1e-9);
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_synchronized_cluster_share_boundary() {
        // One clustered second of $300 against a lone wallet trading every 5s
        let batch = |last_usd: f64| -> Vec<Swap> {
            let mut swaps = vec![
                buy(BASE_TS, "a", 100.0),
                buy(BASE_TS + 200, "b", 100.0),
                sell(BASE_TS + 900, "c", 100.0),
            ];
            swaps.extend((0..11).map(|i| buy(BASE_TS + 10_000 + i * 5_000, "d", 100.0)));
            swaps.push(buy(BASE_TS + 70_000, "d", last_usd));
            swaps
        };

        // 300 / 1500 is exactly 20%
        assert!(run(&SynchronizedClusterDetector, &batch(100.0)).unwrap().is_empty());
        // 300 / 1499
        assert_eq!(run(&SynchronizedClusterDetector, &batch(99.0)).unwrap().len(), 1);
    }

    #[test]
    fn test_synchronized_cluster() {
        let mut swaps = vec![
            buy(BASE_TS, "a", 100.0),
            buy(BASE_TS + 200, "b", 100.0),
            sell(BASE_TS + 900, "c", 100.0),
        ];
        swaps.extend((0..5).map(|i| buy(BASE_TS + 10_000 + i * 5_000, "d", 100.0)));

        let findings = run(&SynchronizedClusterDetector, &swaps).unwrap();
        assert_eq!(findings.len(), 1);
        match &findings[0].detail {
            FindingDetail::SynchronizedCluster { cluster_seconds, wallet_count, volume_usd, .. } => {
                assert_eq!(*cluster_seconds, 1);
                assert_eq!(*wallet_count, 3);
                assert_eq!(*volume_usd, 300.0);
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_synchronized_cluster_two_wallets_is_not_a_cluster() {
        let swaps = vec![buy(BASE_TS, "a", 100.0), buy(BASE_TS + 1, "b", 100.0), buy(BASE_TS + 2, "a", 100.0)];
        assert!(run(&SynchronizedClusterDetector, &swaps).unwrap().is_empty());
    }

    #[test]
    fn test_bait_pattern() {
        // 5 bait minutes of 21 tiny flat trades, 5 ordinary minutes of one trade
        let mut swaps = Vec::new();
        for minute in 0..5 {
            for i in 0..21 {
                swaps.push(create_priced_swap(
                    BASE_TS + minute * 60_000 + i * 100,
                    &format!("bait{}", i),
                    TradeDirection::Buy,
                    2.0,
                    0.5,
                ));
            }
        }
        for minute in 5..10 {
            swaps.push(buy(BASE_TS + minute * 60_000, "real", 500.0));
        }

        let findings = run(&BaitPatternDetector, &swaps).unwrap();
        assert_eq!(findings.len(), 1);
        match &findings[0].detail {
            FindingDetail::BaitPattern { bait_windows, total_windows, .. } => {
                assert_eq!(*bait_windows, 5);
                assert_eq!(*total_windows, 10);
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    fn bait_batch(bait_minutes: i64, trades_per_bait_minute: i64, real_minutes: i64, real_per_minute: i64) -> Vec<Swap> {
        let mut swaps = Vec::new();
        for minute in 0..bait_minutes {
            for i in 0..trades_per_bait_minute {
                swaps.push(create_priced_swap(
                    BASE_TS + minute * 60_000 + i * 100,
                    &format!("bait{}", i),
                    TradeDirection::Buy,
                    2.0,
                    0.5,
                ));
            }
        }
        for minute in bait_minutes..bait_minutes + real_minutes {
            for i in 0..real_per_minute {
                swaps.push(buy(BASE_TS + minute * 60_000 + i * 100, "real", 500.0));
            }
        }
        swaps
    }

    #[test]
    fn test_bait_pattern_sample_boundary() {
        // 4 bait minutes of 21 trades plus one busy ordinary minute
        let at_gate = bait_batch(4, 21, 1, 16);
        assert_eq!(at_gate.len(), 100);
        assert!(run(&BaitPatternDetector, &at_gate).unwrap().is_empty());

        let above_gate = bait_batch(4, 21, 1, 17);
        assert_eq!(above_gate.len(), 101);
        assert_eq!(run(&BaitPatternDetector, &above_gate).unwrap().len(), 1);
    }

    #[test]
    fn test_bait_minute_needs_more_than_twenty_trades() {
        let twenty = bait_batch(5, 20, 5, 1);
        assert_eq!(twenty.len(), 105);
        assert!(run(&BaitPatternDetector, &twenty).unwrap().is_empty());

        let twenty_one = bait_batch(5, 21, 5, 1);
        assert_eq!(run(&BaitPatternDetector, &twenty_one).unwrap().len(), 1);
    }

    fn velocity_batch(recent_price: f64) -> Vec<Swap> {
        // Span 0..10_000; previous window [6000, 8000), recent [8000, 10000]
        let mut swaps = vec![create_priced_swap(BASE_TS, "early", TradeDirection::Buy, 10.0, 1.0)];
        swaps.push(create_priced_swap(BASE_TS + 7_000, "prev", TradeDirection::Buy, 10.0, 1.0));
        for i in 0..4 {
            swaps.push(create_priced_swap(
                BASE_TS + 8_000 + i * 500,
                &format!("r{}", i),
                TradeDirection::Sell,
                10.0,
                recent_price,
            ));
        }
        swaps.push(create_priced_swap(BASE_TS + 10_000, "last", TradeDirection::Sell, 10.0, recent_price));
        swaps
    }

    #[test]
    fn test_panic_sell() {
        let findings = run(&PanicFomoDetector, &velocity_batch(0.8)).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::PanicSell);
        match &findings[0].detail {
            FindingDetail::PanicSell { velocity_ratio, sell_volume_usd, .. } => {
                assert_eq!(*velocity_ratio, 5.0);
                assert_eq!(*sell_volume_usd, 50.0);
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_fomo_buy_and_flat_price() {
        let findings = run(&PanicFomoDetector, &velocity_batch(1.2)).unwrap();
        assert_eq!(findings[0].kind, FindingKind::FomoBuy);

        assert!(run(&PanicFomoDetector, &velocity_batch(1.02)).unwrap().is_empty());
    }

    #[test]
    fn test_panic_fomo_ignores_unpriced_swaps_in_a_priced_batch() {
        // Flat $1 market; the newest swaps lack priceToken
        let mut swaps = velocity_batch(1.0);
        for swap in swaps.iter_mut().filter(|s| s.wallet == "last" || s.wallet == "r1" || s.wallet == "r3") {
            swap.price_token = None;
        }
        assert!(run(&PanicFomoDetector, &swaps).unwrap().is_empty());
    }
}
