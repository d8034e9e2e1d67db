//! 다이버전스 패턴의 스캔 단위 확인 시나리오.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;

use scanner_analysis::{PatternDetector, PatternRule, StageEvent, StageTracker};
use scanner_core::{
    Candle, Direction, IndicatorConfig, IndicatorSnapshot, PatternConfig, PatternType, Stage,
    StageConfig, Timeframe,
};

fn scan_time(scan: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::minutes(scan * 12)
}

/// 앞 구간 저점 95, 최근 구간 저점 97로 더 높은 저점을 유지하는 캔들 열.
fn higher_low_candles() -> Vec<Candle> {
    (0..30)
        .map(|i| {
            let low = match i {
                20..=24 => dec!(95),
                25..=29 => dec!(97),
                _ => dec!(99),
            };
            Candle::new(
                scan_time(0) - Duration::hours(30 - i),
                dec!(100),
                dec!(101),
                low,
                dec!(100),
                dec!(120),
            )
        })
        .collect()
}

fn snapshot(rsi: f64) -> IndicatorSnapshot {
    IndicatorSnapshot {
        rsi: Some(rsi),
        rsi_prior: Some(rsi + 6.0),
        volume_ratio: Some(1.3),
        atr: Some(dec!(1.5)),
        atr_percent: Some(1.5),
        ..IndicatorSnapshot::unknown(dec!(100))
    }
}

#[test]
fn falling_rsi_with_higher_low_confirms_once_in_three_scans() {
    let indicators = IndicatorConfig::default();
    let detector = PatternDetector::new(indicators.clone(), PatternConfig::default())
        .with_rules(vec![PatternRule::Divergence(Direction::Long)]);
    let mut tracker = StageTracker::new(StageConfig::default(), indicators.volume_confirmation);
    let candles = higher_low_candles();

    let mut stages = Vec::new();
    let mut confirmations = Vec::new();

    for (scan, rsi) in [40.0, 33.0, 26.0].into_iter().enumerate() {
        let now = scan_time(scan as i64 + 1);
        let snap = snapshot(rsi);
        let candidates = detector.detect_at("ADAUSDT", Timeframe::M15, &candles, &snap, now);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].pattern_type, PatternType::BullishDivergence);

        let key = candidates[0].key();
        let events = tracker.advance(
            candidates,
            snap.close,
            snap.volume_confirmed(indicators.volume_confirmation),
            now,
        );
        confirmations.extend(events.into_iter().filter_map(|e| match e {
            StageEvent::Confirmed(record) => Some(record),
            _ => None,
        }));
        stages.push(tracker.get(&key).map(|r| r.stage));
    }

    assert_eq!(
        stages,
        vec![
            Some(Stage::Potential),
            Some(Stage::Forming),
            Some(Stage::Confirmed)
        ]
    );
    assert_eq!(confirmations.len(), 1);
    assert_eq!(confirmations[0].key.direction, Direction::Long);
    assert_eq!(confirmations[0].levels.invalidation, dec!(97));
}

#[test]
fn potential_without_redetection_expires_after_two_misses() {
    let indicators = IndicatorConfig::default();
    let detector = PatternDetector::new(indicators.clone(), PatternConfig::default())
        .with_rules(vec![PatternRule::Divergence(Direction::Long)]);
    let mut tracker = StageTracker::new(StageConfig::default(), indicators.volume_confirmation);
    let candles = higher_low_candles();

    let snap = snapshot(40.0);
    let candidates = detector.detect_at("ADAUSDT", Timeframe::M15, &candles, &snap, scan_time(1));
    let key = candidates[0].key();
    tracker.advance(candidates, snap.close, true, scan_time(1));

    // RSI가 감시 구간을 벗어나 더 이상 감지되지 않음
    let quiet = snapshot(60.0);
    let mut all_events = Vec::new();
    for scan in 2..=3 {
        let candidates =
            detector.detect_at("ADAUSDT", Timeframe::M15, &candles, &quiet, scan_time(scan));
        assert!(candidates.is_empty());
        all_events.extend(tracker.advance(candidates, quiet.close, false, scan_time(scan)));
    }

    assert!(tracker.get(&key).is_none());
    assert!(all_events
        .iter()
        .any(|e| matches!(e, StageEvent::Expired { from: Stage::Potential, .. })));
    assert!(!all_events
        .iter()
        .any(|e| matches!(e, StageEvent::Confirmed(_))));
}
