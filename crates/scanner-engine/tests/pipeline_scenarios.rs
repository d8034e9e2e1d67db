//! 파이프라인 시나리오: 확정 → 시그널 1건, 재감지 시 추가 시그널 없음.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;

use scanner_analysis::{PatternDetector, PatternRule};
use scanner_core::{
    AppConfig, Candle, Direction, IndicatorSnapshot, MarketContext, PatternType, SignalAction,
    Stage, Timeframe,
};
use scanner_engine::{EngineError, ScanPipeline};

fn scan_time(scan: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::minutes(scan * 3)
}

/// 앞 구간 저점 95, 최근 5개 저점 97의 더 높은 저점 캔들 열.
fn higher_low_candles() -> Vec<Candle> {
    (0..30)
        .map(|i| {
            let low = match i {
                20..=24 => dec!(95),
                25..=29 => dec!(97),
                _ => dec!(99),
            };
            Candle::new(
                scan_time(0) - Duration::minutes(15 * (30 - i)),
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

fn pipeline(config: &AppConfig) -> ScanPipeline {
    let detector = PatternDetector::new(config.indicators.clone(), config.patterns.clone())
        .with_rules(vec![PatternRule::Divergence(Direction::Long)]);
    ScanPipeline::new("ADAUSDT", Timeframe::M15, config)
        .unwrap()
        .with_detector(detector)
}

#[test]
fn divergence_confirmation_emits_exactly_one_long_signal() {
    let config = AppConfig::default();
    let mut pipeline = pipeline(&config);
    let candles = higher_low_candles();
    let context = MarketContext::default();

    let mut signals = Vec::new();
    for (scan, rsi) in [40.0, 33.0, 26.0].into_iter().enumerate() {
        let report = pipeline.evaluate(&candles, &snapshot(rsi), &context, scan_time(scan as i64 + 1));
        assert_eq!(report.candidates, 1);
        signals.extend(report.signals);
    }

    assert_eq!(signals.len(), 1);
    let signal = &signals[0];
    assert_eq!(signal.direction, Direction::Long);
    assert_eq!(signal.pattern_type, PatternType::BullishDivergence);
    assert_eq!(signal.symbol, "ADAUSDT");
    assert_eq!(signal.entry_price, dec!(100));
    // 손절 = 2 × ATR 1.5% = 3%
    assert_eq!(signal.stop_loss, dec!(97));
    assert!(signal.take_profit_1 > signal.entry_price);
    assert!(signal.take_profit_2 > signal.take_profit_1);
    assert_eq!(signal.leverage, 9);
    assert!(signal.entry_score >= config.scoring.min_entry_score);
    assert_eq!(signal.action, SignalAction::Strong);
    assert_eq!(signal.created_at, scan_time(3));
}

#[test]
fn redetection_after_confirmation_emits_nothing() {
    let config = AppConfig::default();
    let mut pipeline = pipeline(&config);
    let candles = higher_low_candles();
    let context = MarketContext::default();

    for (scan, rsi) in [40.0, 33.0, 26.0].into_iter().enumerate() {
        pipeline.evaluate(&candles, &snapshot(rsi), &context, scan_time(scan as i64 + 1));
    }

    let again = pipeline.evaluate(&candles, &snapshot(26.0), &context, scan_time(4));
    assert_eq!(again.candidates, 1);
    assert!(again.signals.is_empty());
    let record = pipeline.tracker().records().next().unwrap();
    assert_eq!(record.stage, Stage::Confirmed);
}

#[test]
fn low_score_confirmation_is_not_published() {
    let mut config = AppConfig::default();
    config.scoring.min_entry_score = 95.0;
    let mut pipeline = pipeline(&config);
    let candles = higher_low_candles();
    let context = MarketContext::default();

    let mut signals = Vec::new();
    for (scan, rsi) in [40.0, 33.0, 26.0].into_iter().enumerate() {
        let report = pipeline.evaluate(&candles, &snapshot(rsi), &context, scan_time(scan as i64 + 1));
        signals.extend(report.signals);
    }

    assert!(signals.is_empty());
    assert_eq!(
        pipeline.tracker().records().next().map(|r| r.stage),
        Some(Stage::Confirmed)
    );
}

#[test]
fn short_history_skips_scan_without_mutation() {
    let config = AppConfig::default();
    let mut pipeline = pipeline(&config);
    let candles = higher_low_candles();

    let result = pipeline.process(&candles, &MarketContext::default(), scan_time(1));
    assert!(matches!(
        result,
        Err(EngineError::InsufficientData { have: 30, need: 60 })
    ));
    assert!(pipeline.tracker().is_empty());
}

/// 평평한 H1 캔들 80개, 마지막 캔들만 103 마감에 거래량 5배.
fn volume_spike_window() -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    (0..80)
        .map(|i| {
            let open_time = start + Duration::hours(i);
            if i == 79 {
                Candle::new(open_time, dec!(100), dec!(103.2), dec!(99.8), dec!(103), dec!(500))
            } else {
                Candle::new(open_time, dec!(100), dec!(100.5), dec!(99.5), dec!(100), dec!(100))
            }
        })
        .collect()
}

fn stages(pipeline: &ScanPipeline) -> Vec<(String, Stage)> {
    let mut stages: Vec<_> = pipeline
        .tracker()
        .records()
        .map(|r| (r.key.to_string(), r.stage))
        .collect();
    stages.sort_by(|a, b| a.0.cmp(&b.0));
    stages
}

#[test]
fn unchanged_window_does_not_advance_stages() {
    let config = AppConfig::default();
    let mut pipeline = ScanPipeline::new("BTCUSDT", Timeframe::H1, &config).unwrap();
    let candles = volume_spike_window();
    let context = MarketContext::default();
    let first_scan = candles[79].timestamp + Duration::hours(1);

    let first = pipeline.process(&candles, &context, first_scan).unwrap();
    assert_eq!(pipeline.last_candle(), Some(candles[79].timestamp));
    let after_first = stages(&pipeline);
    assert!(after_first.iter().all(|(_, stage)| *stage != Stage::Confirmed));
    assert!(first.signals.is_empty());

    // 같은 시간봉 안에서 12분 간격으로 다시 스캔
    for repeat in 1..=3 {
        let now = first_scan + Duration::minutes(12 * repeat);
        let report = pipeline.process(&candles, &context, now).unwrap();
        assert_eq!(report.candidates, 0);
        assert!(report.events.is_empty());
        assert!(report.signals.is_empty());
        assert_eq!(stages(&pipeline), after_first);
    }
}

#[test]
fn new_closed_candle_resumes_stage_tracking() {
    let config = AppConfig::default();
    let mut pipeline = ScanPipeline::new("BTCUSDT", Timeframe::H1, &config).unwrap();
    let mut candles = volume_spike_window();
    let context = MarketContext::default();
    let now = candles[79].timestamp + Duration::hours(1);

    pipeline.process(&candles, &context, now).unwrap();

    let next_open = candles[79].timestamp + Duration::hours(1);
    candles.remove(0);
    candles.push(Candle::new(
        next_open,
        dec!(103),
        dec!(103.4),
        dec!(102.8),
        dec!(103.1),
        dec!(120),
    ));

    pipeline
        .process(&candles, &context, now + Duration::hours(1))
        .unwrap();
    assert_eq!(pipeline.last_candle(), Some(next_open));

    let repeat = pipeline
        .process(&candles, &context, now + Duration::minutes(72))
        .unwrap();
    assert!(repeat.events.is_empty());
}
