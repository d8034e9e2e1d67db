//! 워커/스케줄러: 조회 실패 격리, 타임아웃, 종료.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use scanner_core::{AppConfig, Candle, MarketContext, Timeframe};
use scanner_engine::{EngineError, ScanPipeline, ScanScheduler, ScanWorker};
use scanner_exchange::{MarketDataProvider, SimulatedProvider};

/// 완만하게 흔들리는 결정적 캔들 열.
fn wave(n: usize) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let offset = Decimal::from((i % 7) as i64) - dec!(3);
            let close = dec!(100) + offset;
            Candle::new(
                start + Duration::hours(i as i64),
                close,
                close + dec!(0.8),
                close - dec!(0.8),
                close,
                Decimal::from(100 + (i % 5) as i64 * 10),
            )
        })
        .collect()
}

fn config(symbols: &[&str]) -> AppConfig {
    let mut config = AppConfig::default();
    config.market.symbols = symbols.iter().map(|s| s.to_string()).collect();
    config.market.timeframes = vec![Timeframe::H1];
    config.market.reference_symbol = None;
    config
}

fn worker(
    symbol: &str,
    provider: Arc<dyn MarketDataProvider>,
    config: &AppConfig,
) -> (ScanWorker, mpsc::Receiver<scanner_core::Signal>) {
    let (tx, rx) = mpsc::channel(16);
    let pipeline = ScanPipeline::new(symbol, Timeframe::H1, config).unwrap();
    (ScanWorker::new(pipeline, provider, tx, config), rx)
}

#[tokio::test]
async fn fetch_failure_for_one_symbol_does_not_touch_another() {
    let config = config(&["XRPUSDT", "ETHUSDT"]);
    let provider = Arc::new(SimulatedProvider::new());
    provider.set_series("XRPUSDT", Timeframe::H1, wave(120)).await;
    provider.set_series("ETHUSDT", Timeframe::H1, wave(120)).await;
    provider.fail_always("XRPUSDT").await;

    let (mut failing, _rx_x) = worker("XRPUSDT", provider.clone(), &config);
    let (mut healthy, _rx_y) = worker("ETHUSDT", provider.clone(), &config);

    // 같은 tick에서 X 먼저 실패
    let now = Utc::now();
    let err = failing.scan_once(now).await.unwrap_err();
    assert!(matches!(err, EngineError::MarketData(_)));
    assert!(failing.pipeline().tracker().is_empty());

    let report = healthy.scan_once(now).await.unwrap();

    // 실패 없는 환경에서 같은 입력으로 돌린 파이프라인과 동일한 상태
    let mut control = ScanPipeline::new("ETHUSDT", Timeframe::H1, &config).unwrap();
    let mut context = MarketContext::default();
    context.higher_timeframe = Some(Timeframe::H4);
    let expected = control.process(&wave(120), &context, now).unwrap();

    assert_eq!(report.candidates, expected.candidates);
    assert_eq!(
        healthy.pipeline().tracker().len(),
        control.tracker().len()
    );
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_times_out_without_mutation() {
    let mut config = config(&["SOLUSDT"]);
    config.scheduler.scan_timeout_secs = 5;
    let provider = Arc::new(SimulatedProvider::new().with_latency(StdDuration::from_secs(30)));
    provider.set_series("SOLUSDT", Timeframe::H1, wave(120)).await;

    let (mut worker, _rx) = worker("SOLUSDT", provider, &config);
    let err = worker.scan_once(Utc::now()).await.unwrap_err();

    assert!(matches!(err, EngineError::Timeout { timeout_secs: 5, .. }));
    assert!(err.is_retryable());
    assert!(worker.pipeline().tracker().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scheduler_keeps_scanning_healthy_pairs_and_shuts_down() {
    let config = config(&["XRPUSDT", "ETHUSDT"]);
    let provider = Arc::new(SimulatedProvider::new());
    provider.set_series("ETHUSDT", Timeframe::H1, wave(120)).await;
    provider.fail_always("XRPUSDT").await;

    let mut scheduler = ScanScheduler::new(config.clone(), provider.clone());
    let (tx, _rx) = mpsc::channel(16);
    assert_eq!(scheduler.start(tx).unwrap(), 2);
    assert_eq!(scheduler.running(), 2);

    // H1 주기 = 3600 / 5 = 720초
    let interval = config.scheduler.scan_interval(Timeframe::H1);
    assert_eq!(interval, StdDuration::from_secs(720));
    tokio::time::sleep(interval * 2 + StdDuration::from_secs(1)).await;

    assert!(provider.call_count("ETHUSDT", Timeframe::H1).await >= 2);
    assert!(provider.call_count("XRPUSDT", Timeframe::H1).await >= 2);

    tokio::time::timeout(StdDuration::from_secs(60), scheduler.shutdown())
        .await
        .expect("scheduler should stop promptly");
}
