//! (심볼, 타임프레임) 쌍 하나를 담당하는 스캔 워커.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use scanner_analysis::{reference_trend, trend_direction};
use scanner_core::{scan_span, AppConfig, Candle, IndicatorConfig, MarketContext, Signal, Timeframe};
use scanner_exchange::MarketDataProvider;

use crate::error::{EngineError, EngineResult};
use crate::pipeline::{ScanPipeline, ScanReport};

/// 주기적으로 스캔을 실행하는 워커.
///
/// 스캔은 tick 루프 안에서 순차 실행되므로 같은 쌍의 스캔이 동시에 돌지 않습니다.
/// 스캔이 주기보다 길어지면 밀린 tick은 건너뜁니다.
pub struct ScanWorker {
    pipeline: ScanPipeline,
    provider: Arc<dyn MarketDataProvider>,
    signals: mpsc::Sender<Signal>,
    indicators: IndicatorConfig,
    reference_symbol: Option<String>,
    candle_limit: usize,
    scan_interval: Duration,
    scan_timeout: Duration,
}

impl ScanWorker {
    pub fn new(
        pipeline: ScanPipeline,
        provider: Arc<dyn MarketDataProvider>,
        signals: mpsc::Sender<Signal>,
        config: &AppConfig,
    ) -> Self {
        let timeframe = pipeline.timeframe();
        Self {
            pipeline,
            provider,
            signals,
            indicators: config.indicators.clone(),
            reference_symbol: config.market.reference_symbol.clone(),
            candle_limit: config.market.candle_limit,
            scan_interval: config.scheduler.scan_interval(timeframe),
            scan_timeout: config.scheduler.scan_timeout(),
        }
    }

    pub fn symbol(&self) -> &str {
        self.pipeline.symbol()
    }

    pub fn timeframe(&self) -> Timeframe {
        self.pipeline.timeframe()
    }

    pub fn scan_interval(&self) -> Duration {
        self.scan_interval
    }

    pub fn pipeline(&self) -> &ScanPipeline {
        &self.pipeline
    }

    /// 취소될 때까지 주기적으로 스캔합니다. 진행 중인 스캔은 끝까지 수행합니다.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            symbol = %self.symbol(),
            timeframe = %self.timeframe(),
            every_secs = self.scan_interval.as_secs(),
            "스캔 워커 시작"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let span = scan_span!("scan", self.symbol(), self.timeframe());
            match self.scan_once(Utc::now()).instrument(span).await {
                Ok(report) => {
                    debug!(
                        symbol = %self.symbol(),
                        timeframe = %self.timeframe(),
                        candidates = report.candidates,
                        events = report.events.len(),
                        signals = report.signals.len(),
                        "스캔 완료"
                    );
                }
                Err(EngineError::ChannelClosed) => {
                    warn!(symbol = %self.symbol(), "시그널 채널이 닫혀 워커 종료");
                    break;
                }
                Err(e) => {
                    warn!(
                        symbol = %self.symbol(),
                        timeframe = %self.timeframe(),
                        error = %e,
                        retryable = e.is_retryable(),
                        "스캔 건너뜀"
                    );
                }
            }
        }

        info!(symbol = %self.symbol(), timeframe = %self.timeframe(), "스캔 워커 종료");
    }

    /// 스캔 한 번: 조회 → 파이프라인 → 시그널 전달.
    ///
    /// 조회가 실패하면 단계 레코드를 건드리지 않습니다.
    pub async fn scan_once(&mut self, now: DateTime<Utc>) -> EngineResult<ScanReport> {
        let candles = self
            .fetch(self.symbol().to_string(), self.timeframe())
            .await?;
        let context = self.market_context().await;

        let report = self.pipeline.process(&candles, &context, now)?;

        for signal in &report.signals {
            self.signals
                .send(signal.clone())
                .await
                .map_err(|_| EngineError::ChannelClosed)?;
        }

        Ok(report)
    }

    async fn fetch(&self, symbol: String, timeframe: Timeframe) -> EngineResult<Vec<Candle>> {
        match timeout(
            self.scan_timeout,
            self.provider
                .fetch_candles(&symbol, timeframe, self.candle_limit),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(EngineError::Timeout {
                symbol,
                timeframe: timeframe.to_string(),
                timeout_secs: self.scan_timeout.as_secs(),
            }),
        }
    }

    /// 상위 타임프레임과 기준 심볼의 추세. 조회 실패는 미지로 둡니다.
    async fn market_context(&self) -> MarketContext {
        let mut context = MarketContext::default();

        if let Some(higher) = self.timeframe().higher() {
            context.higher_timeframe = Some(higher);
            match self.fetch(self.symbol().to_string(), higher).await {
                Ok(candles) => {
                    let closes: Vec<_> = candles.iter().map(|c| c.close).collect();
                    context.higher_timeframe_trend = trend_direction(
                        &closes,
                        self.indicators.trend_fast_period,
                        self.indicators.trend_slow_period,
                        self.indicators.trend_band_pct,
                    );
                }
                Err(e) => debug!(timeframe = %higher, error = %e, "상위 타임프레임 조회 실패"),
            }
        }

        if let Some(reference) = &self.reference_symbol {
            context.reference_symbol = Some(reference.clone());
            match self.fetch(reference.clone(), self.timeframe()).await {
                Ok(candles) => context.reference_trend = reference_trend(&candles),
                Err(e) => debug!(reference = %reference, error = %e, "기준 심볼 조회 실패"),
            }
        }

        context
    }
}
