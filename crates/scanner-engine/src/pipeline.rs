//! 한 (심볼, 타임프레임) 쌍의 스캔 파이프라인.
//!
//! 지표 계산 → 패턴 감지 → 단계 추적 → 진입 점수 → 리스크 계산을 한 번에
//! 수행합니다. 파이프라인은 단계 추적기를 독점 소유하므로 워커 하나에 하나씩
//! 존재하며, 단계 전이는 I/O 없이 동기적으로 적용됩니다.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use scanner_analysis::{
    compute_indicators, EntryScorer, PatternDetector, StageEvent, StageTracker,
};
use scanner_core::{
    AppConfig, Candle, IndicatorConfig, IndicatorSnapshot, MarketContext, Signal, StageRecord,
    Timeframe,
};
use scanner_risk::RiskCalculator;

use crate::error::{EngineError, EngineResult};

/// 스캔 한 번의 결과.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// 이번 스캔에서 감지된 후보 수
    pub candidates: usize,
    pub events: Vec<StageEvent>,
    /// 발행 대상 시그널
    pub signals: Vec<Signal>,
}

/// 쌍 하나를 위한 상태 있는 파이프라인.
#[derive(Debug, Clone)]
pub struct ScanPipeline {
    symbol: String,
    timeframe: Timeframe,
    indicators: IndicatorConfig,
    detector: PatternDetector,
    tracker: StageTracker,
    scorer: EntryScorer,
    risk: RiskCalculator,
    min_history: usize,
    /// 마지막으로 처리한 캔들의 시작 시각
    last_candle: Option<DateTime<Utc>>,
}

impl ScanPipeline {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, config: &AppConfig) -> EngineResult<Self> {
        Ok(Self {
            symbol: symbol.into(),
            timeframe,
            indicators: config.indicators.clone(),
            detector: PatternDetector::new(config.indicators.clone(), config.patterns.clone()),
            tracker: StageTracker::new(config.stages.clone(), config.indicators.volume_confirmation),
            scorer: EntryScorer::new(config.scoring.clone(), &config.indicators),
            risk: RiskCalculator::new(config.risk.clone())?,
            min_history: config.scheduler.min_history,
            last_candle: None,
        })
    }

    /// 감지기를 교체합니다 (규칙 제한 등).
    pub fn with_detector(mut self, detector: PatternDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn tracker(&self) -> &StageTracker {
        &self.tracker
    }

    pub fn last_candle(&self) -> Option<DateTime<Utc>> {
        self.last_candle
    }

    /// 캔들 윈도우로 스캔을 수행합니다.
    ///
    /// 캔들이 최소 개수보다 적으면 단계 레코드를 건드리지 않고 에러를 반환합니다.
    /// 마지막 캔들이 직전 스캔과 같으면 단계를 진행하지 않고 빈 리포트를 반환합니다.
    /// 단계는 새로 마감된 캔들 하나당 한 번만 전이됩니다.
    pub fn process(
        &mut self,
        candles: &[Candle],
        context: &MarketContext,
        now: DateTime<Utc>,
    ) -> EngineResult<ScanReport> {
        if candles.len() < self.min_history {
            return Err(EngineError::InsufficientData {
                have: candles.len(),
                need: self.min_history,
            });
        }

        let latest = candles.last().map(|c| c.timestamp);
        if latest == self.last_candle {
            debug!(
                symbol = %self.symbol,
                timeframe = %self.timeframe,
                "새 캔들 없음, 단계 유지"
            );
            return Ok(ScanReport::default());
        }
        self.last_candle = latest;

        let snapshot = compute_indicators(candles, &self.indicators);
        Ok(self.evaluate(candles, &snapshot, context, now))
    }

    /// 계산된 스냅샷으로 감지/추적/점수/리스크 단계를 수행합니다.
    pub fn evaluate(
        &mut self,
        candles: &[Candle],
        snapshot: &IndicatorSnapshot,
        context: &MarketContext,
        now: DateTime<Utc>,
    ) -> ScanReport {
        let candidates =
            self.detector
                .detect_at(&self.symbol, self.timeframe, candles, snapshot, now);
        let candidate_count = candidates.len();

        let volume_confirmed = snapshot.volume_confirmed(self.tracker.volume_threshold());
        let events = self
            .tracker
            .advance(candidates, snapshot.close, volume_confirmed, now);

        let signals = events
            .iter()
            .filter_map(|event| match event {
                StageEvent::Confirmed(record) => self.build_signal(record, snapshot, context, now),
                _ => None,
            })
            .collect();

        ScanReport {
            candidates: candidate_count,
            events,
            signals,
        }
    }

    /// 확정된 레코드를 점수화하고 리스크 레벨을 붙여 시그널로 만듭니다.
    fn build_signal(
        &self,
        record: &StageRecord,
        snapshot: &IndicatorSnapshot,
        context: &MarketContext,
        now: DateTime<Utc>,
    ) -> Option<Signal> {
        let key = &record.key;
        let score = self.scorer.score(record, snapshot, context);

        if !score.is_publishable(self.scorer.min_entry_score()) {
            debug!(
                key = %key,
                score = score.total,
                action = %score.action,
                "진입 점수 미달, 발행하지 않음"
            );
            return None;
        }

        let Some(atr_percent) = snapshot.atr_percent else {
            warn!(key = %key, "ATR 미지, 리스크 계산 불가");
            return None;
        };

        let levels = match self
            .risk
            .compute_risk(snapshot.close, atr_percent, key.direction)
        {
            Ok(levels) => levels,
            Err(e) => {
                warn!(key = %key, error = %e, "리스크 계산 실패, 발행하지 않음");
                return None;
            }
        };

        let signal = Signal {
            id: Uuid::new_v4(),
            symbol: key.symbol.clone(),
            timeframe: key.timeframe,
            pattern_type: key.pattern_type,
            direction: key.direction,
            entry_price: levels.entry,
            stop_loss: levels.stop_loss,
            take_profit_1: levels.take_profit_1,
            take_profit_2: levels.take_profit_2,
            leverage: levels.leverage,
            risk_reward_ratio: levels.risk_reward_ratio,
            entry_score: score.total,
            confidence: record.confidence,
            action: score.action,
            atr_percent,
            factors: score.factors,
            context: context.clone(),
            created_at: now,
        };

        info!(
            key = %key,
            score = signal.entry_score,
            action = %signal.action,
            entry = %signal.entry_price,
            stop_loss = %signal.stop_loss,
            leverage = signal.leverage,
            "시그널 생성"
        );

        Some(signal)
    }
}
