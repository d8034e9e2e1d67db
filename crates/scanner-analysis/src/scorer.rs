//! 진입 점수 계산기.
//!
//! 확정된 단계 레코드, 지표 스냅샷, 시장 맥락으로 0~100 점수를 계산합니다.
//!
//! | 요소 | 기본 가중치 |
//! |------|------------|
//! | 패턴 레벨 근접도 | 30 |
//! | 상위 타임프레임 추세 정렬 | 25 |
//! | RSI 극단성 | 20 |
//! | 거래량 확인 | 15 |
//! | 멀티 타임프레임 상관 | 10 |

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use scanner_core::{
    Alignment, Direction, IndicatorConfig, IndicatorSnapshot, MarketContext, ScoreFactors,
    ScoringConfig, SignalAction, StageRecord, TrendDirection,
};

/// ATR을 모를 때 근접도 만점이 사라지는 거리 (%)
const FALLBACK_PROXIMITY_SPAN_PCT: f64 = 2.0;

/// 진입 점수 계산 결과.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryScore {
    /// 합계 (0~100)
    pub total: f64,
    pub factors: ScoreFactors,
    pub action: SignalAction,
}

impl EntryScore {
    /// 발행 최소 점수 이상이고 무시 등급이 아닌지 확인합니다.
    pub fn is_publishable(&self, min_entry_score: f64) -> bool {
        self.action != SignalAction::Ignore && self.total >= min_entry_score
    }
}

/// 진입 점수 계산기.
#[derive(Debug, Clone)]
pub struct EntryScorer {
    config: ScoringConfig,
    rsi_oversold: f64,
    rsi_overbought: f64,
}

impl EntryScorer {
    pub fn new(config: ScoringConfig, indicators: &IndicatorConfig) -> Self {
        Self {
            config,
            rsi_oversold: indicators.rsi_oversold,
            rsi_overbought: indicators.rsi_overbought,
        }
    }

    pub fn min_entry_score(&self) -> f64 {
        self.config.min_entry_score
    }

    /// 레코드의 진입 점수를 계산합니다.
    pub fn score(
        &self,
        record: &StageRecord,
        snapshot: &IndicatorSnapshot,
        context: &MarketContext,
    ) -> EntryScore {
        let direction = record.key.direction;
        let weights = &self.config.weights;
        // 가중치 합계가 100이 아니어도 0~100 범위를 유지
        let scale = if weights.sum() > 0.0 {
            100.0 / weights.sum()
        } else {
            0.0
        };

        let factors = ScoreFactors {
            proximity: weights.proximity * scale * self.proximity(record, snapshot),
            trend_alignment: weights.trend_alignment
                * scale
                * trend_fraction(
                    context.higher_timeframe_trend.or(snapshot.trend),
                    direction,
                ),
            rsi_extremity: weights.rsi_extremity * scale * self.rsi_fraction(snapshot.rsi, direction),
            volume_confirmation: weights.volume_confirmation
                * scale
                * volume_fraction(snapshot.volume_ratio),
            multi_timeframe: weights.multi_timeframe
                * scale
                * correlation_fraction(snapshot, context, direction),
        };

        let total = factors.total();
        EntryScore {
            total,
            factors,
            action: self.classify(total),
        }
    }

    /// 점수 구간별 권장 행동.
    pub fn classify(&self, total: f64) -> SignalAction {
        if total >= self.config.strong_threshold {
            SignalAction::Strong
        } else if total >= self.config.moderate_threshold {
            SignalAction::Moderate
        } else if total >= self.config.weak_threshold {
            SignalAction::Weak
        } else {
            SignalAction::Ignore
        }
    }

    /// 종가와 패턴 진입 레벨의 근접도 (0~1).
    fn proximity(&self, record: &StageRecord, snapshot: &IndicatorSnapshot) -> f64 {
        let entry = record.levels.entry;
        if entry <= Decimal::ZERO {
            return 0.0;
        }
        let distance = (snapshot.close - entry).abs();

        let fraction = match snapshot.atr.filter(|atr| *atr > Decimal::ZERO) {
            Some(atr) => {
                let span = atr.to_f64().unwrap_or(0.0) * self.config.proximity_atr_span;
                if span <= 0.0 {
                    return 0.0;
                }
                1.0 - distance.to_f64().unwrap_or(f64::MAX) / span
            }
            None => {
                let pct = (distance / entry).to_f64().unwrap_or(f64::MAX) * 100.0;
                1.0 - pct / FALLBACK_PROXIMITY_SPAN_PCT
            }
        };

        fraction.clamp(0.0, 1.0)
    }

    /// 단계별 RSI 점수표.
    fn rsi_fraction(&self, rsi: Option<f64>, direction: Direction) -> f64 {
        let Some(rsi) = rsi else {
            return 0.0;
        };

        match direction {
            Direction::Long => {
                if rsi <= self.rsi_oversold {
                    1.0
                } else if rsi < 40.0 {
                    0.8
                } else if rsi < 50.0 {
                    0.6
                } else if rsi < 65.0 {
                    0.3
                } else {
                    0.0
                }
            }
            Direction::Short => {
                if rsi >= self.rsi_overbought {
                    1.0
                } else if rsi > 60.0 {
                    0.8
                } else if rsi > 50.0 {
                    0.6
                } else if rsi > 35.0 {
                    0.3
                } else {
                    0.0
                }
            }
        }
    }
}

fn alignment_fraction(alignment: Alignment) -> f64 {
    match alignment {
        Alignment::Aligned => 1.0,
        Alignment::Neutral => 0.5,
        Alignment::Opposed => 0.0,
    }
}

/// 추세 정렬 점수. 추세를 모르면 중립으로 취급합니다.
fn trend_fraction(trend: Option<TrendDirection>, direction: Direction) -> f64 {
    trend
        .map(|t| alignment_fraction(t.alignment_with(direction)))
        .unwrap_or(0.5)
}

/// 단계별 거래량 점수표.
fn volume_fraction(volume_ratio: Option<f64>) -> f64 {
    match volume_ratio {
        None => 0.0,
        Some(r) if r < 0.3 => 0.0,
        Some(r) if r < 0.5 => 0.3,
        Some(r) if r < 0.8 => 0.6,
        Some(r) if r < 1.5 => 0.8,
        Some(_) => 1.0,
    }
}

/// 자기 타임프레임, 상위 타임프레임, 기준 심볼 추세의 평균 정렬도.
fn correlation_fraction(
    snapshot: &IndicatorSnapshot,
    context: &MarketContext,
    direction: Direction,
) -> f64 {
    let known: Vec<f64> = [
        snapshot.trend,
        context.higher_timeframe_trend,
        context.reference_trend,
    ]
    .into_iter()
    .flatten()
    .map(|t| alignment_fraction(t.alignment_with(direction)))
    .collect();

    if known.is_empty() {
        return 0.0;
    }
    known.iter().sum::<f64>() / known.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use scanner_core::{PatternCandidate, PatternType, SupportingLevels, Timeframe};

    fn record(direction_pattern: PatternType, entry: Decimal) -> StageRecord {
        let candidate = PatternCandidate::new(
            "SOLUSDT",
            Timeframe::M15,
            direction_pattern,
            0.9,
            SupportingLevels::new(entry, entry * dec!(0.95)),
            Utc::now(),
        );
        StageRecord::from_candidate(&candidate, Utc::now())
    }

    fn scorer() -> EntryScorer {
        EntryScorer::new(ScoringConfig::default(), &IndicatorConfig::default())
    }

    fn ideal_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi: Some(25.0),
            atr: Some(dec!(2)),
            atr_percent: Some(2.0),
            volume_ratio: Some(2.0),
            trend: Some(TrendDirection::Up),
            ..IndicatorSnapshot::unknown(dec!(100))
        }
    }

    fn aligned_context() -> MarketContext {
        MarketContext {
            higher_timeframe: Some(Timeframe::H1),
            higher_timeframe_trend: Some(TrendDirection::Up),
            reference_symbol: Some("BTCUSDT".to_string()),
            reference_trend: Some(TrendDirection::Up),
        }
    }

    #[test]
    fn test_ideal_long_scores_full() {
        let score = scorer().score(
            &record(PatternType::BullishDivergence, dec!(100)),
            &ideal_snapshot(),
            &aligned_context(),
        );
        assert!((score.total - 100.0).abs() < 1e-9);
        assert_eq!(score.action, SignalAction::Strong);
        assert!(score.is_publishable(60.0));
    }

    #[test]
    fn test_opposed_short_scores_low() {
        let snapshot = IndicatorSnapshot {
            rsi: Some(20.0),
            ..ideal_snapshot()
        };
        let score = scorer().score(
            &record(PatternType::DoubleTop, dec!(100)),
            &snapshot,
            &aligned_context(),
        );
        // 근접도 30 + 거래량 15 만 획득
        assert!((score.total - 45.0).abs() < 1e-9);
        assert_eq!(score.factors.trend_alignment, 0.0);
        assert_eq!(score.factors.multi_timeframe, 0.0);
        assert_eq!(score.action, SignalAction::Ignore);
        assert!(!score.is_publishable(60.0));
    }

    #[test]
    fn test_unknown_indicators_contribute_nothing() {
        let snapshot = IndicatorSnapshot::unknown(dec!(100));
        let score = scorer().score(
            &record(PatternType::Hammer, dec!(100)),
            &snapshot,
            &MarketContext::default(),
        );
        assert_eq!(score.factors.rsi_extremity, 0.0);
        assert_eq!(score.factors.volume_confirmation, 0.0);
        assert_eq!(score.factors.multi_timeframe, 0.0);
        // 추세 미지 = 중립 절반
        assert!((score.factors.trend_alignment - 12.5).abs() < 1e-9);
        // ATR 미지: 퍼센트 거리 0 → 만점
        assert!((score.factors.proximity - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_proximity_decays_with_distance() {
        let s = scorer();
        let rec = record(PatternType::Breakout, dec!(100));
        let near = IndicatorSnapshot {
            close: dec!(101),
            ..ideal_snapshot()
        };
        let far = IndicatorSnapshot {
            close: dec!(105),
            ..ideal_snapshot()
        };
        let near_score = s.score(&rec, &near, &aligned_context());
        let far_score = s.score(&rec, &far, &aligned_context());

        // ATR 2, 범위 4: 거리 1 → 0.75
        assert!((near_score.factors.proximity - 22.5).abs() < 1e-9);
        assert_eq!(far_score.factors.proximity, 0.0);
    }

    #[test]
    fn test_rsi_and_volume_tables() {
        let s = scorer();
        assert_eq!(s.rsi_fraction(Some(28.0), Direction::Long), 1.0);
        assert_eq!(s.rsi_fraction(Some(39.9), Direction::Long), 0.8);
        assert_eq!(s.rsi_fraction(Some(45.0), Direction::Long), 0.6);
        assert_eq!(s.rsi_fraction(Some(70.0), Direction::Long), 0.0);
        assert_eq!(s.rsi_fraction(Some(73.0), Direction::Short), 1.0);
        assert_eq!(s.rsi_fraction(Some(40.0), Direction::Short), 0.3);

        assert_eq!(volume_fraction(Some(0.2)), 0.0);
        assert_eq!(volume_fraction(Some(0.7)), 0.6);
        assert_eq!(volume_fraction(Some(1.5)), 1.0);
    }

    #[test]
    fn test_classify_boundaries() {
        let s = scorer();
        assert_eq!(s.classify(70.0), SignalAction::Strong);
        assert_eq!(s.classify(69.9), SignalAction::Moderate);
        assert_eq!(s.classify(60.0), SignalAction::Moderate);
        assert_eq!(s.classify(55.0), SignalAction::Weak);
        assert_eq!(s.classify(49.9), SignalAction::Ignore);
    }

    #[test]
    fn test_unbalanced_weights_stay_bounded() {
        let mut config = ScoringConfig::default();
        config.weights.proximity = 300.0;
        let s = EntryScorer::new(config, &IndicatorConfig::default());
        let score = s.score(
            &record(PatternType::BullishDivergence, dec!(100)),
            &ideal_snapshot(),
            &aligned_context(),
        );
        assert!(score.total <= 100.0);
        assert!((score.total - 100.0).abs() < 1e-9);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn trend_strategy() -> impl Strategy<Value = Option<TrendDirection>> {
            prop_oneof![
                Just(None),
                Just(Some(TrendDirection::Up)),
                Just(Some(TrendDirection::Down)),
                Just(Some(TrendDirection::Sideways)),
            ]
        }

        proptest! {
            #[test]
            fn score_is_always_bounded(
                close in 1u32..1_000_000,
                entry in 1u32..1_000_000,
                rsi in proptest::option::of(0.0f64..100.0),
                volume in proptest::option::of(0.0f64..10.0),
                atr in proptest::option::of(0u32..10_000),
                trend in trend_strategy(),
                htf in trend_strategy(),
                reference in trend_strategy(),
                long in any::<bool>(),
            ) {
                let pattern = if long { PatternType::Breakout } else { PatternType::Breakdown };
                let snapshot = IndicatorSnapshot {
                    rsi,
                    volume_ratio: volume,
                    atr: atr.map(Decimal::from),
                    trend,
                    ..IndicatorSnapshot::unknown(Decimal::from(close))
                };
                let context = MarketContext {
                    higher_timeframe_trend: htf,
                    reference_trend: reference,
                    ..MarketContext::default()
                };

                let score = scorer().score(&record(pattern, Decimal::from(entry)), &snapshot, &context);
                prop_assert!(score.total >= 0.0 && score.total <= 100.0);
            }
        }
    }
}
