//! 패턴 규칙 카탈로그와 패턴 감지기.
//!
//! 규칙은 닫힌 열거형 [`PatternRule`]로 표현되며 모든 변형이 동일한
//! `evaluate(window) -> Option<PatternCandidate>` 계약을 따릅니다.
//! 미지(unknown) 지표에 의존하는 규칙은 발동하지 않습니다.

mod divergence;
mod double_extreme;
mod level;
mod reversal;

use chrono::{DateTime, Utc};
use tracing::debug;

use scanner_core::{
    Candle, Direction, IndicatorConfig, IndicatorSnapshot, PatternCandidate, PatternConfig,
    PatternType, SupportingLevels, Timeframe,
};

/// 규칙 평가에 필요한 입력 묶음.
#[derive(Debug, Clone, Copy)]
pub struct DetectionWindow<'a> {
    pub symbol: &'a str,
    pub timeframe: Timeframe,
    /// 닫힌 캔들 (오래된 것부터)
    pub candles: &'a [Candle],
    pub snapshot: &'a IndicatorSnapshot,
    pub indicators: &'a IndicatorConfig,
    pub patterns: &'a PatternConfig,
    pub now: DateTime<Utc>,
}

impl<'a> DetectionWindow<'a> {
    /// 마지막 캔들.
    pub fn last(&self) -> Option<&'a Candle> {
        self.candles.last()
    }

    /// 이 윈도우의 심볼/타임프레임으로 후보를 만듭니다.
    pub(crate) fn candidate(
        &self,
        pattern_type: PatternType,
        confidence: f64,
        levels: SupportingLevels,
    ) -> PatternCandidate {
        PatternCandidate::new(
            self.symbol,
            self.timeframe,
            pattern_type,
            confidence,
            levels,
            self.now,
        )
    }

    /// 거래량 기여도 (0~1). 확인 기준 초과 시 1, 미지이면 0.
    pub(crate) fn volume_component(&self) -> f64 {
        let threshold = self.indicators.volume_confirmation;
        match self.snapshot.volume_ratio {
            Some(ratio) if ratio > threshold => 1.0,
            Some(ratio) if threshold > 0.0 => (ratio / threshold).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// 패턴 규칙.
///
/// 각 변형은 롱/숏 두 방향 중 하나로 고정되며, 방향은 생성되는 패턴 종류와 항상
/// 일치합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternRule {
    /// RSI 다이버전스
    Divergence(Direction),
    /// 이중 바닥/천장
    DoubleExtreme(Direction),
    /// 지지/저항 돌파
    LevelBreak(Direction),
    /// 지지 반등/저항 거부
    LevelReaction(Direction),
    /// 반전 캔들 (망치형/유성형)
    Reversal(Direction),
}

impl PatternRule {
    /// 전체 규칙 카탈로그.
    pub const CATALOGUE: [PatternRule; 10] = [
        PatternRule::Divergence(Direction::Long),
        PatternRule::Divergence(Direction::Short),
        PatternRule::DoubleExtreme(Direction::Long),
        PatternRule::DoubleExtreme(Direction::Short),
        PatternRule::LevelBreak(Direction::Long),
        PatternRule::LevelBreak(Direction::Short),
        PatternRule::LevelReaction(Direction::Long),
        PatternRule::LevelReaction(Direction::Short),
        PatternRule::Reversal(Direction::Long),
        PatternRule::Reversal(Direction::Short),
    ];

    /// 이 규칙이 생성하는 패턴 종류.
    pub fn pattern_type(&self) -> PatternType {
        match self {
            PatternRule::Divergence(Direction::Long) => PatternType::BullishDivergence,
            PatternRule::Divergence(Direction::Short) => PatternType::BearishDivergence,
            PatternRule::DoubleExtreme(Direction::Long) => PatternType::DoubleBottom,
            PatternRule::DoubleExtreme(Direction::Short) => PatternType::DoubleTop,
            PatternRule::LevelBreak(Direction::Long) => PatternType::Breakout,
            PatternRule::LevelBreak(Direction::Short) => PatternType::Breakdown,
            PatternRule::LevelReaction(Direction::Long) => PatternType::SupportBounce,
            PatternRule::LevelReaction(Direction::Short) => PatternType::ResistanceRejection,
            PatternRule::Reversal(Direction::Long) => PatternType::Hammer,
            PatternRule::Reversal(Direction::Short) => PatternType::ShootingStar,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            PatternRule::Divergence(d)
            | PatternRule::DoubleExtreme(d)
            | PatternRule::LevelBreak(d)
            | PatternRule::LevelReaction(d)
            | PatternRule::Reversal(d) => *d,
        }
    }

    /// 윈도우에 규칙을 적용합니다.
    pub fn evaluate(&self, window: &DetectionWindow<'_>) -> Option<PatternCandidate> {
        let pattern_type = self.pattern_type();
        let (confidence, levels) = match *self {
            PatternRule::Divergence(direction) => divergence::evaluate(direction, window)?,
            PatternRule::DoubleExtreme(direction) => double_extreme::evaluate(direction, window)?,
            PatternRule::LevelBreak(direction) => level::evaluate_break(direction, window)?,
            PatternRule::LevelReaction(direction) => level::evaluate_reaction(direction, window)?,
            PatternRule::Reversal(direction) => reversal::evaluate(direction, window)?,
        };
        Some(window.candidate(pattern_type, confidence, levels))
    }
}

/// 패턴 감지기.
///
/// 설정된 규칙 카탈로그를 순서대로 적용해 후보 목록을 만듭니다.
#[derive(Debug, Clone)]
pub struct PatternDetector {
    rules: Vec<PatternRule>,
    indicators: IndicatorConfig,
    patterns: PatternConfig,
}

impl PatternDetector {
    /// 전체 카탈로그로 감지기를 생성합니다.
    pub fn new(indicators: IndicatorConfig, patterns: PatternConfig) -> Self {
        Self {
            rules: PatternRule::CATALOGUE.to_vec(),
            indicators,
            patterns,
        }
    }

    /// 사용할 규칙을 제한합니다.
    pub fn with_rules(mut self, rules: Vec<PatternRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// 현재 시각 기준으로 패턴을 감지합니다.
    pub fn detect(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candles: &[Candle],
        snapshot: &IndicatorSnapshot,
    ) -> Vec<PatternCandidate> {
        self.detect_at(symbol, timeframe, candles, snapshot, Utc::now())
    }

    /// 주어진 감지 시각으로 패턴을 감지합니다.
    pub fn detect_at(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candles: &[Candle],
        snapshot: &IndicatorSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<PatternCandidate> {
        if candles.is_empty() {
            return Vec::new();
        }

        let window = DetectionWindow {
            symbol,
            timeframe,
            candles,
            snapshot,
            indicators: &self.indicators,
            patterns: &self.patterns,
            now,
        };

        let candidates: Vec<PatternCandidate> = self
            .rules
            .iter()
            .filter_map(|rule| rule.evaluate(&window))
            .collect();

        if !candidates.is_empty() {
            debug!(
                symbol = %symbol,
                timeframe = %timeframe,
                count = candidates.len(),
                patterns = ?candidates.iter().map(|c| c.pattern_type).collect::<Vec<_>>(),
                "패턴 후보 감지"
            );
        }

        candidates
    }
}
