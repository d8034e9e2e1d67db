//! 패턴 종류, 패턴 후보, 추적 키.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{Direction, Timeframe};

/// 감지 가능한 차트 패턴.
///
/// 각 패턴은 고정된 방향을 가지며, 하락 패턴이 롱 후보를 만드는 일은 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// RSI 하락 + 가격 저점 상승
    BullishDivergence,
    /// RSI 상승 + 가격 고점 하락
    BearishDivergence,
    DoubleBottom,
    DoubleTop,
    /// 저항선 상향 돌파
    Breakout,
    /// 지지선 하향 이탈
    Breakdown,
    SupportBounce,
    ResistanceRejection,
    /// 과매도 구간의 망치형 캔들
    Hammer,
    /// 과매수 구간의 유성형 캔들
    ShootingStar,
}

impl PatternType {
    pub const ALL: [PatternType; 10] = [
        PatternType::BullishDivergence,
        PatternType::BearishDivergence,
        PatternType::DoubleBottom,
        PatternType::DoubleTop,
        PatternType::Breakout,
        PatternType::Breakdown,
        PatternType::SupportBounce,
        PatternType::ResistanceRejection,
        PatternType::Hammer,
        PatternType::ShootingStar,
    ];

    /// 패턴의 기하학적 방향.
    pub fn direction(&self) -> Direction {
        match self {
            PatternType::BullishDivergence
            | PatternType::DoubleBottom
            | PatternType::Breakout
            | PatternType::SupportBounce
            | PatternType::Hammer => Direction::Long,
            PatternType::BearishDivergence
            | PatternType::DoubleTop
            | PatternType::Breakdown
            | PatternType::ResistanceRejection
            | PatternType::ShootingStar => Direction::Short,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::BullishDivergence => "bullish_divergence",
            PatternType::BearishDivergence => "bearish_divergence",
            PatternType::DoubleBottom => "double_bottom",
            PatternType::DoubleTop => "double_top",
            PatternType::Breakout => "breakout",
            PatternType::Breakdown => "breakdown",
            PatternType::SupportBounce => "support_bounce",
            PatternType::ResistanceRejection => "resistance_rejection",
            PatternType::Hammer => "hammer",
            PatternType::ShootingStar => "shooting_star",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Invalid pattern type: {}", s))
    }
}

/// 패턴이 제시하는 가격 레벨.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportingLevels {
    /// 진입 기준 가격
    pub entry: Decimal,
    /// 이 가격을 종가가 넘어서면 패턴이 무효화됨
    pub invalidation: Decimal,
}

impl SupportingLevels {
    pub fn new(entry: Decimal, invalidation: Decimal) -> Self {
        Self {
            entry,
            invalidation,
        }
    }

    /// 주어진 가격이 방향 기준으로 무효화 레벨을 넘어섰는지 확인합니다.
    pub fn is_invalidated_by(&self, direction: Direction, price: Decimal) -> bool {
        match direction {
            Direction::Long => price < self.invalidation,
            Direction::Short => price > self.invalidation,
        }
    }
}

/// 하나의 패턴 인스턴스를 식별하는 (심볼, 타임프레임, 패턴, 방향) 튜플.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TupleKey {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub pattern_type: PatternType,
    pub direction: Direction,
}

impl fmt::Display for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.symbol, self.timeframe, self.pattern_type, self.direction
        )
    }
}

/// 한 번의 스캔에서 패턴 규칙이 만든 후보. 저장되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCandidate {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub pattern_type: PatternType,
    /// 항상 `pattern_type.direction()`과 같음
    pub direction: Direction,
    /// 규칙별 원시 신뢰도 (0.0 ~ 1.0)
    pub raw_confidence: f64,
    pub detected_at: DateTime<Utc>,
    pub levels: SupportingLevels,
}

impl PatternCandidate {
    /// 후보를 생성합니다. 방향은 패턴 종류에서 결정되고 신뢰도는 [0, 1]로 고정됩니다.
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        pattern_type: PatternType,
        raw_confidence: f64,
        levels: SupportingLevels,
        detected_at: DateTime<Utc>,
    ) -> Self {
        let raw_confidence = if raw_confidence.is_finite() {
            raw_confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            symbol: symbol.into(),
            timeframe,
            pattern_type,
            direction: pattern_type.direction(),
            raw_confidence,
            detected_at,
            levels,
        }
    }

    pub fn key(&self) -> TupleKey {
        TupleKey {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            pattern_type: self.pattern_type,
            direction: self.direction,
        }
    }
}
