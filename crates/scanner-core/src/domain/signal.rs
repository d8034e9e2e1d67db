//! 발행되는 트레이딩 시그널.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::pattern::{PatternType, TupleKey};
use crate::types::{Direction, Timeframe, TrendDirection};

/// 진입 점수에 따른 권장 행동.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    /// 강한 진입 권장
    Strong,
    /// 보통 진입 권장
    Moderate,
    /// 참고용
    Weak,
    /// 발행하지 않음
    Ignore,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Strong => "strong",
            SignalAction::Moderate => "moderate",
            SignalAction::Weak => "weak",
            SignalAction::Ignore => "ignore",
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SignalAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strong" => Ok(SignalAction::Strong),
            "moderate" => Ok(SignalAction::Moderate),
            "weak" => Ok(SignalAction::Weak),
            "ignore" => Ok(SignalAction::Ignore),
            _ => Err(format!("Invalid signal action: {}", s)),
        }
    }
}

/// 진입 점수의 구성 요소별 점수.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactors {
    /// 패턴 레벨 근접도
    pub proximity: f64,
    /// 상위 타임프레임 추세 정렬
    pub trend_alignment: f64,
    /// RSI 극단성
    pub rsi_extremity: f64,
    /// 거래량 확인
    pub volume_confirmation: f64,
    /// 멀티 타임프레임 상관
    pub multi_timeframe: f64,
}

impl ScoreFactors {
    /// 구성 요소 합계 (0~100).
    pub fn total(&self) -> f64 {
        let sum = self.proximity
            + self.trend_alignment
            + self.rsi_extremity
            + self.volume_confirmation
            + self.multi_timeframe;
        if sum.is_finite() {
            sum.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

/// 점수 계산에 사용된 시장 맥락.
///
/// 시그널과 함께 저장되어 점수를 재현할 수 있게 합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    /// 비교한 상위 타임프레임
    pub higher_timeframe: Option<Timeframe>,
    /// 상위 타임프레임 추세
    pub higher_timeframe_trend: Option<TrendDirection>,
    /// 기준 심볼 (예: BTCUSDT)
    pub reference_symbol: Option<String>,
    /// 기준 심볼 추세
    pub reference_trend: Option<TrendDirection>,
}

/// 확정 후 발행된 시그널. 한 번 생성되면 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub pattern_type: PatternType,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit_1: Decimal,
    pub take_profit_2: Decimal,
    /// 권장 레버리지 (배)
    pub leverage: u32,
    pub risk_reward_ratio: f64,
    /// 진입 점수 (0~100)
    pub entry_score: f64,
    /// 확정 시점의 단계 레코드 신뢰도
    pub confidence: f64,
    pub action: SignalAction,
    pub atr_percent: f64,
    pub factors: ScoreFactors,
    pub context: MarketContext,
    pub created_at: DateTime<Utc>,
}

impl Signal {
    pub fn key(&self) -> TupleKey {
        TupleKey {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            pattern_type: self.pattern_type,
            direction: self.direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_total_is_bounded() {
        let factors = ScoreFactors {
            proximity: 30.0,
            trend_alignment: 25.0,
            rsi_extremity: 20.0,
            volume_confirmation: 15.0,
            multi_timeframe: 10.0,
        };
        assert_eq!(factors.total(), 100.0);

        let overflow = ScoreFactors {
            proximity: 90.0,
            ..factors
        };
        assert_eq!(overflow.total(), 100.0);

        let broken = ScoreFactors {
            proximity: f64::NAN,
            ..Default::default()
        };
        assert_eq!(broken.total(), 0.0);
    }

    #[test]
    fn test_action_serde() {
        assert_eq!(
            serde_json::to_string(&SignalAction::Moderate).unwrap(),
            "\"moderate\""
        );
        assert_eq!("strong".parse::<SignalAction>().unwrap(), SignalAction::Strong);
    }
}
