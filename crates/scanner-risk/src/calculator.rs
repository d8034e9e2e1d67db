//! 손절/익절/레버리지 계산기.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use scanner_core::{apply_pct, Direction, RiskConfig};

use crate::error::{RiskError, RiskResult};

/// 계산된 리스크 파라미터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLevels {
    pub direction: Direction,
    pub entry: Decimal,
    pub stop_loss: Decimal,
    pub take_profit_1: Decimal,
    pub take_profit_2: Decimal,
    /// TP1 거리 / 손절 거리
    pub risk_reward_ratio: f64,
    /// 권장 레버리지 (배)
    pub leverage: u32,
    /// 입력 ATR%
    pub atr_percent: f64,
}

/// 변동성 기반 리스크 계산기.
#[derive(Debug, Clone)]
pub struct RiskCalculator {
    config: RiskConfig,
}

impl RiskCalculator {
    /// 설정을 검증하고 계산기를 생성합니다.
    pub fn new(config: RiskConfig) -> RiskResult<Self> {
        if !(config.atr_low_pct >= 0.0 && config.atr_low_pct < config.atr_high_pct) {
            return Err(RiskError::InvalidConfig(
                "atr_low_pct must be >= 0 and below atr_high_pct".into(),
            ));
        }
        if !(config.rr_min > 0.0 && config.rr_min <= config.rr_max) {
            return Err(RiskError::InvalidConfig(
                "rr_min must be > 0 and not above rr_max".into(),
            ));
        }
        if config.leverage_min == 0 || config.leverage_min > config.leverage_max {
            return Err(RiskError::InvalidConfig(
                "leverage_min must be >= 1 and not above leverage_max".into(),
            ));
        }
        if config.stop_atr_multiplier <= 0.0 || config.tp2_extension < 1.0 {
            return Err(RiskError::InvalidConfig(
                "stop_atr_multiplier must be > 0 and tp2_extension >= 1".into(),
            ));
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// 허용되는 최대 ATR%. 이를 넘으면 숏 목표가가 0 이하가 됩니다.
    pub fn max_atr_percent(&self) -> f64 {
        100.0 / (self.config.stop_atr_multiplier * self.config.rr_max * self.config.tp2_extension)
    }

    /// ATR% 구간 내 위치 (0~1).
    fn volatility_position(&self, atr_percent: f64) -> f64 {
        let span = self.config.atr_high_pct - self.config.atr_low_pct;
        ((atr_percent - self.config.atr_low_pct) / span).clamp(0.0, 1.0)
    }

    /// ATR%에 대해 단조 증가하는 R:R (소수점 2자리).
    pub fn risk_reward_for(&self, atr_percent: f64) -> f64 {
        let t = self.volatility_position(atr_percent);
        let rr = self.config.rr_min + t * (self.config.rr_max - self.config.rr_min);
        ((rr * 100.0).round() / 100.0).clamp(self.config.rr_min, self.config.rr_max)
    }

    /// ATR%에 대해 단조 감소하는 레버리지.
    pub fn leverage_for(&self, atr_percent: f64) -> u32 {
        let t = self.volatility_position(atr_percent);
        let max = f64::from(self.config.leverage_max);
        let min = f64::from(self.config.leverage_min);
        let leverage = (max - t * (max - min)).floor() as u32;
        leverage.clamp(self.config.leverage_min, self.config.leverage_max)
    }

    /// 진입가, ATR%, 방향으로 손절/익절/R:R/레버리지를 계산합니다.
    pub fn compute_risk(
        &self,
        entry: Decimal,
        atr_percent: f64,
        direction: Direction,
    ) -> RiskResult<RiskLevels> {
        if entry <= Decimal::ZERO {
            return Err(RiskError::InvalidEntry(entry));
        }
        if !atr_percent.is_finite() || atr_percent <= 0.0 {
            return Err(RiskError::InvalidVolatility(atr_percent));
        }
        let max = self.max_atr_percent();
        if atr_percent >= max {
            return Err(RiskError::VolatilityOutOfRange { atr_percent, max });
        }

        let rr = self.risk_reward_for(atr_percent);
        let leverage = self.leverage_for(atr_percent);

        let stop_pct = atr_percent * self.config.stop_atr_multiplier;
        let tp1_pct = stop_pct * rr;
        let tp2_pct = tp1_pct * self.config.tp2_extension;

        let sign = match direction {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        };
        let scale = self.config.price_scale;

        let levels = RiskLevels {
            direction,
            entry,
            stop_loss: apply_pct(entry, -sign * stop_pct).round_dp(scale),
            take_profit_1: apply_pct(entry, sign * tp1_pct).round_dp(scale),
            take_profit_2: apply_pct(entry, sign * tp2_pct).round_dp(scale),
            risk_reward_ratio: rr,
            leverage,
            atr_percent,
        };

        trace!(
            entry = %levels.entry,
            atr_percent,
            direction = %direction,
            stop_loss = %levels.stop_loss,
            rr,
            leverage,
            "리스크 계산"
        );

        Ok(levels)
    }
}
