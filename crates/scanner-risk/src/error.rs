//! 리스크 계산 에러.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("잘못된 진입가: {0}")]
    InvalidEntry(Decimal),

    #[error("잘못된 ATR%: {0}")]
    InvalidVolatility(f64),

    #[error("ATR% {atr_percent}가 허용 범위를 넘었습니다 (최대 {max:.2})")]
    VolatilityOutOfRange { atr_percent: f64, max: f64 },

    #[error("잘못된 리스크 설정: {0}")]
    InvalidConfig(String),
}

pub type RiskResult<T> = Result<T, RiskError>;
