//! 엔진 에러 타입.

use thiserror::Error;

use scanner_exchange::ExchangeError;
use scanner_risk::RiskError;

/// 스캔 한 번의 실패 원인. 어떤 에러도 다른 쌍의 스캔에 영향을 주지 않습니다.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("시장 데이터 조회 실패: {0}")]
    MarketData(#[from] ExchangeError),

    #[error("조회 타임아웃: {symbol} {timeframe} ({timeout_secs}초)")]
    Timeout {
        symbol: String,
        timeframe: String,
        timeout_secs: u64,
    },

    #[error("캔들 부족: {have}개 (최소 {need}개)")]
    InsufficientData { have: usize, need: usize },

    #[error("리스크 설정 오류: {0}")]
    Risk(#[from] RiskError),

    #[error("시그널 채널이 닫힘")]
    ChannelClosed,
}

impl EngineError {
    /// 다음 주기에 다시 시도하면 해결될 수 있는지.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::MarketData(e) => e.is_retryable(),
            EngineError::Timeout { .. } | EngineError::InsufficientData { .. } => true,
            EngineError::Risk(_) | EngineError::ChannelClosed => false,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
