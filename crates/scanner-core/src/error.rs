//! 스캐너 공용 에러 타입.

use thiserror::Error;

/// 핵심 스캐너 에러.
#[derive(Debug, Error)]
pub enum ScannerError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 시장 데이터 조회 에러
    #[error("시장 데이터 에러: {0}")]
    MarketData(String),

    /// 지표 계산에 필요한 데이터 부족
    #[error("데이터 부족: {0}")]
    InsufficientData(String),

    /// 저장소 에러
    #[error("저장소 에러: {0}")]
    Persistence(String),

    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 스캐너 작업을 위한 Result 타입.
pub type ScannerResult<T> = Result<T, ScannerError>;

impl ScannerError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScannerError::Network(_) | ScannerError::MarketData(_) | ScannerError::Persistence(_)
        )
    }
}

impl From<serde_json::Error> for ScannerError {
    fn from(err: serde_json::Error) -> Self {
        ScannerError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for ScannerError {
    fn from(err: config::ConfigError) -> Self {
        ScannerError::Config(err.to_string())
    }
}
