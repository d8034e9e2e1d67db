//! 시장 데이터 제공자 트레이트.

use async_trait::async_trait;

use scanner_core::{Candle, Timeframe};

use crate::ExchangeError;

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 마감된 캔들을 제공하는 시장 데이터 소스.
///
/// 구현체는 여러 스캔 워커에서 동시에 호출되므로 `Send + Sync`여야 합니다.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 제공자 이름 (로그용)
    fn name(&self) -> &str;

    /// 심볼/타임프레임의 최근 마감 캔들을 오래된 것부터 최대 `limit`개 반환합니다.
    ///
    /// 아직 마감되지 않은 캔들은 포함하지 않습니다.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> ExchangeResult<Vec<Candle>>;
}
