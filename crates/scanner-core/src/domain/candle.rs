//! OHLCV 캔들.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 마감된 OHLCV 캔들.
///
/// 심볼/타임프레임별로 시간순 정렬되어 제공되며 마감 이후에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시작 시각
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 실체(몸통) 크기.
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// 윗꼬리 길이.
    pub fn upper_wick(&self) -> Decimal {
        self.high - self.open.max(self.close)
    }

    /// 아랫꼬리 길이.
    pub fn lower_wick(&self) -> Decimal {
        self.open.min(self.close) - self.low
    }

    /// 고가-저가 범위.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_candle_geometry() {
        let candle = Candle::new(
            Utc::now(),
            dec!(100),
            dec!(104),
            dec!(90),
            dec!(102),
            dec!(10),
        );

        assert_eq!(candle.body(), dec!(2));
        assert_eq!(candle.upper_wick(), dec!(2));
        assert_eq!(candle.lower_wick(), dec!(10));
        assert_eq!(candle.range(), dec!(14));
    }
}
