//! 지표 스냅샷.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::TrendDirection;

/// 캔들 윈도우에서 계산된 읽기 전용 지표 묶음.
///
/// 매 스캔마다 다시 계산되며 독립적으로 저장되지 않습니다.
/// 데이터가 부족해 계산할 수 없는 값은 `None`이며, 0 같은 기본값으로
/// 대체하지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// 마지막 캔들 종가
    pub close: Decimal,
    /// RSI (0~100)
    pub rsi: Option<f64>,
    /// 스윙 구간 이전 시점의 RSI (다이버전스 판단용)
    pub rsi_prior: Option<f64>,
    /// ATR (가격 단위)
    pub atr: Option<Decimal>,
    /// 종가 대비 ATR 비율 (%)
    pub atr_percent: Option<f64>,
    /// 거래량 / 거래량 이동평균
    pub volume_ratio: Option<f64>,
    /// 추세 방향
    pub trend: Option<TrendDirection>,
    /// 직전 구간 최저가 (마지막 캔들 제외)
    pub support: Option<Decimal>,
    /// 직전 구간 최고가 (마지막 캔들 제외)
    pub resistance: Option<Decimal>,
}

impl IndicatorSnapshot {
    /// 모든 지표가 미지(unknown)인 스냅샷.
    pub fn unknown(close: Decimal) -> Self {
        Self {
            close,
            rsi: None,
            rsi_prior: None,
            atr: None,
            atr_percent: None,
            volume_ratio: None,
            trend: None,
            support: None,
            resistance: None,
        }
    }

    /// 거래량 비율이 임계값을 초과하는지 확인합니다. 미지이면 false.
    pub fn volume_confirmed(&self, threshold: f64) -> bool {
        self.volume_ratio.is_some_and(|ratio| ratio > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unknown_volume_is_not_confirmation() {
        let mut snapshot = IndicatorSnapshot::unknown(dec!(1));
        assert!(!snapshot.volume_confirmed(1.2));

        snapshot.volume_ratio = Some(1.2);
        assert!(!snapshot.volume_confirmed(1.2));

        snapshot.volume_ratio = Some(1.25);
        assert!(snapshot.volume_confirmed(1.2));
    }
}
