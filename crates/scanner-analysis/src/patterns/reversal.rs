//! 반전 캔들: 과매도 구간의 망치형, 과매수 구간의 유성형.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use scanner_core::{apply_pct, Direction, SupportingLevels};

use super::DetectionWindow;

const BASE_CONFIDENCE: f64 = 0.55;
/// RSI가 극단 구간에 있을 때 가산
const EXTREME_BONUS: f64 = 0.1;
/// 거래량 기여 최대 가산
const VOLUME_BONUS: f64 = 0.15;
/// 꼬리 끝 너머 무효화 여유 (%)
const INVALIDATION_BUFFER_PCT: f64 = 1.0;

pub(super) fn evaluate(
    direction: Direction,
    window: &DetectionWindow<'_>,
) -> Option<(f64, SupportingLevels)> {
    let rsi = window.snapshot.rsi?;
    let [.., previous, last] = window.candles else {
        return None;
    };

    let body = last.body();
    if body.is_zero() {
        return None;
    }
    let ratio = Decimal::try_from(window.patterns.reversal_wick_ratio).ok()?;
    let band = window.patterns.reversal_rsi_band;

    let (shape, prior_move, near_extreme, extreme, invalidation) = match direction {
        Direction::Long => (
            last.lower_wick() >= body * ratio && last.upper_wick() < body * dec!(0.5),
            previous.close < previous.open,
            rsi < window.indicators.rsi_oversold + band,
            rsi <= window.indicators.rsi_oversold,
            apply_pct(last.low, -INVALIDATION_BUFFER_PCT),
        ),
        Direction::Short => (
            last.upper_wick() >= body * ratio && last.lower_wick() < body * dec!(0.5),
            previous.close > previous.open,
            rsi > window.indicators.rsi_overbought - band,
            rsi >= window.indicators.rsi_overbought,
            apply_pct(last.high, INVALIDATION_BUFFER_PCT),
        ),
    };

    if !(shape && prior_move && near_extreme) {
        return None;
    }

    let confidence = BASE_CONFIDENCE
        + if extreme { EXTREME_BONUS } else { 0.0 }
        + VOLUME_BONUS * window.volume_component();

    Some((
        confidence,
        SupportingLevels::new(window.snapshot.close, invalidation),
    ))
}
