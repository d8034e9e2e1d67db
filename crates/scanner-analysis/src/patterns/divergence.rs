//! RSI 다이버전스.
//!
//! 강세: RSI가 과매도 쪽으로 하락하는 동안 가격은 더 높은 저점을 유지.
//! 약세: RSI가 과매수 쪽으로 상승하는 동안 가격은 더 낮은 고점을 형성.

use rust_decimal::Decimal;

use scanner_core::{Direction, SupportingLevels};

use super::DetectionWindow;

/// 감시 구간 깊이 가중치
const DEPTH_WEIGHT: f64 = 0.6;
/// 거래량 가중치
const VOLUME_WEIGHT: f64 = 0.2;
/// 극단 구간 도달 가중치
const EXTREME_WEIGHT: f64 = 0.2;

pub(super) fn evaluate(
    direction: Direction,
    window: &DetectionWindow<'_>,
) -> Option<(f64, SupportingLevels)> {
    let rsi = window.snapshot.rsi?;
    let rsi_prior = window.snapshot.rsi_prior?;
    let swing = window.indicators.swing_bars.max(1);
    let candles = window.candles;
    if candles.len() < swing * 2 {
        return None;
    }

    let recent = &candles[candles.len() - swing..];
    let earlier = &candles[candles.len() - swing * 2..candles.len() - swing];
    let band = window.patterns.divergence_watch_band;

    let (depth, extreme, invalidation) = match direction {
        Direction::Long => {
            let oversold = window.indicators.rsi_oversold;
            let watch = oversold + band;
            if rsi > watch || rsi >= rsi_prior {
                return None;
            }

            let recent_low: Decimal = recent.iter().map(|c| c.low).min()?;
            let earlier_low: Decimal = earlier.iter().map(|c| c.low).min()?;
            if recent_low <= earlier_low {
                return None;
            }

            (
                normalized(watch - rsi, watch - oversold),
                rsi <= oversold,
                recent_low,
            )
        }
        Direction::Short => {
            let overbought = window.indicators.rsi_overbought;
            let watch = overbought - band;
            if rsi < watch || rsi <= rsi_prior {
                return None;
            }

            let recent_high: Decimal = recent.iter().map(|c| c.high).max()?;
            let earlier_high: Decimal = earlier.iter().map(|c| c.high).max()?;
            if recent_high >= earlier_high {
                return None;
            }

            (
                normalized(rsi - watch, overbought - watch),
                rsi >= overbought,
                recent_high,
            )
        }
    };

    let confidence = DEPTH_WEIGHT * depth
        + VOLUME_WEIGHT * window.volume_component()
        + if extreme { EXTREME_WEIGHT } else { 0.0 };

    Some((
        confidence,
        SupportingLevels::new(window.snapshot.close, invalidation),
    ))
}

fn normalized(value: f64, span: f64) -> f64 {
    if span <= 0.0 {
        return 1.0;
    }
    (value / span).clamp(0.0, 1.0)
}
