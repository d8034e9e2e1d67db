//! 기술적 지표 계산 함수.
//!
//! 모든 함수는 순수 함수이며 OHLCV 캔들만 입력으로 받습니다.
//! 데이터가 부족하면 `None`을 반환하고 0 같은 대체값을 만들지 않습니다.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use scanner_core::{Candle, IndicatorConfig, IndicatorSnapshot, TrendDirection};

/// 기준 심볼 추세 판단 단기 SMA 기간
pub const REFERENCE_FAST_PERIOD: usize = 6;
/// 기준 심볼 추세 판단 장기 SMA 기간
pub const REFERENCE_SLOW_PERIOD: usize = 24;
/// 기준 심볼 추세 판단 밴드 (%)
pub const REFERENCE_BAND_PCT: f64 = 1.0;

/// RSI (Relative Strength Index) 계산.
///
/// Wilder 평활을 사용합니다.
///
/// # Arguments
/// * `prices` - 종가 데이터 (최신 데이터가 마지막)
/// * `period` - RSI 기간 (일반적으로 14)
///
/// # Returns
/// RSI 값 (0~100), 데이터 부족 시 None
pub fn calculate_rsi(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let periods = Decimal::from(period);
    let carry = Decimal::from(period - 1);
    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;

    for window in prices[..=period].windows(2) {
        let change = window[1] - window[0];
        if change > Decimal::ZERO {
            gains += change;
        } else {
            losses += change.abs();
        }
    }

    let mut avg_gain = gains / periods;
    let mut avg_loss = losses / periods;

    for window in prices[period..].windows(2) {
        let change = window[1] - window[0];
        let (gain, loss) = if change > Decimal::ZERO {
            (change, Decimal::ZERO)
        } else {
            (Decimal::ZERO, change.abs())
        };
        avg_gain = (avg_gain * carry + gain) / periods;
        avg_loss = (avg_loss * carry + loss) / periods;
    }

    if avg_loss.is_zero() {
        // 하락이 전혀 없으면 100, 변동이 전혀 없으면 중립
        return Some(if avg_gain.is_zero() { dec!(50) } else { dec!(100) });
    }

    let rs = avg_gain / avg_loss;
    Some(dec!(100) - (dec!(100) / (Decimal::ONE + rs)))
}

/// SMA (Simple Moving Average) 계산.
///
/// 데이터 부족 시 None
pub fn calculate_sma(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: Decimal = prices[prices.len() - period..].iter().sum();
    Some(sum / Decimal::from(period))
}

/// EMA (Exponential Moving Average) 계산.
///
/// 첫 `period`개의 SMA로 시작합니다. 데이터 부족 시 None
pub fn calculate_ema(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let multiplier = dec!(2) / Decimal::from(period + 1);
    let mut ema = calculate_sma(&prices[..period], period)?;

    for &price in &prices[period..] {
        ema = (price - ema) * multiplier + ema;
    }

    Some(ema)
}

/// 직전 종가 기준 True Range.
pub fn true_range(prev_close: Decimal, candle: &Candle) -> Decimal {
    let high_low = candle.high - candle.low;
    let high_close = (candle.high - prev_close).abs();
    let low_close = (candle.low - prev_close).abs();
    high_low.max(high_close).max(low_close)
}

/// ATR (Average True Range) 계산.
///
/// 최근 `period`개 True Range의 단순 평균입니다. `period + 1`개 캔들이 필요합니다.
pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<Decimal> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let recent = &candles[candles.len() - period - 1..];
    let sum: Decimal = recent
        .windows(2)
        .map(|pair| true_range(pair[0].close, &pair[1]))
        .sum();

    Some(sum / Decimal::from(period))
}

/// 마지막 캔들 거래량 / 최근 `period`개 거래량 평균.
pub fn volume_ratio(candles: &[Candle], period: usize) -> Option<f64> {
    let volumes: Vec<Decimal> = candles.iter().map(|c| c.volume).collect();
    let average = calculate_sma(&volumes, period)?;
    if average <= Decimal::ZERO {
        return None;
    }

    let last = volumes.last()?;
    (*last / average).to_f64()
}

/// 단기/장기 SMA와 종가로 추세를 분류합니다.
///
/// 단기 SMA가 장기 SMA보다 밴드 이상 높고 종가가 단기 SMA 위에 있으면 상승,
/// 반대면 하락, 그 외에는 횡보입니다.
pub fn trend_direction(
    closes: &[Decimal],
    fast_period: usize,
    slow_period: usize,
    band_pct: f64,
) -> Option<TrendDirection> {
    let close = *closes.last()?;
    let fast = calculate_sma(closes, fast_period)?;
    let slow = calculate_sma(closes, slow_period)?;
    let band = Decimal::try_from(band_pct / 100.0).ok()?;

    let trend = if fast > slow * (Decimal::ONE + band) && close > fast {
        TrendDirection::Up
    } else if fast < slow * (Decimal::ONE - band) && close < fast {
        TrendDirection::Down
    } else {
        TrendDirection::Sideways
    };

    Some(trend)
}

/// 기준 심볼(BTC)의 시장 추세.
///
/// SMA6과 SMA24를 ±1% 밴드로 비교합니다.
pub fn reference_trend(candles: &[Candle]) -> Option<TrendDirection> {
    let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
    let fast = calculate_sma(&closes, REFERENCE_FAST_PERIOD)?;
    let slow = calculate_sma(&closes, REFERENCE_SLOW_PERIOD)?;
    let band = Decimal::try_from(REFERENCE_BAND_PCT / 100.0).ok()?;

    let trend = if fast > slow * (Decimal::ONE + band) {
        TrendDirection::Up
    } else if fast < slow * (Decimal::ONE - band) {
        TrendDirection::Down
    } else {
        TrendDirection::Sideways
    };

    Some(trend)
}

/// 마지막 캔들을 제외한 직전 `lookback`개 캔들의 (최저가, 최고가).
pub fn support_resistance(candles: &[Candle], lookback: usize) -> Option<(Decimal, Decimal)> {
    if lookback == 0 || candles.len() < lookback + 1 {
        return None;
    }

    let end = candles.len() - 1;
    let window = &candles[end - lookback..end];
    let support = window.iter().map(|c| c.low).min()?;
    let resistance = window.iter().map(|c| c.high).max()?;

    Some((support, resistance))
}

/// 캔들 윈도우로부터 지표 스냅샷을 계산합니다.
///
/// 캔들이 비어 있으면 종가 0의 미지 스냅샷을 반환합니다.
pub fn compute_indicators(candles: &[Candle], config: &IndicatorConfig) -> IndicatorSnapshot {
    let Some(last) = candles.last() else {
        return IndicatorSnapshot::unknown(Decimal::ZERO);
    };

    let close = last.close;
    let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();

    let rsi = calculate_rsi(&closes, config.rsi_period).and_then(|v| v.to_f64());
    let rsi_prior = closes
        .len()
        .checked_sub(config.swing_bars)
        .filter(|_| config.swing_bars > 0)
        .and_then(|end| calculate_rsi(&closes[..end], config.rsi_period))
        .and_then(|v| v.to_f64());

    let atr = calculate_atr(candles, config.atr_period);
    let atr_percent = atr
        .filter(|_| close > Decimal::ZERO)
        .and_then(|atr| (atr / close * dec!(100)).to_f64());

    let (support, resistance) = match support_resistance(candles, config.level_lookback) {
        Some((support, resistance)) => (Some(support), Some(resistance)),
        None => (None, None),
    };

    IndicatorSnapshot {
        close,
        rsi,
        rsi_prior,
        atr,
        atr_percent,
        volume_ratio: volume_ratio(candles, config.volume_period),
        trend: trend_direction(
            &closes,
            config.trend_fast_period,
            config.trend_slow_period,
            config.trend_band_pct,
        ),
        support,
        resistance,
    }
}
