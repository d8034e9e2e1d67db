//! 이중 바닥 / 이중 천장.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use scanner_core::{apply_pct, Candle, Direction, SupportingLevels};

use super::DetectionWindow;

/// 두 번째 극점이 막 형성된 상태
const FRESH_CONFIDENCE: f64 = 0.6;
/// 넥라인 돌파 전
const FORMED_CONFIDENCE: f64 = 0.7;
/// 넥라인 돌파
const BROKEN_CONFIDENCE: f64 = 0.85;
/// 무효화 레벨 여유 (%)
const INVALIDATION_BUFFER_PCT: f64 = 2.0;

pub(super) fn evaluate(
    direction: Direction,
    window: &DetectionWindow<'_>,
) -> Option<(f64, SupportingLevels)> {
    let config = window.patterns;
    let span = config.pivot_span.max(1);
    let lookback = config.double_lookback;
    if window.candles.len() < lookback || lookback < span * 2 + 2 {
        return None;
    }

    let recent = &window.candles[window.candles.len() - lookback..];
    // 롱은 저가 기준, 숏은 고가를 부호 반전해 같은 로직으로 처리
    let values: Vec<Decimal> = match direction {
        Direction::Long => recent.iter().map(|c| c.low).collect(),
        Direction::Short => recent.iter().map(|c| -c.high).collect(),
    };

    let pivots = pivot_lows(&values, span);
    let (&first, &second) = match pivots.as_slice() {
        [.., a, b] => (a, b),
        _ => return None,
    };

    let (extreme_a, extreme_b) = (values[first].abs(), values[second].abs());
    let reference = extreme_a.min(extreme_b);
    if reference <= Decimal::ZERO {
        return None;
    }
    let gap_pct = ((extreme_a - extreme_b).abs() / reference * Decimal::from(100)).to_f64()?;
    if gap_pct > config.double_tolerance_pct {
        return None;
    }

    let neckline = neckline(direction, &recent[first..=second])?;
    let (worst, depth_pct) = match direction {
        Direction::Long => {
            let higher = extreme_a.max(extreme_b);
            (reference, (neckline - higher) / higher)
        }
        Direction::Short => {
            let lower = extreme_a.min(extreme_b);
            (extreme_a.max(extreme_b), (lower - neckline) / lower)
        }
    };
    if (depth_pct * Decimal::from(100)).to_f64()? < config.double_min_depth_pct {
        return None;
    }

    let close = window.snapshot.close;
    let broken = match direction {
        Direction::Long => close > neckline,
        Direction::Short => close < neckline,
    };
    let bars_since = recent.len() - 1 - second;
    let confidence = if broken {
        BROKEN_CONFIDENCE
    } else if bars_since < span {
        FRESH_CONFIDENCE
    } else {
        FORMED_CONFIDENCE
    };

    let invalidation = match direction {
        Direction::Long => apply_pct(worst, -INVALIDATION_BUFFER_PCT),
        Direction::Short => apply_pct(worst, INVALIDATION_BUFFER_PCT),
    };

    Some((confidence, SupportingLevels::new(neckline, invalidation)))
}

/// `span` 좌우 구간의 최저점인 인덱스. 같은 값이 이어지면 첫 캔들만 피벗입니다.
/// 마지막 캔들 근처는 오른쪽 구간이 짧아도 피벗으로 인정합니다.
fn pivot_lows(values: &[Decimal], span: usize) -> Vec<usize> {
    (span..values.len())
        .filter(|&i| {
            let end = (i + span + 1).min(values.len());
            let current = values[i];
            current < values[i - 1] && values[i - span..end].iter().all(|&v| current <= v)
        })
        .collect()
}

/// 두 극점 사이의 반대 극값 (롱: 최고가, 숏: 최저가).
fn neckline(direction: Direction, between: &[Candle]) -> Option<Decimal> {
    match direction {
        Direction::Long => between.iter().map(|c| c.high).max(),
        Direction::Short => between.iter().map(|c| c.low).min(),
    }
}
