//! 지지/저항 레벨 기반 규칙: 돌파/이탈과 반등/거부.

use rust_decimal::Decimal;

use scanner_core::{apply_pct, Direction, SupportingLevels};

use super::DetectionWindow;

/// 레벨 반대편 무효화 여유 (%)
const INVALIDATION_BUFFER_PCT: f64 = 2.0;
/// 반등/거부로 인정하는 종가 되돌림 (%)
const REACTION_PCT: f64 = 0.2;

/// 저항선 상향 돌파 / 지지선 하향 이탈.
pub(super) fn evaluate_break(
    direction: Direction,
    window: &DetectionWindow<'_>,
) -> Option<(f64, SupportingLevels)> {
    let snapshot = window.snapshot;
    let volume = snapshot.volume_ratio?;
    let close = snapshot.close;
    let margin = window.patterns.breakout_margin_pct;
    let volume_confirmed = volume > window.patterns.breakout_volume;

    let (level, broken, extended, entry, invalidation) = match direction {
        Direction::Long => {
            let resistance = snapshot.resistance?;
            (
                resistance,
                close > apply_pct(resistance, margin),
                close > apply_pct(resistance, margin * 2.0),
                apply_pct(resistance, margin),
                apply_pct(resistance, -INVALIDATION_BUFFER_PCT),
            )
        }
        Direction::Short => {
            let support = snapshot.support?;
            (
                support,
                close < apply_pct(support, -margin),
                close < apply_pct(support, -margin * 2.0),
                apply_pct(support, -margin),
                apply_pct(support, INVALIDATION_BUFFER_PCT),
            )
        }
    };

    if level <= Decimal::ZERO || !broken {
        return None;
    }

    let confidence = match (volume_confirmed, extended) {
        (false, _) => 0.5,
        (true, true) => 0.85,
        (true, false) => 0.7,
    };

    Some((confidence, SupportingLevels::new(entry, invalidation)))
}

/// 지지선 반등 / 저항선 거부.
pub(super) fn evaluate_reaction(
    direction: Direction,
    window: &DetectionWindow<'_>,
) -> Option<(f64, SupportingLevels)> {
    let snapshot = window.snapshot;
    let last = window.last()?;
    let close = snapshot.close;
    let touch = window.patterns.level_touch_pct;
    let volume_increase = snapshot.volume_confirmed(window.indicators.volume_confirmation);

    // 레벨에서 멀어진 정도: 0 = 레벨 근처, 1 = 중간, 2 = 충분히 이탈
    let (progress, entry, invalidation) = match direction {
        Direction::Long => {
            let support = snapshot.support?;
            let touched = last.low <= apply_pct(support, touch);
            let bounced = close > apply_pct(last.low, REACTION_PCT);
            if support <= Decimal::ZERO || !touched || !bounced || close < support {
                return None;
            }

            let progress = if close < apply_pct(support, 1.0) {
                0
            } else if close > apply_pct(support, 2.0) {
                2
            } else {
                1
            };
            (
                progress,
                apply_pct(support, touch),
                apply_pct(support, -INVALIDATION_BUFFER_PCT),
            )
        }
        Direction::Short => {
            let resistance = snapshot.resistance?;
            let touched = last.high >= apply_pct(resistance, -touch);
            let rejected = close < apply_pct(last.high, -REACTION_PCT);
            if resistance <= Decimal::ZERO || !touched || !rejected || close > resistance {
                return None;
            }

            let progress = if close > apply_pct(resistance, -1.0) {
                0
            } else if close < apply_pct(resistance, -2.0) {
                2
            } else {
                1
            };
            (
                progress,
                apply_pct(resistance, -touch),
                apply_pct(resistance, INVALIDATION_BUFFER_PCT),
            )
        }
    };

    let confidence = match (progress, volume_increase) {
        (0, false) => 0.45,
        (0, true) | (1, false) => 0.55,
        (1, true) => 0.65,
        (_, false) => 0.7,
        (_, true) => 0.8,
    };

    Some((confidence, SupportingLevels::new(entry, invalidation)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use rust_decimal_macros::dec;
    use scanner_core::{IndicatorConfig, IndicatorSnapshot, PatternConfig};

    fn levels_snapshot(close: Decimal, volume: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            volume_ratio: Some(volume),
            support: Some(dec!(100)),
            resistance: Some(dec!(110)),
            ..IndicatorSnapshot::unknown(close)
        }
    }

    #[test]
    fn test_breakout_confidence_tiers() {
        let candles = flat_series(&[dec!(100); 25]);
        let (indicators, patterns) = (IndicatorConfig::default(), PatternConfig::default());

        let quiet = levels_snapshot(dec!(111), 1.0);
        let (confidence, levels) =
            evaluate_break(Direction::Long, &window(&candles, &quiet, &indicators, &patterns))
                .unwrap();
        assert_eq!(confidence, 0.5);
        assert_eq!(levels.entry, dec!(110.55));
        assert_eq!(levels.invalidation, dec!(107.8));

        let loud = levels_snapshot(dec!(110.8), 2.0);
        let (confidence, _) =
            evaluate_break(Direction::Long, &window(&candles, &loud, &indicators, &patterns))
                .unwrap();
        assert_eq!(confidence, 0.7);

        let extended = levels_snapshot(dec!(112), 2.0);
        let (confidence, _) =
            evaluate_break(Direction::Long, &window(&candles, &extended, &indicators, &patterns))
                .unwrap();
        assert_eq!(confidence, 0.85);

        let inside = levels_snapshot(dec!(110.3), 2.0);
        assert!(
            evaluate_break(Direction::Long, &window(&candles, &inside, &indicators, &patterns))
                .is_none()
        );
    }

    #[test]
    fn test_breakdown_below_support() {
        let candles = flat_series(&[dec!(100); 25]);
        let (indicators, patterns) = (IndicatorConfig::default(), PatternConfig::default());
        let snap = levels_snapshot(dec!(98), 2.0);

        let (confidence, levels) =
            evaluate_break(Direction::Short, &window(&candles, &snap, &indicators, &patterns))
                .unwrap();
        assert_eq!(confidence, 0.85);
        assert_eq!(levels.invalidation, dec!(102));
    }

    #[test]
    fn test_support_bounce() {
        let mut candles = flat_series(&[dec!(100); 25]);
        let last = candles.len() - 1;
        candles[last].low = dec!(100.2);
        candles[last].close = dec!(101.5);
        let (indicators, patterns) = (IndicatorConfig::default(), PatternConfig::default());

        let snap = levels_snapshot(dec!(101.5), 1.5);
        let (confidence, levels) =
            evaluate_reaction(Direction::Long, &window(&candles, &snap, &indicators, &patterns))
                .unwrap();
        assert_eq!(confidence, 0.65);
        assert_eq!(levels.entry, dec!(100.5));
        assert_eq!(levels.invalidation, dec!(98));
    }

    #[test]
    fn test_no_bounce_without_touch() {
        let mut candles = flat_series(&[dec!(104); 25]);
        let last = candles.len() - 1;
        candles[last].low = dec!(103);
        let (indicators, patterns) = (IndicatorConfig::default(), PatternConfig::default());

        let snap = levels_snapshot(dec!(104), 1.5);
        assert!(
            evaluate_reaction(Direction::Long, &window(&candles, &snap, &indicators, &patterns))
                .is_none()
        );
    }

    #[test]
    fn test_resistance_rejection() {
        let mut candles = flat_series(&[dec!(108); 25]);
        let last = candles.len() - 1;
        candles[last].high = dec!(110.2);
        let (indicators, patterns) = (IndicatorConfig::default(), PatternConfig::default());

        let snap = levels_snapshot(dec!(107), 1.0);
        let (confidence, levels) = evaluate_reaction(
            Direction::Short,
            &window(&candles, &snap, &indicators, &patterns),
        )
        .unwrap();
        assert_eq!(confidence, 0.7);
        assert_eq!(levels.invalidation, dec!(112.2));
    }

    #[test]
    fn test_unknown_levels_do_not_fire() {
        let candles = flat_series(&[dec!(100); 25]);
        let (indicators, patterns) = (IndicatorConfig::default(), PatternConfig::default());
        let snap = IndicatorSnapshot {
            volume_ratio: Some(2.0),
            ..IndicatorSnapshot::unknown(dec!(120))
        };
        let w = window(&candles, &snap, &indicators, &patterns);
        assert!(evaluate_break(Direction::Long, &w).is_none());
        assert!(evaluate_reaction(Direction::Long, &w).is_none());
    }
}
