//! 리스크 계산기의 순수성/단조성 속성 테스트.

use proptest::prelude::*;
use rust_decimal::Decimal;

use scanner_core::Direction;
use scanner_risk::{RiskCalculator, RiskConfig};

fn calculator() -> RiskCalculator {
    RiskCalculator::new(RiskConfig::default()).unwrap()
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Long), Just(Direction::Short)]
}

proptest! {
    #[test]
    fn identical_inputs_yield_identical_outputs(
        entry in 1u64..10_000_000,
        atr in 0.01f64..12.0,
        direction in direction(),
    ) {
        let calc = calculator();
        let entry = Decimal::new(entry as i64, 4);
        let first = calc.compute_risk(entry, atr, direction).unwrap();
        let second = calc.compute_risk(entry, atr, direction).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn leverage_falls_and_rr_rises_with_volatility(
        a in 0.01f64..12.0,
        b in 0.01f64..12.0,
        direction in direction(),
    ) {
        let calc = calculator();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let calm = calc.compute_risk(Decimal::from(250), low, direction).unwrap();
        let wild = calc.compute_risk(Decimal::from(250), high, direction).unwrap();

        prop_assert!(wild.leverage <= calm.leverage);
        prop_assert!(wild.risk_reward_ratio >= calm.risk_reward_ratio);

        for levels in [&calm, &wild] {
            prop_assert!((2..=12).contains(&levels.leverage));
            prop_assert!(levels.risk_reward_ratio >= 1.8 && levels.risk_reward_ratio <= 2.7);
        }
    }

    #[test]
    fn stops_and_targets_sit_on_the_correct_side(
        entry in 1u64..1_000_000,
        atr in 0.05f64..12.0,
        direction in direction(),
    ) {
        let entry = Decimal::from(entry);
        let levels = calculator().compute_risk(entry, atr, direction).unwrap();

        prop_assert!(levels.take_profit_1 > Decimal::ZERO);
        prop_assert!(levels.take_profit_2 > Decimal::ZERO);
        match direction {
            Direction::Long => {
                prop_assert!(levels.stop_loss < entry);
                prop_assert!(levels.take_profit_1 > entry);
                prop_assert!(levels.take_profit_2 >= levels.take_profit_1);
            }
            Direction::Short => {
                prop_assert!(levels.stop_loss > entry);
                prop_assert!(levels.take_profit_1 < entry);
                prop_assert!(levels.take_profit_2 <= levels.take_profit_1);
            }
        }
    }
}
