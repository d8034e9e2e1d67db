//! 가격 계산용 Decimal 유틸리티.

use rust_decimal::Decimal;

/// 정수 연산을 사용하여 가격에 백분율 조정을 적용합니다.
///
/// 백분율은 소수점 4자리까지 반영되며 `pct`는 -100 이상이어야 합니다.
///
/// ```
/// use rust_decimal_macros::dec;
/// use scanner_core::apply_pct;
///
/// assert_eq!(apply_pct(dec!(50000), -2.0), dec!(49000));
/// ```
pub fn apply_pct(price: Decimal, pct: f64) -> Decimal {
    let scaled_factor = ((100.0 + pct) * 10_000.0).round() as i64;
    price * Decimal::from(scaled_factor) / Decimal::from(1_000_000)
}
