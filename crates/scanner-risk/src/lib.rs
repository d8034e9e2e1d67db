//! 변동성 기반 리스크 계산.
//!
//! ATR%에 비례하는 손절 거리, ATR%가 클수록 커지는 R:R, ATR%가 클수록
//! 작아지는 레버리지를 계산합니다. 모든 계산은 순수 함수입니다.
//!
//! # 예제
//!
//! ```rust,ignore
//! use scanner_risk::{RiskCalculator, RiskConfig};
//!
//! let calculator = RiskCalculator::new(RiskConfig::default())?;
//! let levels = calculator.compute_risk(dec!(100), 2.0, Direction::Long)?;
//! assert!(levels.stop_loss < dec!(100));
//! ```

pub mod calculator;
pub mod error;

pub use calculator::{RiskCalculator, RiskLevels};
pub use error::{RiskError, RiskResult};
pub use scanner_core::RiskConfig;
