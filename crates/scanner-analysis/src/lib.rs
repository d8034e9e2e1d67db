//! 시그널 분석 파이프라인의 순수 계산 단계.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 기술적 지표 계산 (RSI, ATR, SMA/EMA, 거래량 비율, 추세)
//! - 패턴 규칙 카탈로그와 패턴 감지기
//! - 패턴 확인 단계 추적기
//! - 진입 점수 계산기
//!
//! 모든 계산은 I/O 없이 입력만으로 결정됩니다. 단계 추적기만 상태를 가지며,
//! 스캔 워커 하나가 추적기 하나를 독점 소유합니다.

pub mod indicators;
pub mod patterns;
pub mod scorer;
pub mod stage_tracker;

pub use indicators::{
    calculate_atr, calculate_ema, calculate_rsi, calculate_sma, compute_indicators,
    reference_trend, support_resistance, trend_direction, volume_ratio,
};
pub use patterns::{DetectionWindow, PatternDetector, PatternRule};
pub use scorer::{EntryScore, EntryScorer};
pub use stage_tracker::{ExpiryReason, StageEvent, StageTracker};
