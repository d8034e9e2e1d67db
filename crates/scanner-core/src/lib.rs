//! # Scanner Core
//!
//! 시그널 스캐너의 핵심 도메인 모델 및 공용 인프라를 제공합니다.
//!
//! 이 크레이트는 스캐너 전반에서 사용되는 기본 타입을 제공합니다:
//! - 캔들, 지표 스냅샷, 패턴 후보, 단계 레코드, 시그널
//! - 타임프레임 및 방향 정의
//! - 설정 관리
//! - 로깅 인프라
//! - 재시도(backoff) 유틸리티

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod retry;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use retry::{with_retry, RetryConfig};
pub use types::*;
