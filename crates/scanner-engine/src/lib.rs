//! 스캔 엔진.
//!
//! (심볼, 타임프레임) 쌍마다 독립적인 워커가 자기 주기에 맞춰 캔들을 조회하고
//! 지표 → 패턴 → 단계 → 점수 → 리스크 파이프라인을 실행합니다. 확정된 시그널은
//! 채널을 통해 브로드캐스터로 전달됩니다.

pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod worker;

pub use error::{EngineError, EngineResult};
pub use pipeline::{ScanPipeline, ScanReport};
pub use scheduler::ScanScheduler;
pub use worker::ScanWorker;
