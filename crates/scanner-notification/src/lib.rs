//! # Scanner Notification
//!
//! 확정된 시그널의 발행 경로.
//!
//! - [`Deduplicator`]: (심볼, 타임프레임, 패턴, 방향, 진입가 버킷) 쿨다운
//! - [`Broadcaster`]: 저장 후 구독자 팬아웃, 저장 실패 시 재시도와 degraded 플래그
//! - [`TelegramSender`]: 텔레그램 알림 (설정된 경우에만)

pub mod broadcaster;
pub mod dedup;
pub mod telegram;
pub mod types;

pub use broadcaster::{BroadcastStats, Broadcaster, PublishOutcome};
pub use dedup::{DedupKey, Deduplicator};
pub use telegram::TelegramSender;
pub use types::*;
