//! 애플리케이션 공유 상태.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use scanner_core::AppConfig;
use scanner_data::{MemorySignalStore, SignalStore};
use scanner_notification::Broadcaster;

/// 모든 핸들러가 공유하는 상태.
pub struct AppState {
    /// 실행 중인 설정 (읽기 전용)
    pub config: Arc<AppConfig>,
    /// 시그널 저장소
    pub store: Arc<dyn SignalStore>,
    /// 발행/구독 허브
    pub broadcaster: Arc<Broadcaster>,
    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn SignalStore>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            config,
            store,
            broadcaster,
            started_at: Utc::now(),
        }
    }

    /// 메모리 저장소로 구성된 상태.
    ///
    /// 데이터베이스 없이 실행할 때와 테스트에서 사용합니다.
    pub fn in_memory(config: AppConfig) -> Self {
        let store: Arc<dyn SignalStore> = Arc::new(MemorySignalStore::new());
        let broadcaster = Arc::new(Broadcaster::new(&config.broadcast, store.clone()));
        Self::new(Arc::new(config), store, broadcaster)
    }

    /// 서버 가동 시간 (초).
    pub fn uptime_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

/// 테스트용 상태 (기본 설정, 메모리 저장소).
pub fn create_test_state() -> Arc<AppState> {
    Arc::new(AppState::in_memory(AppConfig::default()))
}
