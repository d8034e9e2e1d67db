//! 인메모리 시그널 저장소.
//!
//! 데이터베이스 URL이 설정되지 않았을 때와 테스트에서 사용합니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use scanner_core::Signal;

use crate::error::{DataError, Result};
use crate::store::{SignalQuery, SignalStore};

/// 메모리 기반 [`SignalStore`].
#[derive(Debug, Default)]
pub struct MemorySignalStore {
    signals: RwLock<HashMap<Uuid, Signal>>,
    /// 남은 강제 실패 횟수
    failing_inserts: AtomicUsize,
    insert_attempts: AtomicUsize,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 다음 `count`번의 insert를 연결 오류로 실패시킵니다.
    pub fn fail_next_inserts(&self, count: usize) {
        self.failing_inserts.store(count, Ordering::SeqCst);
    }

    /// 지금까지 시도된 insert 횟수 (실패 포함).
    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.signals.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.signals.read().await.is_empty()
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, signal: &Signal) -> Result<bool> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(DataError::ConnectionError(
                "simulated store outage".to_string(),
            ));
        }

        let mut signals = self.signals.write().await;
        if signals.contains_key(&signal.id) {
            return Ok(false);
        }
        signals.insert(signal.id, signal.clone());
        Ok(true)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Signal>> {
        Ok(self.signals.read().await.get(&id).cloned())
    }

    async fn query(&self, query: &SignalQuery) -> Result<Vec<Signal>> {
        let signals = self.signals.read().await;
        let mut matched: Vec<Signal> = signals
            .values()
            .filter(|s| query.matches(s))
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        matched.truncate(query.effective_limit());
        Ok(matched)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
