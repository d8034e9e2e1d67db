//! 시그널 브로드캐스터.
//!
//! 워커들이 보낸 시그널을 하나의 비동기 뮤텍스 안에서 중복 검사 → 저장 → 팬아웃
//! 순서로 처리합니다. 저장에 성공한 시그널만 구독자와 알림 채널로 나가며,
//! 재시도까지 소진된 저장 실패는 degraded 플래그를 세웁니다.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use scanner_core::{with_retry, BroadcastConfig, RetryConfig, Signal};
use scanner_data::{DataError, SignalQuery, SignalStore};

use crate::dedup::Deduplicator;
use crate::types::NotificationManager;

/// 발행 시도 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// 저장 후 팬아웃됨
    Published,
    /// 쿨다운 중인 중복 시그널
    Duplicate,
    /// 같은 id가 이미 저장되어 있음
    AlreadyPersisted,
    /// 재시도 후에도 저장 실패, 팬아웃 없음
    PersistFailed,
}

/// 브로드캐스터 누적 통계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastStats {
    pub published: u64,
    pub duplicates: u64,
    pub persist_failures: u64,
}

#[derive(Default)]
struct Counters {
    published: AtomicU64,
    duplicates: AtomicU64,
    persist_failures: AtomicU64,
}

/// 중복 제거와 영속화 이후 팬아웃을 담당하는 발행기.
pub struct Broadcaster {
    /// 중복 제거 상태. 저장이 끝날 때까지 잠금을 유지합니다.
    dedup: Mutex<Deduplicator>,
    store: Arc<dyn SignalStore>,
    hub: broadcast::Sender<Signal>,
    notifier: NotificationManager,
    retry: RetryConfig,
    degraded: AtomicBool,
    counters: Counters,
}

impl Broadcaster {
    pub fn new(config: &BroadcastConfig, store: Arc<dyn SignalStore>) -> Self {
        let (hub, _) = broadcast::channel(config.hub_capacity.max(1));
        Self {
            dedup: Mutex::new(Deduplicator::new(
                config.dedup_window(),
                config.price_bucket_pct,
            )),
            store,
            hub,
            notifier: NotificationManager::new(),
            retry: config.persist_retry.clone(),
            degraded: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// 외부 알림 관리자를 설정합니다.
    pub fn with_notifier(mut self, notifier: NotificationManager) -> Self {
        self.notifier = notifier;
        self
    }

    /// 새로 발행되는 시그널 구독.
    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.hub.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.receiver_count()
    }

    pub fn store(&self) -> &Arc<dyn SignalStore> {
        &self.store
    }

    /// 저장 재시도가 소진된 적이 있고 이후 성공한 저장이 없는 상태.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            published: self.counters.published.load(Ordering::Relaxed),
            duplicates: self.counters.duplicates.load(Ordering::Relaxed),
            persist_failures: self.counters.persist_failures.load(Ordering::Relaxed),
        }
    }

    /// 시그널 하나를 발행합니다.
    pub async fn publish(&self, signal: Signal) -> PublishOutcome {
        let mut dedup = self.dedup.lock().await;
        let now = Utc::now();

        if dedup.is_duplicate(&signal, now) {
            self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
            debug!(
                id = %signal.id,
                key = %signal.key(),
                entry = %signal.entry_price,
                "쿨다운 중인 중복 시그널 무시"
            );
            return PublishOutcome::Duplicate;
        }

        let store = Arc::clone(&self.store);
        let persisted = with_retry(
            &self.retry,
            "persist_signal",
            DataError::is_retryable,
            || {
                let store = Arc::clone(&store);
                let signal = &signal;
                async move { store.insert(signal).await }
            },
        )
        .await;

        match persisted {
            Ok(true) => {
                dedup.record(&signal, now);
                drop(dedup);

                if self.degraded.swap(false, Ordering::SeqCst) {
                    info!(store = self.store.name(), "저장소 복구, degraded 해제");
                }
                self.counters.published.fetch_add(1, Ordering::Relaxed);

                // 구독자가 없으면 전송 에러가 나지만 무시
                let receivers = self.hub.send(signal.clone()).unwrap_or(0);
                info!(
                    id = %signal.id,
                    symbol = %signal.symbol,
                    timeframe = %signal.timeframe,
                    pattern = %signal.pattern_type,
                    direction = %signal.direction,
                    score = signal.entry_score,
                    receivers,
                    "시그널 발행"
                );

                if let Err(e) = self.notifier.notify(&signal).await {
                    warn!(id = %signal.id, error = %e, "외부 알림 실패");
                }
                PublishOutcome::Published
            }
            Ok(false) => {
                dedup.record(&signal, now);
                debug!(id = %signal.id, "이미 저장된 시그널, 재발행하지 않음");
                PublishOutcome::AlreadyPersisted
            }
            Err(e) => {
                self.counters.persist_failures.fetch_add(1, Ordering::Relaxed);
                self.degraded.store(true, Ordering::SeqCst);
                error!(
                    id = %signal.id,
                    symbol = %signal.symbol,
                    store = self.store.name(),
                    error = %e,
                    "시그널 저장 실패, degraded 상태로 전환"
                );
                PublishOutcome::PersistFailed
            }
        }
    }

    /// 최근 활성 시그널 (구독 시작 시 스냅샷용).
    pub async fn active_signals(
        &self,
        config: &BroadcastConfig,
    ) -> scanner_data::Result<Vec<Signal>> {
        let query = SignalQuery::default()
            .since(Utc::now() - config.active_window())
            .with_limit(config.snapshot_limit);
        self.store.query(&query).await
    }

    /// 채널에서 시그널을 받아 발행합니다.
    ///
    /// 취소되면 이미 큐에 들어온 시그널까지 처리한 뒤 종료합니다.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<Signal>, cancel: CancellationToken) {
        info!("브로드캐스터 시작");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                message = rx.recv() => match message {
                    Some(signal) => {
                        self.publish(signal).await;
                    }
                    None => break,
                },
            }
        }

        rx.close();
        while let Some(signal) = rx.recv().await {
            self.publish(signal).await;
        }

        let stats = self.stats();
        info!(
            published = stats.published,
            duplicates = stats.duplicates,
            persist_failures = stats.persist_failures,
            "브로드캐스터 종료"
        );
    }
}
