//! 시그널 중복 제거.
//!
//! 같은 (심볼, 타임프레임, 패턴, 방향)에서 진입가가 같은 가격 버킷에 속하는
//! 시그널은 쿨다운 기간 동안 한 번만 발행됩니다. 버킷은 로그 스케일이라
//! 가격대와 무관하게 폭이 `price_bucket_pct`%로 일정합니다.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use scanner_core::{Signal, TupleKey};

/// 중복 판정 키.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub tuple: TupleKey,
    /// 진입가 버킷 번호
    pub bucket: i64,
}

/// 진입가를 버킷 번호로 변환합니다.
pub fn price_bucket(price: Decimal, bucket_pct: f64) -> i64 {
    let value = price.to_f64().unwrap_or_default();
    if value <= 0.0 || bucket_pct <= 0.0 {
        return (value * 1e8).round() as i64;
    }
    (value.ln() / (1.0 + bucket_pct / 100.0).ln()).floor() as i64
}

/// 쿨다운 기반 중복 제거기.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    window: Duration,
    bucket_pct: f64,
    /// 키별 마지막 발행 시각
    seen: HashMap<DedupKey, DateTime<Utc>>,
}

impl Deduplicator {
    pub fn new(window: Duration, bucket_pct: f64) -> Self {
        Self {
            window,
            bucket_pct,
            seen: HashMap::new(),
        }
    }

    pub fn key_for(&self, signal: &Signal) -> DedupKey {
        DedupKey {
            tuple: signal.key(),
            bucket: price_bucket(signal.entry_price, self.bucket_pct),
        }
    }

    /// `now` 기준 쿨다운 안에 같은 키가 이미 발행되었는지 확인합니다.
    pub fn is_duplicate(&self, signal: &Signal, now: DateTime<Utc>) -> bool {
        self.seen
            .get(&self.key_for(signal))
            .is_some_and(|last| now - *last < self.window)
    }

    /// 발행을 기록하고 만료된 항목을 정리합니다.
    pub fn record(&mut self, signal: &Signal, now: DateTime<Utc>) {
        self.prune(now);
        self.seen.insert(self.key_for(signal), now);
    }

    /// 쿨다운이 지난 항목 제거.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let window = self.window;
        self.seen.retain(|_, last| now - *last < window);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
