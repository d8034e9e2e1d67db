//! 시그널 저장소 트레이트와 조회 조건.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use scanner_core::{Signal, Timeframe};

use crate::error::Result;

/// 조회 기본 개수.
pub const DEFAULT_QUERY_LIMIT: usize = 50;
/// 조회 최대 개수.
pub const MAX_QUERY_LIMIT: usize = 500;

/// 시그널 조회 조건. 결과는 항상 최신순입니다.
#[derive(Debug, Clone, Deserialize)]
pub struct SignalQuery {
    pub symbol: Option<String>,
    pub timeframe: Option<Timeframe>,
    /// 이 시각 이후(포함) 생성된 시그널만
    pub since: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

impl Default for SignalQuery {
    fn default() -> Self {
        Self {
            symbol: None,
            timeframe: None,
            since: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl SignalQuery {
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Self::default()
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// 1 이상 [`MAX_QUERY_LIMIT`] 이하로 보정한 개수.
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_QUERY_LIMIT)
    }

    /// 심볼 필터 (대문자 정규화).
    pub fn normalized_symbol(&self) -> Option<String> {
        self.symbol
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
    }

    /// 메모리 필터링용 조건 검사.
    pub fn matches(&self, signal: &Signal) -> bool {
        if let Some(symbol) = self.normalized_symbol() {
            if signal.symbol != symbol {
                return false;
            }
        }
        if let Some(timeframe) = self.timeframe {
            if signal.timeframe != timeframe {
                return false;
            }
        }
        if let Some(since) = self.since {
            if signal.created_at < since {
                return false;
            }
        }
        true
    }
}

/// 시그널 영속화 계층.
///
/// `insert`는 id 기준으로 멱등이어야 합니다. 이미 저장된 id는 다시 쓰지 않고
/// `Ok(false)`를 반환합니다.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// 저장소 이름 (로그/헬스 체크용)
    fn name(&self) -> &str;

    /// 시그널을 저장합니다. 새로 저장되었으면 `true`.
    async fn insert(&self, signal: &Signal) -> Result<bool>;

    /// id로 시그널을 조회합니다.
    async fn get(&self, id: Uuid) -> Result<Option<Signal>>;

    /// 조건에 맞는 시그널을 최신순으로 조회합니다.
    async fn query(&self, query: &SignalQuery) -> Result<Vec<Signal>>;

    /// 저장소 상태 확인.
    async fn health_check(&self) -> Result<()>;
}
