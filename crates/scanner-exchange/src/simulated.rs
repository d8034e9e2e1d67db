//! 시뮬레이션 시장 데이터 제공자.
//!
//! 테스트와 `serve --simulated` 모드에서 사용합니다. 심볼/타임프레임별로
//! 스크립트된 캔들 프레임을 순서대로 돌려주거나, 등록되지 않은 시리즈는
//! 랜덤 워크로 생성해 매 조회마다 새로 마감된 봉을 이어 붙입니다.

use std::collections::{HashMap, VecDeque};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use scanner_core::{Candle, Timeframe};

use crate::{ExchangeError, ExchangeResult, MarketDataProvider};

/// 랜덤 워크 생성 파라미터.
#[derive(Debug, Clone, Copy)]
pub struct RandomWalk {
    pub start_price: Decimal,
    /// 봉당 최대 변동률 (0.01 = 1%)
    pub volatility: f64,
    /// 최초 생성 시 봉 개수
    pub history: usize,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self {
            start_price: dec!(100),
            volatility: 0.01,
            history: 300,
        }
    }
}

#[derive(Debug, Default)]
struct Feed {
    /// 아직 소비되지 않은 스크립트 프레임
    frames: VecDeque<Vec<Candle>>,
    /// 마지막으로 노출된 캔들 시리즈
    current: Vec<Candle>,
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Times(usize),
    Always,
}

/// 인메모리 시장 데이터 제공자.
#[derive(Debug, Default)]
pub struct SimulatedProvider {
    feeds: RwLock<HashMap<(String, Timeframe), Feed>>,
    failures: RwLock<HashMap<String, Failure>>,
    calls: Mutex<Vec<(String, Timeframe)>>,
    random_walk: Option<RandomWalk>,
    latency: Option<StdDuration>,
}

impl SimulatedProvider {
    /// 스크립트된 시리즈만 제공하는 빈 제공자.
    pub fn new() -> Self {
        Self::default()
    }

    /// 등록되지 않은 시리즈를 랜덤 워크로 생성합니다.
    pub fn with_random_walk(mut self, walk: RandomWalk) -> Self {
        self.random_walk = Some(walk);
        self
    }

    /// 모든 조회에 인위적 지연을 추가합니다.
    pub fn with_latency(mut self, latency: StdDuration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// 고정 시리즈를 설정합니다. 남아있던 스크립트 프레임은 버립니다.
    pub async fn set_series(&self, symbol: &str, timeframe: Timeframe, candles: Vec<Candle>) {
        let mut feeds = self.feeds.write().await;
        feeds.insert(
            (symbol.to_string(), timeframe),
            Feed {
                frames: VecDeque::new(),
                current: candles,
            },
        );
    }

    /// 조회할 때마다 하나씩 노출될 프레임을 추가합니다.
    ///
    /// 프레임이 모두 소비되면 마지막 프레임이 계속 반환됩니다.
    pub async fn push_frames(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        frames: impl IntoIterator<Item = Vec<Candle>>,
    ) {
        let mut feeds = self.feeds.write().await;
        let feed = feeds.entry((symbol.to_string(), timeframe)).or_default();
        feed.frames.extend(frames);
    }

    /// 심볼 조회를 `times`번 실패시킵니다.
    pub async fn fail_times(&self, symbol: &str, times: usize) {
        self.failures
            .write()
            .await
            .insert(symbol.to_string(), Failure::Times(times));
    }

    /// 심볼 조회를 해제될 때까지 항상 실패시킵니다.
    pub async fn fail_always(&self, symbol: &str) {
        self.failures
            .write()
            .await
            .insert(symbol.to_string(), Failure::Always);
    }

    pub async fn clear_failure(&self, symbol: &str) {
        self.failures.write().await.remove(symbol);
    }

    /// 지금까지의 조회 기록 (호출 순서).
    pub async fn calls(&self) -> Vec<(String, Timeframe)> {
        self.calls.lock().await.clone()
    }

    /// 특정 시리즈의 조회 횟수.
    pub async fn call_count(&self, symbol: &str, timeframe: Timeframe) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|(s, tf)| s == symbol && *tf == timeframe)
            .count()
    }

    async fn check_failure(&self, symbol: &str) -> ExchangeResult<()> {
        let mut failures = self.failures.write().await;
        match failures.get_mut(symbol) {
            Some(Failure::Always) => Err(ExchangeError::NetworkError(format!(
                "simulated failure for {}",
                symbol
            ))),
            Some(Failure::Times(remaining)) => {
                *remaining -= 1;
                if *remaining == 0 {
                    failures.remove(symbol);
                }
                Err(ExchangeError::NetworkError(format!(
                    "simulated failure for {}",
                    symbol
                )))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MarketDataProvider for SimulatedProvider {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> ExchangeResult<Vec<Candle>> {
        self.calls.lock().await.push((symbol.to_string(), timeframe));

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.check_failure(symbol).await?;

        let mut feeds = self.feeds.write().await;
        let key = (symbol.to_string(), timeframe);

        if !feeds.contains_key(&key) {
            let Some(walk) = self.random_walk else {
                return Err(ExchangeError::SymbolNotFound(symbol.to_string()));
            };
            let candles = generate_random_walk(
                timeframe,
                walk.history.max(limit),
                walk.start_price,
                walk.volatility,
                Utc::now(),
            );
            debug!(symbol, timeframe = %timeframe, count = candles.len(), "랜덤 워크 시리즈 생성");
            feeds.insert(
                key.clone(),
                Feed {
                    frames: VecDeque::new(),
                    current: candles,
                },
            );
        }

        let Some(feed) = feeds.get_mut(&key) else {
            return Err(ExchangeError::SymbolNotFound(symbol.to_string()));
        };

        if let Some(frame) = feed.frames.pop_front() {
            feed.current = frame;
        } else if let Some(walk) = self.random_walk {
            extend_random_walk(&mut feed.current, timeframe, walk.volatility, Utc::now());
        }

        let start = feed.current.len().saturating_sub(limit);
        Ok(feed.current[start..].to_vec())
    }
}

/// 마지막으로 마감된 봉의 시작 시각.
fn last_closed_open_time(timeframe: Timeframe, now: DateTime<Utc>) -> DateTime<Utc> {
    let step = timeframe.as_secs() as i64;
    let aligned = now.timestamp() - now.timestamp().rem_euclid(step) - step;
    Utc.timestamp_opt(aligned, 0).single().unwrap_or(now)
}

fn next_candle<R: Rng>(
    rng: &mut R,
    timestamp: DateTime<Utc>,
    price: Decimal,
    volatility: f64,
) -> Candle {
    let change_pct = (rng.gen::<f64>() - 0.5) * 2.0 * volatility;
    let change = price * Decimal::from_f64_retain(change_pct).unwrap_or_default();

    let open = price;
    let close = (price + change).max(dec!(0.00000001));

    let high_extra = price.abs()
        * Decimal::from_f64_retain(rng.gen::<f64>() * volatility / 2.0).unwrap_or_default();
    let low_extra = price.abs()
        * Decimal::from_f64_retain(rng.gen::<f64>() * volatility / 2.0).unwrap_or_default();

    let high = open.max(close) + high_extra;
    let low = (open.min(close) - low_extra).max(Decimal::ZERO);
    let volume = Decimal::from_f64_retain(rng.gen_range(10.0..1000.0)).unwrap_or(dec!(100));

    Candle::new(
        timestamp,
        open,
        high.round_dp(8),
        low.round_dp(8),
        close.round_dp(8),
        volume.round_dp(4),
    )
}

/// `end` 시점까지 마감된 `count`개의 랜덤 워크 캔들을 생성합니다.
pub fn generate_random_walk(
    timeframe: Timeframe,
    count: usize,
    start_price: Decimal,
    volatility: f64,
    end: DateTime<Utc>,
) -> Vec<Candle> {
    let mut rng = rand::thread_rng();
    let step = Duration::seconds(timeframe.as_secs() as i64);
    let last_open = last_closed_open_time(timeframe, end);

    let mut candles = Vec::with_capacity(count);
    let mut price = start_price;
    for i in (0..count).rev() {
        let candle = next_candle(&mut rng, last_open - step * i as i32, price, volatility);
        price = candle.close;
        candles.push(candle);
    }
    candles
}

/// `now`까지 새로 마감된 봉을 시리즈 끝에 추가합니다.
fn extend_random_walk(
    candles: &mut Vec<Candle>,
    timeframe: Timeframe,
    volatility: f64,
    now: DateTime<Utc>,
) {
    let Some(last) = candles.last() else {
        return;
    };
    let step = Duration::seconds(timeframe.as_secs() as i64);
    let last_open = last_closed_open_time(timeframe, now);

    let mut rng = rand::thread_rng();
    let mut timestamp = last.timestamp + step;
    let mut price = last.close;
    while timestamp <= last_open {
        let candle = next_candle(&mut rng, timestamp, price, volatility);
        price = candle.close;
        candles.push(candle);
        timestamp += step;
    }

    let excess = candles.len().saturating_sub(MAX_SIMULATED_HISTORY);
    if excess > 0 {
        candles.drain(..excess);
    }
}

const MAX_SIMULATED_HISTORY: usize = 2000;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::ToPrimitive;

    fn series(n: usize, base: i64) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let p = Decimal::from(base + i as i64);
                Candle::new(
                    start + Duration::hours(i as i64),
                    p,
                    p + Decimal::ONE,
                    p - Decimal::ONE,
                    p,
                    dec!(10),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_static_series_respects_limit() {
        let provider = SimulatedProvider::new();
        provider.set_series("BTCUSDT", Timeframe::H1, series(10, 100)).await;

        let candles = provider.fetch_candles("BTCUSDT", Timeframe::H1, 3).await.unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[2].close, dec!(109));
        assert_eq!(provider.call_count("BTCUSDT", Timeframe::H1).await, 1);
    }

    #[tokio::test]
    async fn test_frames_are_consumed_in_order() {
        let provider = SimulatedProvider::new();
        provider
            .push_frames("ETHUSDT", Timeframe::H1, vec![series(2, 1), series(2, 50)])
            .await;

        let first = provider.fetch_candles("ETHUSDT", Timeframe::H1, 10).await.unwrap();
        let second = provider.fetch_candles("ETHUSDT", Timeframe::H1, 10).await.unwrap();
        let third = provider.fetch_candles("ETHUSDT", Timeframe::H1, 10).await.unwrap();

        assert_eq!(first[0].close, dec!(1));
        assert_eq!(second[0].close, dec!(50));
        assert_eq!(third, second);
    }

    #[tokio::test]
    async fn test_unknown_series_without_random_walk() {
        let provider = SimulatedProvider::new();
        let err = provider.fetch_candles("XRPUSDT", Timeframe::M5, 10).await.unwrap_err();
        assert!(matches!(err, ExchangeError::SymbolNotFound(_)));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let provider = SimulatedProvider::new();
        provider.set_series("SOLUSDT", Timeframe::H1, series(5, 10)).await;
        provider.fail_times("SOLUSDT", 2).await;

        assert!(provider.fetch_candles("SOLUSDT", Timeframe::H1, 5).await.is_err());
        assert!(provider.fetch_candles("SOLUSDT", Timeframe::H1, 5).await.is_err());
        assert!(provider.fetch_candles("SOLUSDT", Timeframe::H1, 5).await.is_ok());

        provider.fail_always("SOLUSDT").await;
        let err = provider.fetch_candles("SOLUSDT", Timeframe::H1, 5).await.unwrap_err();
        assert!(err.is_retryable());
        provider.clear_failure("SOLUSDT").await;
        assert!(provider.fetch_candles("SOLUSDT", Timeframe::H1, 5).await.is_ok());
        assert_eq!(provider.calls().await.len(), 5);
    }

    #[tokio::test]
    async fn test_random_walk_series() {
        let provider = SimulatedProvider::new().with_random_walk(RandomWalk {
            history: 50,
            ..RandomWalk::default()
        });

        let candles = provider.fetch_candles("BNBUSDT", Timeframe::M15, 40).await.unwrap();
        assert_eq!(candles.len(), 40);
        for pair in candles.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::minutes(15));
        }
        for candle in &candles {
            assert!(candle.high >= candle.open.max(candle.close));
            assert!(candle.low <= candle.open.min(candle.close));
            assert!(candle.close > Decimal::ZERO);
        }
        let last_open = candles[candles.len() - 1].timestamp;
        assert!(last_open + Duration::minutes(15) <= Utc::now());
    }

    #[test]
    fn test_last_closed_open_time() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 7, 30).unwrap();
        assert_eq!(
            last_closed_open_time(Timeframe::M5, now),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(
            last_closed_open_time(Timeframe::H1, now),
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_generate_random_walk_is_continuous() {
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let candles = generate_random_walk(Timeframe::H1, 24, dec!(50), 0.02, end);
        assert_eq!(candles.len(), 24);
        for pair in candles.windows(2) {
            assert_eq!(pair[1].open, pair[0].close);
        }
        assert!(candles[0].open.to_f64().unwrap_or_default() > 0.0);
    }
}
