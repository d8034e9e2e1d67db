//! Binance 공개 REST 커넥터.
//!
//! 인증이 필요 없는 `/api/v3/klines`만 사용합니다. 응답의 마지막 캔들이 아직
//! 마감되지 않았다면 (close time이 현재 시각 이후) 결과에서 제외합니다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, error, warn};

use scanner_core::{Candle, MarketConfig, Timeframe};

use crate::{ExchangeError, ExchangeResult, MarketDataProvider};

/// Binance 공개 API 기본 URL.
pub const BINANCE_REST_URL: &str = "https://api.binance.com";

/// 요청당 최대 캔들 수.
pub const MAX_KLINES_PER_REQUEST: usize = 1000;

/// Binance 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub rest_base_url: String,
    pub timeout_secs: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            rest_base_url: BINANCE_REST_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl BinanceConfig {
    /// 기본 URL 변경 (테스트 서버 등).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.rest_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl From<&MarketConfig> for BinanceConfig {
    fn from(market: &MarketConfig) -> Self {
        Self::default()
            .with_base_url(market.rest_base_url.clone())
            .with_timeout(market.request_timeout_secs)
    }
}

// ==================== Binance API 응답 타입 ====================

#[derive(Debug, Deserialize)]
struct BinanceError {
    code: i32,
    msg: String,
}

/// Binance kline 응답 (배열 형식).
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct BinanceKline(
    i64,    // 0: Open time
    String, // 1: Open
    String, // 2: High
    String, // 3: Low
    String, // 4: Close
    String, // 5: Volume
    i64,    // 6: Close time
    String, // 7: Quote asset volume
    i64,    // 8: Number of trades
    String, // 9: Taker buy base asset volume
    String, // 10: Taker buy quote asset volume
    String, // 11: Ignore
);

impl BinanceKline {
    fn close_time(&self) -> i64 {
        self.6
    }

    fn into_candle(self) -> ExchangeResult<Candle> {
        let timestamp = DateTime::from_timestamp_millis(self.0).ok_or_else(|| {
            ExchangeError::ParseError(format!("잘못된 kline 시작 시각: {}", self.0))
        })?;

        Ok(Candle::new(
            timestamp,
            parse_decimal(&self.1)?,
            parse_decimal(&self.2)?,
            parse_decimal(&self.3)?,
            parse_decimal(&self.4)?,
            parse_decimal(&self.5)?,
        ))
    }
}

fn parse_decimal(value: &str) -> ExchangeResult<Decimal> {
    value
        .parse::<Decimal>()
        .map_err(|e| ExchangeError::ParseError(format!("{}: {}", value, e)))
}

// ==================== 클라이언트 ====================

/// Binance 공개 시장 데이터 클라이언트.
pub struct BinanceClient {
    config: BinanceConfig,
    client: Client,
}

impl BinanceClient {
    /// 새 Binance 클라이언트 생성.
    pub fn new(config: BinanceConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ExchangeError::NetworkError(format!("HTTP 클라이언트 생성 실패: {}", e))
            })?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BinanceConfig {
        &self.config
    }

    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// 공개 GET 요청.
    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let url = format!("{}{}", self.config.rest_base_url, endpoint);
        let query = Self::build_query(params);

        let full_url = if query.is_empty() {
            url
        } else {
            format!("{}?{}", url, query)
        };

        debug!("GET {}", full_url);

        let response = self.client.get(&full_url).send().await?;

        self.handle_response(response).await
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                error!("응답 파싱 실패: {} - Body: {}", e, body);
                ExchangeError::ParseError(e.to_string())
            })
        } else if status.as_u16() == 429 || status.as_u16() == 418 {
            Err(ExchangeError::RateLimited)
        } else if let Ok(error) = serde_json::from_str::<BinanceError>(&body) {
            Err(self.map_error_code(error.code, &error.msg))
        } else {
            Err(ExchangeError::ApiError {
                code: status.as_u16() as i32,
                message: body,
            })
        }
    }

    /// Binance 에러 코드를 ExchangeError로 매핑.
    fn map_error_code(&self, code: i32, msg: &str) -> ExchangeError {
        match code {
            -1000 => ExchangeError::Unknown(msg.to_string()),
            -1001 => ExchangeError::NetworkError(msg.to_string()),
            -1003 => ExchangeError::RateLimited,
            -1007 => ExchangeError::Timeout(msg.to_string()),
            -1121 => ExchangeError::SymbolNotFound(msg.to_string()),
            _ => ExchangeError::ApiError {
                code,
                message: msg.to_string(),
            },
        }
    }

    /// 마감된 캔들만 남기고 변환합니다.
    fn closed_candles(klines: Vec<BinanceKline>, now_ms: i64) -> ExchangeResult<Vec<Candle>> {
        let mut candles = Vec::with_capacity(klines.len());
        for kline in klines {
            if kline.close_time() > now_ms {
                continue;
            }
            candles.push(kline.into_candle()?);
        }
        Ok(candles)
    }
}

#[async_trait]
impl MarketDataProvider for BinanceClient {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> ExchangeResult<Vec<Candle>> {
        // 미마감 캔들 제외를 감안해 1개 더 요청
        let request_limit = (limit + 1).clamp(1, MAX_KLINES_PER_REQUEST);
        let params = [
            ("symbol", symbol.to_uppercase()),
            ("interval", timeframe.as_interval().to_string()),
            ("limit", request_limit.to_string()),
        ];

        let klines: Vec<BinanceKline> = self.public_get("/api/v3/klines", &params).await?;
        let received = klines.len();

        let mut candles = Self::closed_candles(klines, Utc::now().timestamp_millis())?;
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }

        if candles.is_empty() && received > 0 {
            warn!(symbol, timeframe = %timeframe, "마감된 캔들이 없음");
        }
        debug!(
            symbol,
            timeframe = %timeframe,
            received,
            closed = candles.len(),
            "klines 수신"
        );

        Ok(candles)
    }
}
