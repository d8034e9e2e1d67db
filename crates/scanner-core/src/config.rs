//! 설정 관리.
//!
//! 기본값 → `config/default.toml`(선택) → `SCANNER__` 접두사 환경 변수 순으로
//! 덮어쓰며 애플리케이션 설정을 구성합니다.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ScannerError, ScannerResult};
use crate::retry::RetryConfig;
use crate::types::Timeframe;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// API 서버 설정
    pub server: ServerConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
    /// 감시 대상 및 시장 데이터 설정
    pub market: MarketConfig,
    /// 지표 설정
    pub indicators: IndicatorConfig,
    /// 패턴 규칙 설정
    pub patterns: PatternConfig,
    /// 단계 추적 설정
    pub stages: StageConfig,
    /// 진입 점수 설정
    pub scoring: ScoringConfig,
    /// 리스크 계산 설정
    pub risk: RiskConfig,
    /// 스캔 스케줄러 설정
    pub scheduler: SchedulerConfig,
    /// 브로드캐스트/중복 제거 설정
    pub broadcast: BroadcastConfig,
    /// 외부 알림 설정
    pub notifications: NotificationConfig,
}

/// API 서버 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// 데이터베이스 설정.
///
/// `url`이 없으면 인메모리 저장소로 동작합니다.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL URL
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 최소 연결 수
    pub min_connections: u32,
    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
    /// 유휴 타임아웃 (초)
    pub idle_timeout_secs: u64,
    /// 시작 시 마이그레이션 실행 여부
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            run_migrations: true,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 감시 대상 심볼/타임프레임 매트릭스와 시장 데이터 소스.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketConfig {
    /// 감시 심볼 (거래소 표기, 예: "BTCUSDT")
    pub symbols: Vec<String>,
    /// 감시 타임프레임
    pub timeframes: Vec<Timeframe>,
    /// 시장 전체 추세 판단용 기준 심볼
    pub reference_symbol: Option<String>,
    /// 스캔마다 조회할 캔들 수
    pub candle_limit: usize,
    /// REST API 기본 URL
    pub rest_base_url: String,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        let symbols = [
            "AVAX", "LINK", "NEAR", "XRP", "PENGU", "ADA", "SUI", "DOT", "DOGE", "UNI", "ETH",
            "BTC",
        ]
        .iter()
        .map(|base| format!("{}USDT", base))
        .collect();

        Self {
            symbols,
            timeframes: vec![Timeframe::M5, Timeframe::M15, Timeframe::H1, Timeframe::H4],
            reference_symbol: Some("BTCUSDT".to_string()),
            candle_limit: 200,
            rest_base_url: "https://api.binance.com".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// 지표 계산 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// RSI 기간
    pub rsi_period: usize,
    /// RSI 과매수 기준
    pub rsi_overbought: f64,
    /// RSI 과매도 기준
    pub rsi_oversold: f64,
    /// ATR 기간
    pub atr_period: usize,
    /// 거래량 이동평균 기간
    pub volume_period: usize,
    /// 추세 판단 단기 SMA 기간
    pub trend_fast_period: usize,
    /// 추세 판단 장기 SMA 기간
    pub trend_slow_period: usize,
    /// 추세 판단 허용 밴드 (%)
    pub trend_band_pct: f64,
    /// 지지/저항 산출 구간 (캔들 수)
    pub level_lookback: usize,
    /// 다이버전스 비교 스윙 구간 (캔들 수)
    pub swing_bars: usize,
    /// 거래량 확인 기준 (거래량 비율)
    pub volume_confirmation: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_overbought: 73.0,
            rsi_oversold: 28.0,
            atr_period: 14,
            volume_period: 20,
            trend_fast_period: 20,
            trend_slow_period: 50,
            trend_band_pct: 0.5,
            level_lookback: 20,
            swing_bars: 5,
            volume_confirmation: 1.2,
        }
    }
}

/// 패턴 규칙 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PatternConfig {
    /// 다이버전스 감시 시작 폭 (과매도 + 폭 이하부터 감시)
    pub divergence_watch_band: f64,
    /// 이중 바닥/천장 탐색 구간
    pub double_lookback: usize,
    /// 피벗 판정 좌우 캔들 수
    pub pivot_span: usize,
    /// 두 극점 간 허용 차이 (%)
    pub double_tolerance_pct: f64,
    /// 넥라인 최소 깊이 (%)
    pub double_min_depth_pct: f64,
    /// 돌파 인정 여유 (%)
    pub breakout_margin_pct: f64,
    /// 돌파 거래량 확인 기준
    pub breakout_volume: f64,
    /// 지지/저항 터치 허용 폭 (%)
    pub level_touch_pct: f64,
    /// 반전 캔들 꼬리/몸통 최소 비율
    pub reversal_wick_ratio: f64,
    /// 반전 캔들 RSI 허용 폭
    pub reversal_rsi_band: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            divergence_watch_band: 15.0,
            double_lookback: 50,
            pivot_span: 5,
            double_tolerance_pct: 1.0,
            double_min_depth_pct: 2.0,
            breakout_margin_pct: 0.5,
            breakout_volume: 1.5,
            level_touch_pct: 0.5,
            reversal_wick_ratio: 2.0,
            reversal_rsi_band: 10.0,
        }
    }
}

/// 단계 추적 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StageConfig {
    /// NEARLY_COMPLETE 진입 신뢰도
    pub near_threshold: f64,
    /// CONFIRMED 진입 신뢰도
    pub final_threshold: f64,
    /// 연속 미감지 허용 한도
    pub miss_budget: u32,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            near_threshold: 0.65,
            final_threshold: 0.8,
            miss_budget: 2,
        }
    }
}

/// 진입 점수 가중치 (합계 100).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub proximity: f64,
    pub trend_alignment: f64,
    pub rsi_extremity: f64,
    pub volume_confirmation: f64,
    pub multi_timeframe: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            proximity: 30.0,
            trend_alignment: 25.0,
            rsi_extremity: 20.0,
            volume_confirmation: 15.0,
            multi_timeframe: 10.0,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.proximity
            + self.trend_alignment
            + self.rsi_extremity
            + self.volume_confirmation
            + self.multi_timeframe
    }
}

/// 진입 점수 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    /// 이 점수 이상이면 strong
    pub strong_threshold: f64,
    /// 이 점수 이상이면 moderate
    pub moderate_threshold: f64,
    /// 이 점수 이상이면 weak
    pub weak_threshold: f64,
    /// 발행 최소 점수
    pub min_entry_score: f64,
    /// 근접도 만점이 사라지는 거리 (ATR 배수)
    pub proximity_atr_span: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            strong_threshold: 70.0,
            moderate_threshold: 60.0,
            weak_threshold: 50.0,
            min_entry_score: 60.0,
            proximity_atr_span: 2.0,
        }
    }
}

/// 변동성 기반 리스크 계산 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskConfig {
    /// 이 ATR% 이하에서 R:R 최소, 레버리지 최대
    pub atr_low_pct: f64,
    /// 이 ATR% 이상에서 R:R 최대, 레버리지 최소
    pub atr_high_pct: f64,
    pub rr_min: f64,
    pub rr_max: f64,
    pub leverage_min: u32,
    pub leverage_max: u32,
    /// 손절 거리 = ATR × 배수
    pub stop_atr_multiplier: f64,
    /// TP2 거리 = TP1 거리 × 배수
    pub tp2_extension: f64,
    /// 가격 반올림 소수 자릿수
    pub price_scale: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            atr_low_pct: 1.0,
            atr_high_pct: 3.0,
            rr_min: 1.8,
            rr_max: 2.7,
            leverage_min: 2,
            leverage_max: 12,
            stop_atr_multiplier: 2.0,
            tp2_extension: 1.5,
            price_scale: 8,
        }
    }
}

/// 스캔 스케줄러 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// 스캔 주기 = 타임프레임 기간 / 분할 수
    pub cadence_divisor: u32,
    /// 최소 스캔 주기 (초)
    pub min_interval_secs: u64,
    /// 최대 스캔 주기 (초)
    pub max_interval_secs: u64,
    /// 스캔당 조회 타임아웃 (초)
    pub scan_timeout_secs: u64,
    /// 스캔 수행 최소 캔들 수
    pub min_history: usize,
    /// 워커 → 브로드캐스터 채널 크기
    pub channel_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cadence_divisor: 5,
            min_interval_secs: 30,
            max_interval_secs: 900,
            scan_timeout_secs: 20,
            min_history: 60,
            channel_capacity: 256,
        }
    }
}

impl SchedulerConfig {
    /// 타임프레임별 스캔 주기. 짧은 타임프레임일수록 자주 스캔합니다.
    pub fn scan_interval(&self, timeframe: Timeframe) -> Duration {
        let divisor = u64::from(self.cadence_divisor.max(1));
        let secs = (timeframe.as_secs() / divisor)
            .clamp(self.min_interval_secs, self.max_interval_secs.max(self.min_interval_secs));
        Duration::from_secs(secs.max(1))
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs.max(1))
    }
}

/// 중복 제거/활성 윈도우 상한 (30일)
pub const MAX_WINDOW_SECS: u64 = 30 * 24 * 3_600;

/// 브로드캐스트/중복 제거 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// 동일 시그널 재발행 금지 기간 (초)
    pub dedup_window_secs: u64,
    /// 진입가 버킷 폭 (%)
    pub price_bucket_pct: f64,
    /// 저장 재시도 설정
    pub persist_retry: RetryConfig,
    /// 구독자 브로드캐스트 채널 크기
    pub hub_capacity: usize,
    /// 활성 시그널로 간주하는 기간 (초)
    pub active_window_secs: u64,
    /// 하트비트 주기 (초)
    pub heartbeat_secs: u64,
    /// 스냅샷 최대 시그널 수
    pub snapshot_limit: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: 3_600,
            price_bucket_pct: 0.5,
            persist_retry: RetryConfig::default(),
            hub_capacity: 1_024,
            active_window_secs: 4 * 3_600,
            heartbeat_secs: 30,
            snapshot_limit: 200,
        }
    }
}

impl BroadcastConfig {
    /// 중복 제거 쿨다운. [`MAX_WINDOW_SECS`]를 넘지 않습니다.
    pub fn dedup_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.dedup_window_secs.min(MAX_WINDOW_SECS) as i64)
    }

    /// 스냅샷에 포함되는 최근 시그널 범위. [`MAX_WINDOW_SECS`]를 넘지 않습니다.
    pub fn active_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.active_window_secs.min(MAX_WINDOW_SECS) as i64)
    }
}

/// 외부 알림 설정.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// 텔레그램 설정
    pub telegram: TelegramConfig,
}

/// 텔레그램 알림 설정.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 봇 토큰
    pub bot_token: String,
    /// 채팅 ID
    pub chat_id: String,
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> ScannerResult<Self> {
        let defaults = config::Config::try_from(&AppConfig::default())?;

        let builder = config::Config::builder()
            // 기본값으로 시작
            .add_source(defaults)
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("SCANNER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("market.symbols")
                    .with_list_parse_key("market.timeframes")
                    .try_parsing(true),
            );

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.apply_legacy_env();
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로(`config/default.toml`)에서 설정을 로드합니다.
    pub fn load_default() -> ScannerResult<Self> {
        Self::load("config/default.toml")
    }

    /// 배포 환경에서 쓰이는 단일 환경 변수를 반영합니다.
    fn apply_legacy_env(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                self.database.url = Some(url);
            }
        }
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("API_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.notifications.telegram.bot_token = token;
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            self.notifications.telegram.chat_id = chat_id;
        }
    }

    /// 설정값 간의 일관성을 검증합니다.
    pub fn validate(&self) -> ScannerResult<()> {
        let fail = |msg: &str| Err(ScannerError::Config(msg.to_string()));

        if self.market.symbols.is_empty() {
            return fail("market.symbols가 비어 있습니다");
        }
        if self.market.timeframes.is_empty() {
            return fail("market.timeframes가 비어 있습니다");
        }
        let ind = &self.indicators;
        if !(0.0..=100.0).contains(&ind.rsi_oversold)
            || !(0.0..=100.0).contains(&ind.rsi_overbought)
            || ind.rsi_oversold >= ind.rsi_overbought
        {
            return fail("RSI 과매도 기준은 과매수 기준보다 작아야 합니다");
        }
        if ind.rsi_period == 0 || ind.atr_period == 0 || ind.volume_period == 0 {
            return fail("지표 기간은 0보다 커야 합니다");
        }
        if ind.trend_fast_period >= ind.trend_slow_period {
            return fail("trend_fast_period는 trend_slow_period보다 작아야 합니다");
        }
        let stages = &self.stages;
        if stages.near_threshold > stages.final_threshold {
            return fail("near_threshold는 final_threshold 이하여야 합니다");
        }
        if stages.miss_budget == 0 {
            return fail("miss_budget은 1 이상이어야 합니다");
        }
        let scoring = &self.scoring;
        if scoring.weights.sum() <= 0.0 {
            return fail("점수 가중치 합계는 0보다 커야 합니다");
        }
        if !(scoring.weak_threshold <= scoring.moderate_threshold
            && scoring.moderate_threshold <= scoring.strong_threshold)
        {
            return fail("점수 기준은 weak <= moderate <= strong 순이어야 합니다");
        }
        let risk = &self.risk;
        if risk.atr_low_pct >= risk.atr_high_pct {
            return fail("atr_low_pct는 atr_high_pct보다 작아야 합니다");
        }
        if risk.rr_min > risk.rr_max || risk.rr_min <= 0.0 {
            return fail("R:R 범위가 올바르지 않습니다");
        }
        if risk.leverage_min > risk.leverage_max || risk.leverage_min == 0 {
            return fail("레버리지 범위가 올바르지 않습니다");
        }
        if risk.stop_atr_multiplier <= 0.0 {
            return fail("stop_atr_multiplier는 0보다 커야 합니다");
        }
        let broadcast = &self.broadcast;
        if broadcast.price_bucket_pct <= 0.0 {
            return fail("price_bucket_pct는 0보다 커야 합니다");
        }
        if broadcast.dedup_window_secs == 0 || broadcast.dedup_window_secs > MAX_WINDOW_SECS {
            return fail("dedup_window_secs는 1초 이상 30일 이하여야 합니다");
        }
        if broadcast.active_window_secs == 0 || broadcast.active_window_secs > MAX_WINDOW_SECS {
            return fail("active_window_secs는 1초 이상 30일 이하여야 합니다");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.market.symbols.len(), 12);
        assert_eq!(config.indicators.rsi_oversold, 28.0);
        assert_eq!(config.scoring.weights.sum(), 100.0);
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = AppConfig::default();
        config.stages.near_threshold = 0.9;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.risk.leverage_min = 20;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.indicators.rsi_oversold = 80.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_broadcast_windows() {
        let mut config = AppConfig::default();
        config.broadcast.dedup_window_secs = u64::MAX;
        assert!(config.validate().is_err());
        // 검증을 거치지 않아도 윈도우 계산은 상한에서 멈춤
        assert_eq!(
            config.broadcast.dedup_window(),
            chrono::Duration::seconds(MAX_WINDOW_SECS as i64)
        );

        let mut config = AppConfig::default();
        config.broadcast.active_window_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.broadcast.active_window_secs = MAX_WINDOW_SECS;
        assert!(config.validate().is_ok());
        assert_eq!(config.broadcast.active_window(), chrono::Duration::days(30));
    }

    #[test]
    fn test_scan_interval_shorter_for_shorter_timeframes() {
        let scheduler = SchedulerConfig::default();
        let m5 = scheduler.scan_interval(Timeframe::M5);
        let h1 = scheduler.scan_interval(Timeframe::H1);
        let h4 = scheduler.scan_interval(Timeframe::H4);

        assert_eq!(m5, Duration::from_secs(60));
        assert!(m5 < h1);
        assert!(h1 <= h4);
        assert_eq!(h4, Duration::from_secs(900));
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let text = r#"
            [market]
            symbols = ["ETHUSDT"]
            timeframes = ["1h"]

            [stages]
            miss_budget = 3
        "#;
        let config: AppConfig = toml::from_str(text).unwrap();

        assert_eq!(config.market.symbols, vec!["ETHUSDT".to_string()]);
        assert_eq!(config.market.timeframes, vec![Timeframe::H1]);
        assert_eq!(config.stages.miss_budget, 3);
        assert_eq!(config.stages.final_threshold, 0.8);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(config.risk.rr_max, 2.7);
        assert_eq!(config.market.timeframes.len(), 4);
    }
}
