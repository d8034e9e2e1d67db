//! 읽기 전용 설정 조회 endpoint.
//!
//! 운영 중인 임계값과 스캔 대상 행렬을 노출합니다. 변경 API는 없습니다.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use scanner_core::{AppConfig, ScoreWeights, Timeframe};

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsiThresholds {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

/// 최소/최대 구간.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

/// 스캔 대상 한 쌍과 스캔 주기.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTarget {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub interval_secs: u64,
}

/// 설정 조회 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSurfaceResponse {
    pub rsi: RsiThresholds,
    pub min_entry_score: f64,
    pub score_weights: ScoreWeights,
    pub risk_reward: Bounds<f64>,
    pub leverage: Bounds<u32>,
    /// 이 구간 안에서 R:R과 레버리지가 선형 보간됩니다
    pub atr_percent: Bounds<f64>,
    pub stop_atr_multiplier: f64,
    pub volume_confirmation: f64,
    pub symbols: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    pub matrix: Vec<ScanTarget>,
}

impl From<&AppConfig> for ConfigSurfaceResponse {
    fn from(config: &AppConfig) -> Self {
        let matrix = config
            .market
            .symbols
            .iter()
            .flat_map(|symbol| {
                config.market.timeframes.iter().map(move |&timeframe| ScanTarget {
                    symbol: symbol.to_uppercase(),
                    timeframe,
                    interval_secs: config.scheduler.scan_interval(timeframe).as_secs(),
                })
            })
            .collect();

        Self {
            rsi: RsiThresholds {
                period: config.indicators.rsi_period,
                overbought: config.indicators.rsi_overbought,
                oversold: config.indicators.rsi_oversold,
            },
            min_entry_score: config.scoring.min_entry_score,
            score_weights: config.scoring.weights.clone(),
            risk_reward: Bounds {
                min: config.risk.rr_min,
                max: config.risk.rr_max,
            },
            leverage: Bounds {
                min: config.risk.leverage_min,
                max: config.risk.leverage_max,
            },
            atr_percent: Bounds {
                min: config.risk.atr_low_pct,
                max: config.risk.atr_high_pct,
            },
            stop_atr_multiplier: config.risk.stop_atr_multiplier,
            volume_confirmation: config.indicators.volume_confirmation,
            symbols: config.market.symbols.clone(),
            timeframes: config.market.timeframes.clone(),
            matrix,
        }
    }
}

/// 현재 설정 조회.
///
/// GET /api/v1/config
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigSurfaceResponse> {
    Json(ConfigSurfaceResponse::from(state.config.as_ref()))
}

/// 설정 라우터 생성.
pub fn config_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_from_defaults() {
        let surface = ConfigSurfaceResponse::from(&AppConfig::default());

        assert_eq!(surface.rsi.overbought, 73.0);
        assert_eq!(surface.rsi.oversold, 28.0);
        assert_eq!(surface.risk_reward.min, 1.8);
        assert_eq!(surface.risk_reward.max, 2.7);
        assert_eq!(
            surface.matrix.len(),
            surface.symbols.len() * surface.timeframes.len()
        );
        let h1 = surface
            .matrix
            .iter()
            .find(|t| t.timeframe == Timeframe::H1)
            .unwrap();
        assert_eq!(h1.interval_secs, 720);
    }
}
