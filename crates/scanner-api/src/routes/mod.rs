//! REST API 라우트.
//!
//! # 엔드포인트
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/v1/signals` - 시그널 조회
//! - `/api/v1/signals/{id}` - 단건 조회
//! - `/api/v1/config` - 읽기 전용 설정 조회

pub mod config;
pub mod health;
pub mod signals;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub use config::{config_router, ConfigSurfaceResponse};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use signals::{signals_router, SignalsListResponse};

/// REST API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/health", health_router())
        .nest("/api/v1/signals", signals_router())
        .nest("/api/v1/config", config_router())
}
