//! 시그널 스캐너 REST API 및 WebSocket 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 조회 API (`/api/v1/signals`, `/api/v1/config`)
//! - 실시간 시그널 구독용 WebSocket (`/ws`)
//! - 헬스 체크 엔드포인트
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`websocket`]: 시그널 구독 채널

pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;

use std::sync::Arc;

use axum::Router;

pub use error::{ApiErrorResponse, ApiResult};
pub use routes::*;
pub use state::AppState;
pub use websocket::{websocket_handler, websocket_router, ClientMessage, ServerMessage, WsError};

/// 헬스 체크, REST API, WebSocket을 합친 라우터를 생성합니다.
pub fn create_router(state: Arc<AppState>) -> Router {
    create_api_router()
        .merge(websocket_router())
        .with_state(state)
}
