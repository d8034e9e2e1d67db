//! 시그널 조회 endpoint.
//!
//! - `GET /api/v1/signals?symbol=&timeframe=&since=&limit=` 최신순 목록
//! - `GET /api/v1/signals/{id}` 단건 조회

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use scanner_core::Signal;
use scanner_data::SignalQuery;

use crate::error::{storage_error, ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// 시그널 목록 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignalsListResponse {
    pub signals: Vec<Signal>,
    pub total: usize,
}

/// 시그널 목록 조회.
///
/// GET /api/v1/signals
pub async fn list_signals(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SignalQuery>, QueryRejection>,
) -> ApiResult<Json<SignalsListResponse>> {
    let Query(query) = query.map_err(|e| ApiErrorResponse::invalid_input(e.body_text()))?;

    debug!(
        symbol = ?query.normalized_symbol(),
        timeframe = ?query.timeframe,
        limit = query.effective_limit(),
        "시그널 목록 조회"
    );

    let signals = state.store.query(&query).await.map_err(storage_error)?;
    let total = signals.len();

    Ok(Json(SignalsListResponse { signals, total }))
}

/// 시그널 단건 조회.
///
/// GET /api/v1/signals/{id}
pub async fn get_signal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Signal>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiErrorResponse::invalid_input(format!("잘못된 시그널 ID: {}", id)))?;

    match state.store.get(id).await.map_err(storage_error)? {
        Some(signal) => Ok(Json(signal)),
        None => Err(ApiErrorResponse::not_found(format!(
            "시그널을 찾을 수 없습니다: {}",
            id
        ))),
    }
}

/// 시그널 라우터 생성.
pub fn signals_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_signals))
        .route("/{id}", get(get_signal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::state::create_test_state;

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let app = Router::new()
            .route("/api/v1/signals/{id}", get(get_signal))
            .with_state(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/signals/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_bad_query_is_bad_request() {
        let app = Router::new()
            .route("/api/v1/signals", get(list_signals))
            .with_state(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/signals?limit=many")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
