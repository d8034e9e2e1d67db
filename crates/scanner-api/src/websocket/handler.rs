//! WebSocket 연결 handler.
//!
//! 연결 시 활성 시그널 스냅샷을 보내고, 이후 새 시그널과 heartbeat를 전송합니다.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::messages::{ClientMessage, ServerMessage};
use crate::state::AppState;

/// 세션별 응답 대기열 크기
const REPLY_BUFFER: usize = 16;

/// WebSocket 업그레이드 핸들러.
///
/// `GET /ws`
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// WebSocket 연결 처리.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    info!(%session_id, "WebSocket connected");

    // 스냅샷 조회 전에 구독해야 사이에 발행된 시그널을 놓치지 않음
    let mut hub_rx = state.broadcaster.subscribe();
    let (mut sender, mut receiver) = socket.split();

    let snapshot = match state.broadcaster.active_signals(&state.config.broadcast).await {
        Ok(signals) => signals,
        Err(e) => {
            warn!(%session_id, error = %e, "스냅샷 조회 실패, 빈 스냅샷 전송");
            Vec::new()
        }
    };
    let already_sent: HashSet<Uuid> = snapshot.iter().map(|s| s.id).collect();

    if !send_message(&mut sender, &ServerMessage::snapshot(snapshot, Utc::now())).await {
        info!(%session_id, "WebSocket disconnected before snapshot");
        return;
    }

    // 클라이언트 메시지 수신 태스크
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMessage>(REPLY_BUFFER);
    let mut receive_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_client_message(session_id, msg, &reply_tx).await {
                        break;
                    }
                }
                Err(e) => {
                    debug!(%session_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // 시그널/heartbeat 전송 태스크
    let heartbeat_period = Duration::from_secs(state.config.broadcast.heartbeat_secs.max(1));
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = interval_at(Instant::now() + heartbeat_period, heartbeat_period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let message = tokio::select! {
                received = hub_rx.recv() => match received {
                    Ok(signal) if already_sent.contains(&signal.id) => continue,
                    Ok(signal) => ServerMessage::new_signal(signal, Utc::now()),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(%session_id, skipped = n, "WebSocket lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = heartbeat.tick() => ServerMessage::heartbeat(Utc::now()),
                Some(reply) = reply_rx.recv() => reply,
            };

            if !send_message(&mut sender, &message).await {
                break;
            }
        }
    });

    // 하나의 태스크가 종료되면 다른 것도 종료
    tokio::select! {
        _ = &mut receive_task => {
            debug!(%session_id, "Receive task ended");
            send_task.abort();
        }
        _ = &mut send_task => {
            debug!(%session_id, "Send task ended");
            receive_task.abort();
        }
    }

    info!(%session_id, "WebSocket disconnected");
}

/// 메시지를 전송합니다. 실패하면 `false` (구독자 제거).
async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> bool {
    match message.to_json() {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "메시지 직렬화 실패");
            true
        }
    }
}

/// 클라이언트 메시지 처리.
///
/// `true`면 연결 유지, `false`면 연결 종료
async fn handle_client_message(
    session_id: Uuid,
    msg: Message,
    reply: &mpsc::Sender<ServerMessage>,
) -> bool {
    match msg {
        Message::Text(text) => match ClientMessage::from_json(&text) {
            Ok(ClientMessage::Ping) => reply
                .send(ServerMessage::heartbeat(Utc::now()))
                .await
                .is_ok(),
            Err(e) => {
                debug!(%session_id, error = %e, "Invalid client message ignored");
                true
            }
        },
        Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            debug!(%session_id, "Close message received");
            false
        }
    }
}

/// WebSocket 라우터 생성.
pub fn websocket_router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(websocket_handler))
}
