//! WebSocket 메시지 타입.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scanner_core::Signal;

/// WebSocket 에러.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("잘못된 메시지 형식: {0}")]
    InvalidMessage(String),
    #[error("직렬화 실패: {0}")]
    SerializationError(#[from] serde_json::Error),
}

// ==================== 클라이언트 → 서버 메시지 ====================

/// 클라이언트에서 서버로 보내는 메시지.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// 핑. 즉시 heartbeat로 응답합니다.
    Ping,
}

impl ClientMessage {
    /// JSON 문자열에서 파싱.
    pub fn from_json(json: &str) -> Result<Self, WsError> {
        serde_json::from_str(json).map_err(|e| WsError::InvalidMessage(e.to_string()))
    }
}

// ==================== 서버 → 클라이언트 메시지 ====================

/// 서버에서 클라이언트로 보내는 메시지.
///
/// 모든 메시지는 `type`, `timestamp`(밀리초), `signals`를 가집니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// 연결 직후 활성 시그널 목록
    Snapshot { timestamp: i64, signals: Vec<Signal> },
    /// 새로 발행된 시그널
    NewSignal { timestamp: i64, signals: Vec<Signal> },
    /// 연결 유지
    Heartbeat { timestamp: i64, signals: Vec<Signal> },
}

impl ServerMessage {
    pub fn snapshot(signals: Vec<Signal>, now: DateTime<Utc>) -> Self {
        Self::Snapshot {
            timestamp: now.timestamp_millis(),
            signals,
        }
    }

    pub fn new_signal(signal: Signal, now: DateTime<Utc>) -> Self {
        Self::NewSignal {
            timestamp: now.timestamp_millis(),
            signals: vec![signal],
        }
    }

    pub fn heartbeat(now: DateTime<Utc>) -> Self {
        Self::Heartbeat {
            timestamp: now.timestamp_millis(),
            signals: Vec::new(),
        }
    }

    pub fn signals(&self) -> &[Signal] {
        match self {
            Self::Snapshot { signals, .. }
            | Self::NewSignal { signals, .. }
            | Self::Heartbeat { signals, .. } => signals,
        }
    }

    /// JSON 문자열로 직렬화.
    pub fn to_json(&self) -> Result<String, WsError> {
        Ok(serde_json::to_string(self)?)
    }
}
