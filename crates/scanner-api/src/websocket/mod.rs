//! 시그널 구독용 WebSocket 서버.
//!
//! # 메시지 형식
//!
//! ## 서버 → 클라이언트
//!
//! ```json
//! {"type": "snapshot", "timestamp": 1717200000000, "signals": [...]}
//! {"type": "new_signal", "timestamp": 1717200000000, "signals": [{...}]}
//! {"type": "heartbeat", "timestamp": 1717200000000, "signals": []}
//! ```
//!
//! ## 클라이언트 → 서버
//!
//! ```json
//! {"type": "ping"}
//! ```

pub mod handler;
pub mod messages;

pub use handler::{websocket_handler, websocket_router};
pub use messages::{ClientMessage, ServerMessage, WsError};
