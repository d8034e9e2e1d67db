//! 시그널 저장소.
//!
//! 발행된 시그널을 `signals` 테이블(PostgreSQL) 또는 메모리에 저장하고
//! 조회 API에 제공합니다.

pub mod error;
pub mod storage;
pub mod store;

pub use error::{DataError, Result};
pub use storage::memory::MemorySignalStore;
pub use storage::postgres::{Database, PgSignalStore, SignalRecord};
pub use store::{SignalQuery, SignalStore, DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT};
