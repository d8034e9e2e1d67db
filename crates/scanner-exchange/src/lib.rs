//! 시장 데이터 제공자.
//!
//! 이 crate는 다음을 제공합니다:
//! - [`MarketDataProvider`]: 마감된 OHLCV 캔들 조회 트레이트
//! - [`BinanceClient`]: Binance 공개 REST klines 클라이언트
//! - [`SimulatedProvider`]: 스크립트/랜덤 워크 기반 인메모리 제공자

pub mod connector;
pub mod error;
pub mod simulated;
pub mod traits;

pub use connector::binance::{BinanceClient, BinanceConfig};
pub use error::ExchangeError;
pub use simulated::{generate_random_walk, RandomWalk, SimulatedProvider};
pub use traits::{ExchangeResult, MarketDataProvider};
