//! 스캐너 도메인 모델.

mod candle;
mod pattern;
mod signal;
mod snapshot;
mod stage;

pub use candle::*;
pub use pattern::*;
pub use signal::*;
pub use snapshot::*;
pub use stage::*;
