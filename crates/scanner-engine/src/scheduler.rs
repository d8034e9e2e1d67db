//! 스캔 스케줄러.
//!
//! 심볼 × 타임프레임 행렬의 각 쌍마다 [`ScanWorker`]를 독립 task로 실행합니다.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use scanner_core::{AppConfig, Signal, Timeframe};
use scanner_exchange::MarketDataProvider;

use crate::error::EngineResult;
use crate::pipeline::ScanPipeline;
use crate::worker::ScanWorker;

/// 쌍별 워커의 생명주기를 관리합니다.
pub struct ScanScheduler {
    config: AppConfig,
    provider: Arc<dyn MarketDataProvider>,
    cancel: CancellationToken,
    tasks: JoinSet<()>,
}

impl ScanScheduler {
    pub fn new(config: AppConfig, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            config,
            provider,
            cancel: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    /// 외부 종료 신호와 연결된 토큰을 사용합니다.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 스캔 대상 (심볼, 타임프레임) 쌍. 심볼은 대문자로 정규화되고 중복은 제거됩니다.
    pub fn pairs(&self) -> Vec<(String, Timeframe)> {
        let mut symbols: Vec<String> = self
            .config
            .market
            .symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        let mut seen = HashSet::new();
        symbols.retain(|s| seen.insert(s.clone()));

        let mut timeframes = self.config.market.timeframes.clone();
        timeframes.sort();
        timeframes.dedup();

        symbols
            .iter()
            .flat_map(|symbol| timeframes.iter().map(move |tf| (symbol.clone(), *tf)))
            .collect()
    }

    /// 모든 쌍의 워커를 생성해 실행합니다. 실행된 워커 수를 반환합니다.
    ///
    /// 파이프라인 생성(리스크 설정 검증)에 실패하면 아무 워커도 시작하지 않습니다.
    pub fn start(&mut self, signals: mpsc::Sender<Signal>) -> EngineResult<usize> {
        let workers = self
            .pairs()
            .into_iter()
            .map(|(symbol, timeframe)| {
                let pipeline = ScanPipeline::new(symbol, timeframe, &self.config)?;
                Ok(ScanWorker::new(
                    pipeline,
                    Arc::clone(&self.provider),
                    signals.clone(),
                    &self.config,
                ))
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let count = workers.len();
        for worker in workers {
            self.tasks.spawn(worker.run(self.cancel.child_token()));
        }

        info!(
            workers = count,
            provider = self.provider.name(),
            "스캔 스케줄러 시작"
        );
        Ok(count)
    }

    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// 모든 워커에 취소를 알리고 종료를 기다립니다.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();

        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "스캔 워커 비정상 종료");
            }
        }

        info!("스캔 스케줄러 종료");
    }
}
