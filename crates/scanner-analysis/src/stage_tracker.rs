//! 패턴 확인 단계 추적기.
//!
//! 스캔 워커 하나가 추적기 하나를 소유하며, 튜플별 [`StageRecord`]를
//! 스캔마다 진행시킵니다.
//!
//! # 단계 전이
//!
//! ```text
//! POTENTIAL ──(다음 스캔 재감지, 신뢰도 유지/상승)──▶ FORMING
//! FORMING ──(신뢰도 >= near, 거래량 확인)──▶ NEARLY_COMPLETE
//! NEARLY_COMPLETE ──(신뢰도 >= final)──▶ CONFIRMED (1회 발행)
//! 모든 비종료 단계 ──(미감지 한도 도달 또는 무효화)──▶ EXPIRED (제거)
//! ```
//!
//! POTENTIAL → FORMING 전이는 해당 스캔을 소모합니다. FORMING 이후의 조건은
//! 같은 스캔 안에서 연속으로 충족될 수 있습니다.
//!
//! CONFIRMED 레코드는 종료 상태로 남아 같은 튜플의 재감지가 새 생명주기를
//! 시작하지 못하게 막습니다. 미감지 한도에 도달하거나 무효화되면 은퇴합니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use scanner_core::{PatternCandidate, Stage, StageConfig, StageRecord, TupleKey};

/// 만료 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// 연속 미감지 한도 도달
    MissBudget,
    /// 종가가 무효화 레벨을 넘어섬
    Invalidated,
}

/// 한 번의 스캔에서 발생한 단계 이벤트.
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    /// 새 레코드 생성 (POTENTIAL)
    Created { key: TupleKey, confidence: f64 },
    /// 단계 전진
    Advanced { key: TupleKey, from: Stage, to: Stage },
    /// 확정. 레코드 생명주기 동안 정확히 한 번 발생합니다.
    Confirmed(StageRecord),
    /// 만료 및 제거
    Expired {
        key: TupleKey,
        from: Stage,
        reason: ExpiryReason,
    },
    /// 확정 레코드의 은퇴. 이후 같은 튜플의 새 레코드가 허용됩니다.
    Retired { key: TupleKey },
}

/// 튜플별 단계 레코드를 소유하는 추적기.
#[derive(Debug, Clone)]
pub struct StageTracker {
    config: StageConfig,
    /// 거래량 확인 기준 (거래량 비율)
    volume_threshold: f64,
    records: HashMap<TupleKey, StageRecord>,
}

impl StageTracker {
    pub fn new(config: StageConfig, volume_threshold: f64) -> Self {
        Self {
            config,
            volume_threshold,
            records: HashMap::new(),
        }
    }

    pub fn volume_threshold(&self) -> f64 {
        self.volume_threshold
    }

    pub fn get(&self, key: &TupleKey) -> Option<&StageRecord> {
        self.records.get(key)
    }

    pub fn records(&self) -> impl Iterator<Item = &StageRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 확정 전 단계의 레코드 수.
    pub fn pending_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| !r.stage.is_terminal())
            .count()
    }

    /// 한 스캔의 감지 결과로 모든 레코드를 진행시킵니다.
    ///
    /// - `candidates`: 이번 스캔의 후보. 같은 튜플이 여럿이면 신뢰도가 가장 높은 것만 사용
    /// - `last_close`: 무효화 판정용 마지막 종가
    /// - `volume_confirmed`: 이번 스캔의 거래량 확인 여부
    pub fn advance(
        &mut self,
        candidates: Vec<PatternCandidate>,
        last_close: Decimal,
        volume_confirmed: bool,
        now: DateTime<Utc>,
    ) -> Vec<StageEvent> {
        let mut detected: BTreeMap<TupleKey, PatternCandidate> = BTreeMap::new();
        for candidate in candidates {
            match detected.get(&candidate.key()) {
                Some(existing) if existing.raw_confidence >= candidate.raw_confidence => {}
                _ => {
                    detected.insert(candidate.key(), candidate);
                }
            }
        }

        let mut events = Vec::new();
        let mut keys: Vec<TupleKey> = self.records.keys().cloned().collect();
        keys.sort();

        for key in keys {
            let Some(record) = self.records.remove(&key) else {
                continue;
            };

            // 무효화는 단계와 무관하게 먼저 판정
            if record.levels.is_invalidated_by(key.direction, last_close) {
                events.push(self.terminate(record, ExpiryReason::Invalidated));
                continue;
            }

            match detected.remove(&key) {
                Some(candidate) => {
                    let next =
                        self.on_detected(record, &candidate, volume_confirmed, now, &mut events);
                    self.records.insert(key, next);
                }
                None => {
                    let mut next = record;
                    next.consecutive_misses += 1;
                    if next.consecutive_misses >= self.config.miss_budget {
                        events.push(self.terminate(next, ExpiryReason::MissBudget));
                    } else {
                        debug!(key = %key, misses = next.consecutive_misses, "패턴 미감지");
                        self.records.insert(key, next);
                    }
                }
            }
        }

        for (key, candidate) in detected {
            let record = StageRecord::from_candidate(&candidate, now);
            debug!(key = %key, confidence = record.confidence, "새 패턴 추적 시작");
            events.push(StageEvent::Created {
                key: key.clone(),
                confidence: record.confidence,
            });
            self.records.insert(key, record);
        }

        events
    }

    /// 재감지된 레코드의 다음 상태를 계산합니다. 레코드 전체를 새로 만들어 반환합니다.
    fn on_detected(
        &self,
        record: StageRecord,
        candidate: &PatternCandidate,
        volume_confirmed: bool,
        now: DateTime<Utc>,
        events: &mut Vec<StageEvent>,
    ) -> StageRecord {
        let previous_confidence = record.confidence;
        let detected_last_scan = record.consecutive_misses == 0;

        let mut next = StageRecord {
            confidence: candidate.raw_confidence,
            last_updated_at: now,
            consecutive_misses: 0,
            levels: candidate.levels,
            scans_observed: record.scans_observed.saturating_add(1),
            ..record
        };

        if next.stage == Stage::Confirmed {
            return next;
        }

        let key = next.key.clone();
        let mut step = |next: &mut StageRecord, to: Stage| {
            events.push(StageEvent::Advanced {
                key: key.clone(),
                from: next.stage,
                to,
            });
            next.stage = to;
        };

        if next.stage == Stage::Potential {
            if detected_last_scan && next.confidence >= previous_confidence {
                step(&mut next, Stage::Forming);
            }
            return next;
        }

        if next.stage == Stage::Forming
            && next.confidence >= self.config.near_threshold
            && volume_confirmed
        {
            step(&mut next, Stage::NearlyComplete);
        }

        if next.stage == Stage::NearlyComplete && next.confidence >= self.config.final_threshold {
            step(&mut next, Stage::Confirmed);
            next.confirmed_at = Some(now);
            info!(
                key = %next.key,
                confidence = next.confidence,
                scans = next.scans_observed,
                "패턴 확정"
            );
            events.push(StageEvent::Confirmed(next.clone()));
        }

        next
    }

    fn terminate(&self, record: StageRecord, reason: ExpiryReason) -> StageEvent {
        if record.stage == Stage::Confirmed {
            debug!(key = %record.key, ?reason, "확정 레코드 은퇴");
            return StageEvent::Retired { key: record.key };
        }

        debug!(key = %record.key, from = %record.stage, ?reason, "패턴 만료");
        StageEvent::Expired {
            key: record.key,
            from: record.stage,
            reason,
        }
    }
}
