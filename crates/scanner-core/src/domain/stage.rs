//! 패턴 확인 단계와 단계 레코드.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::pattern::{PatternCandidate, SupportingLevels, TupleKey};

/// 패턴 확인 단계.
///
/// `Potential → Forming → NearlyComplete → Confirmed` 순으로 진행하며,
/// `Expired`는 미감지 한도 초과 또는 무효화로 도달하는 별도의 종료 상태입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Potential,
    Forming,
    NearlyComplete,
    Confirmed,
    Expired,
}

impl Stage {
    /// 종료 상태 여부.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Confirmed | Stage::Expired)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Potential => "POTENTIAL",
            Stage::Forming => "FORMING",
            Stage::NearlyComplete => "NEARLY_COMPLETE",
            Stage::Confirmed => "CONFIRMED",
            Stage::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// 튜플 하나의 진행 상태.
///
/// 튜플당 비종료 레코드는 최대 하나이며, 소유 워커만 변경합니다.
/// 상태 전이는 필드 단위가 아니라 레코드 전체 교체로 적용됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub key: TupleKey,
    pub stage: Stage,
    /// 가장 최근 감지의 신뢰도
    pub confidence: f64,
    pub first_seen_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    /// 연속 미감지 스캔 수
    pub consecutive_misses: u32,
    /// 가장 최근 감지의 가격 레벨
    pub levels: SupportingLevels,
    /// 감지된 스캔 수
    pub scans_observed: u32,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl StageRecord {
    /// 처음 감지된 후보로부터 POTENTIAL 레코드를 생성합니다.
    pub fn from_candidate(candidate: &PatternCandidate, now: DateTime<Utc>) -> Self {
        Self {
            key: candidate.key(),
            stage: Stage::Potential,
            confidence: candidate.raw_confidence,
            first_seen_at: now,
            last_updated_at: now,
            consecutive_misses: 0,
            levels: candidate.levels,
            scans_observed: 1,
            confirmed_at: None,
        }
    }
}
