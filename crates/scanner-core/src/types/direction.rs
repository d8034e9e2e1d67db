//! 시그널 방향과 추세 방향.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 시그널 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// 매수(롱)
    Long,
    /// 매도(숏)
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    /// 이 방향에 유리한 추세.
    pub fn favoured_trend(&self) -> TrendDirection {
        match self {
            Direction::Long => TrendDirection::Up,
            Direction::Short => TrendDirection::Down,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            _ => Err(format!("Invalid direction: {}", s)),
        }
    }
}

/// 추세 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

/// 추세와 시그널 방향의 정렬 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Aligned,
    Neutral,
    Opposed,
}

impl TrendDirection {
    /// 주어진 시그널 방향과의 정렬 상태를 반환합니다.
    pub fn alignment_with(&self, direction: Direction) -> Alignment {
        match self {
            TrendDirection::Sideways => Alignment::Neutral,
            trend if *trend == direction.favoured_trend() => Alignment::Aligned,
            _ => Alignment::Opposed,
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Sideways => "sideways",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment() {
        assert_eq!(
            TrendDirection::Up.alignment_with(Direction::Long),
            Alignment::Aligned
        );
        assert_eq!(
            TrendDirection::Up.alignment_with(Direction::Short),
            Alignment::Opposed
        );
        assert_eq!(
            TrendDirection::Sideways.alignment_with(Direction::Short),
            Alignment::Neutral
        );
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("LONG".parse::<Direction>().unwrap(), Direction::Long);
        assert!("flat".parse::<Direction>().is_err());
    }
}
