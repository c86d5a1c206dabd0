use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// 버킷 최소 폭 (30초)
pub const MIN_BUCKET_MS: i64 = 30_000;

pub const DEFAULT_MAX_POINTS: i64 = 600;
pub const MIN_MAX_POINTS: i64 = 10;
pub const MAX_MAX_POINTS: i64 = 2000;

/// 조회 구간 토큰
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryRange {
    /// 최근 1일
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    /// 최근 7일
    #[serde(rename = "7d")]
    SevenDays,
    /// 최근 365일
    #[serde(rename = "1y")]
    OneYear,
    /// 전체 (epoch 0부터)
    #[serde(rename = "all")]
    All,
}

impl HistoryRange {
    /// 알 수 없는 토큰이나 누락된 값은 "1d"로 취급
    pub fn from_param(value: Option<&str>) -> Self {
        value
            .and_then(|v| HistoryRange::from_str(v).ok())
            .unwrap_or_default()
    }

    /// `to_ts` 기준 구간 시작 시각
    pub fn start_ts(&self, to_ts: i64) -> i64 {
        match self {
            HistoryRange::OneDay => to_ts.saturating_sub(DAY_MS),
            HistoryRange::SevenDays => to_ts.saturating_sub(7 * DAY_MS),
            HistoryRange::OneYear => to_ts.saturating_sub(365 * DAY_MS),
            HistoryRange::All => 0,
        }
    }
}

impl Display for HistoryRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryRange::OneDay => write!(f, "1d"),
            HistoryRange::SevenDays => write!(f, "7d"),
            HistoryRange::OneYear => write!(f, "1y"),
            HistoryRange::All => write!(f, "all"),
        }
    }
}

impl FromStr for HistoryRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(HistoryRange::OneDay),
            "7d" => Ok(HistoryRange::SevenDays),
            "1y" => Ok(HistoryRange::OneYear),
            "all" => Ok(HistoryRange::All),
            _ => Err(format!("Invalid HistoryRange: {}", s)),
        }
    }
}

/// 히스토리 조회 요청
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub range: HistoryRange,
    /// 0 이상일 때만 사용, 아니면 range로 계산
    pub from_ts: Option<i64>,
    /// 0보다 클 때만 사용, 아니면 현재 시각
    pub to_ts: Option<i64>,
    /// [10, 2000]으로 보정, 기본값 600
    pub max_points: Option<i64>,
}

impl HistoryQuery {
    pub fn new(range: HistoryRange) -> Self {
        Self {
            range,
            ..Default::default()
        }
    }

    /// 요청 파라미터를 실제 조회 구간과 버킷 폭으로 확정
    pub fn resolve(&self, now_ms: i64) -> HistoryWindow {
        let to_ts = self.to_ts.filter(|ts| *ts > 0).unwrap_or(now_ms);
        let from_ts = self
            .from_ts
            .filter(|ts| *ts >= 0)
            .unwrap_or_else(|| self.range.start_ts(to_ts));

        let max_points = self
            .max_points
            .unwrap_or(DEFAULT_MAX_POINTS)
            .clamp(MIN_MAX_POINTS, MAX_MAX_POINTS);

        let span = to_ts.saturating_sub(from_ts).max(1);
        let bucket_ms = ceil_div(span, max_points).max(MIN_BUCKET_MS);

        HistoryWindow {
            from_ts,
            to_ts,
            bucket_ms,
        }
    }
}

/// 확정된 조회 구간 (양 끝 포함)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub from_ts: i64,
    pub to_ts: i64,
    pub bucket_ms: i64,
}

impl HistoryWindow {
    /// from > to 인 구간은 비어 있음
    pub fn is_empty(&self) -> bool {
        self.from_ts > self.to_ts
    }

    /// 구간이 걸치는 버킷 수
    pub fn bucket_count(&self) -> i64 {
        if self.is_empty() {
            return 0;
        }
        bucket_index(self.to_ts, self.bucket_ms) - bucket_index(self.from_ts, self.bucket_ms) + 1
    }
}

/// floor(ts / bucket_ms), 음수 ts도 내림
pub fn bucket_index(ts: i64, bucket_ms: i64) -> i64 {
    ts.div_euclid(bucket_ms)
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    value / divisor + i64::from(value % divisor != 0)
}

/// 차트 포인트
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// epoch ms
    pub timestamp: i64,
    pub equity: f64,
}

/// 히스토리 조회 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityHistory {
    pub points: Vec<EquityPoint>,
    pub bucket_ms: i64,
    pub from_ts: i64,
    pub to_ts: i64,
}

impl EquityHistory {
    pub fn new(window: &HistoryWindow, points: Vec<EquityPoint>) -> Self {
        Self {
            points,
            bucket_ms: window.bucket_ms,
            from_ts: window.from_ts,
            to_ts: window.to_ts,
        }
    }
}
