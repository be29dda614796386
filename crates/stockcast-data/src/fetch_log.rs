//! 수집 파이프라인 단계 기록.
//!
//! 각 단계는 구조화된 [`FetchStep`]으로 남고, 화면에 보여줄 때만
//! [`FetchLog::lines`]로 문자열로 바뀝니다.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::time::Duration;

use stockcast_core::{Adjust, BarPeriod, DISPLAY_DATETIME_FORMAT};

/// 파이프라인 단계 하나.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum FetchStep {
    /// 요청 시작
    Request {
        symbol: String,
        period: BarPeriod,
        adjust: Adjust,
        today_only: bool,
    },
    /// 시도 실패
    AttemptFailed { attempt: u32, error: String },
    /// 재시도 예약
    RetryScheduled { attempt: u32, wait: Duration },
    /// 모든 재시도 실패
    RetriesExhausted,
    /// 수정주가 없이 마지막 시도
    FallbackWithoutAdjust,
    /// 최종 실패
    FinalFailure { error: String },
    /// 재시도하지 않는 오류
    NonTransientError { error: String },
    /// 업스트림이 빈 결과 반환
    EmptyResult,
    /// 원본 행 수
    RawRows { rows: usize },
    /// 숫자 변환 후 결측치 증가
    NanIncrease { column: &'static str, added: usize },
    /// 파싱할 수 없는 시각
    DroppedTimestamps { count: usize },
    /// 중복 시각
    DuplicateTimestamps { count: usize },
    /// 정제 완료
    Cleaned { rows: usize },
    /// 당일 필터
    TodayFilter {
        rows: usize,
        first: Option<NaiveDateTime>,
        last: Option<NaiveDateTime>,
    },
}

/// 수집 단계 기록.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchLog {
    steps: Vec<FetchStep>,
}

impl FetchLog {
    /// 빈 기록을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 단계를 추가합니다.
    pub fn push(&mut self, step: FetchStep) {
        self.steps.push(step);
    }

    /// 모든 단계.
    pub fn steps(&self) -> &[FetchStep] {
        &self.steps
    }

    /// 예약된 재시도 횟수.
    pub fn retry_count(&self) -> usize {
        self.retry_waits().len()
    }

    /// 재시도 전 대기 시간 목록.
    pub fn retry_waits(&self) -> Vec<Duration> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                FetchStep::RetryScheduled { wait, .. } => Some(*wait),
                _ => None,
            })
            .collect()
    }

    /// 수정주가 없는 폴백이 사용되었는지 확인합니다.
    pub fn used_fallback(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s, FetchStep::FallbackWithoutAdjust))
    }

    /// 다른 기록을 이어 붙입니다.
    pub fn extend(&mut self, other: FetchLog) {
        self.steps.extend(other.steps);
    }

    /// 사람이 읽는 로그 줄.
    pub fn lines(&self) -> Vec<String> {
        self.steps.iter().map(render_step).collect()
    }
}

fn render_step(step: &FetchStep) -> String {
    match step {
        FetchStep::Request {
            symbol,
            period,
            adjust,
            today_only,
        } => format!(
            "[fetch] 请求: symbol={}, period={}, adjust={}, only_today={}",
            symbol,
            period,
            adjust.as_param(),
            today_only
        ),
        FetchStep::AttemptFailed { attempt, error } => {
            let short: String = error.chars().take(100).collect();
            format!("[fetch] 第{}次尝试失败: {}", attempt, short)
        }
        FetchStep::RetryScheduled { wait, .. } => {
            format!("[fetch] 等待{}秒后重试", wait.as_secs_f64())
        }
        FetchStep::RetriesExhausted => "[fetch] 所有重试均失败".to_string(),
        FetchStep::FallbackWithoutAdjust => "[fetch] 改用不复权数据重试".to_string(),
        FetchStep::FinalFailure { error } => format!("[fetch] 最终失败: {}", error),
        FetchStep::NonTransientError { error } => format!("[fetch] 其他错误: {}", error),
        FetchStep::EmptyResult => "[fetch] 数据源返回空数据".to_string(),
        FetchStep::RawRows { rows } => format!("[fetch] 原始行数: {}", rows),
        FetchStep::NanIncrease { column, added } => {
            format!("[fetch] 列{} 转为数值后 NaN 增加: +{}", column, added)
        }
        FetchStep::DroppedTimestamps { count } => {
            format!("[fetch] 无法解析时间, 丢弃 {} 行", count)
        }
        FetchStep::DuplicateTimestamps { count } => {
            format!("[fetch] 重复时间, 合并 {} 行", count)
        }
        FetchStep::Cleaned { rows } => format!("[fetch] 清洗后行数: {}", rows),
        FetchStep::TodayFilter { rows, first, last } => format!(
            "[fetch] 仅今日过滤后行数: {}, 时间范围: {} ~ {}",
            rows,
            format_opt(first),
            format_opt(last)
        ),
    }
}

fn format_opt(ts: &Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format(DISPLAY_DATETIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}
