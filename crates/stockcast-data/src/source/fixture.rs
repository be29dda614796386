//! 테스트용 고정 데이터 소스.
//!
//! 미리 정해 둔 실패 순서를 먼저 반환한 뒤 고정된 행을 반환합니다.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use std::collections::VecDeque;
use std::sync::Mutex;

use stockcast_core::{Adjust, BarPeriod, Symbol};

use super::{CompanyInfoSource, MarketDataSource, RawBar};
use crate::error::{DataError, Result};

/// 기록된 호출 하나.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub symbol: String,
    pub period: BarPeriod,
    pub adjust: Adjust,
}

/// 고정 분봉 소스.
pub struct StaticMarketSource {
    rows: Vec<RawBar>,
    script: Mutex<VecDeque<Result<Vec<RawBar>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StaticMarketSource {
    /// 항상 `rows`를 반환하는 소스를 생성합니다.
    pub fn new(rows: Vec<RawBar>) -> Self {
        Self {
            rows,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `start`부터 `period` 간격으로 종가 시계열을 생성합니다.
    pub fn with_closes(start: NaiveDateTime, period: BarPeriod, closes: &[f64]) -> Self {
        let step = ChronoDuration::minutes(i64::from(period.minutes()));
        let rows = closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let ts = start + step * i as i32;
                RawBar::ohlcv(
                    ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                    [*close, *close, *close, *close, 1000.0],
                )
            })
            .collect();
        Self::new(rows)
    }

    /// 정상 응답 전에 반환할 결과를 순서대로 지정합니다.
    pub fn with_script(self, script: Vec<Result<Vec<RawBar>>>) -> Self {
        if let Ok(mut queue) = self.script.lock() {
            queue.extend(script);
        }
        self
    }

    /// 지정한 오류들을 먼저 반환하도록 합니다.
    pub fn with_failures(self, failures: Vec<DataError>) -> Self {
        self.with_script(failures.into_iter().map(Err).collect())
    }

    /// 지금까지의 호출 목록.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MarketDataSource for StaticMarketSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_minute_bars(
        &self,
        symbol: &str,
        period: BarPeriod,
        adjust: Adjust,
    ) -> Result<Vec<RawBar>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                symbol: symbol.to_string(),
                period,
                adjust,
            });
        }

        let scripted = self.script.lock().ok().and_then(|mut q| q.pop_front());
        match scripted {
            Some(result) => result,
            None => Ok(self.rows.clone()),
        }
    }
}

/// 고정 종목명 소스.
pub struct StaticCompanySource {
    name: Option<String>,
    failures: Mutex<VecDeque<DataError>>,
    calls: Mutex<usize>,
}

impl StaticCompanySource {
    /// 항상 `name`을 반환하는 소스를 생성합니다.
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
        }
    }

    /// 지정한 오류들을 먼저 반환하도록 합니다.
    pub fn with_failures(self, failures: Vec<DataError>) -> Self {
        if let Ok(mut queue) = self.failures.lock() {
            queue.extend(failures);
        }
        self
    }

    /// 호출 횟수.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }
}

#[async_trait]
impl CompanyInfoSource for StaticCompanySource {
    async fn company_name(&self, _symbol: &Symbol) -> Result<Option<String>> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        match self.failures.lock().ok().and_then(|mut q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(self.name.clone()),
        }
    }
}
