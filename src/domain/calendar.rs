// ==========================================
// 连续流排产系统 - 工作日历领域模型
// ==========================================
// 红线: 排产引擎只读日历，不修改工作日标记
// ==========================================

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// CalendarDay - 日历日
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_working: bool,
}

// ==========================================
// WorkCalendar - 内存日历
// ==========================================
// 用途: CSV 直接加载的日历、测试用的合成日历
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkCalendar {
    days: BTreeMap<NaiveDate, bool>,
}

impl WorkCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_days<I>(days: I) -> Self
    where
        I: IntoIterator<Item = CalendarDay>,
    {
        Self {
            days: days.into_iter().map(|d| (d.date, d.is_working)).collect(),
        }
    }

    /// 从 start 起连续 span 个自然日全部为工作日
    pub fn every_day(start: NaiveDate, span: i64) -> Self {
        Self::build(start, span, |_| true)
    }

    /// 从 start 起连续 span 个自然日，周一到周五为工作日
    pub fn weekdays(start: NaiveDate, span: i64) -> Self {
        Self::build(start, span, |d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
    }

    fn build(start: NaiveDate, span: i64, is_working: impl Fn(NaiveDate) -> bool) -> Self {
        let days = (0..span.max(0))
            .map(|offset| start + Duration::days(offset))
            .map(|date| (date, is_working(date)))
            .collect();
        Self { days }
    }

    pub fn set(&mut self, date: NaiveDate, is_working: bool) {
        self.days.insert(date, is_working);
    }

    pub fn is_working(&self, date: NaiveDate) -> bool {
        self.days.get(&date).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn days(&self) -> impl Iterator<Item = CalendarDay> + '_ {
        self.days.iter().map(|(date, is_working)| CalendarDay {
            date: *date,
            is_working: *is_working,
        })
    }

    /// start 当天及之后的前 count 个工作日
    pub fn working_days_from(&self, start: NaiveDate, count: usize) -> Vec<NaiveDate> {
        self.days
            .range(start..)
            .filter(|(_, working)| **working)
            .map(|(date, _)| *date)
            .take(count)
            .collect()
    }
}
