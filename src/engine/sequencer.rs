// ==========================================
// 连续流排产系统 - 工作日序列器
// ==========================================
// 职责: 给定起始日期，按需逐块拉取工作日
// 红线: 序列有限（受前瞻窗口约束），无跨调用状态
// ==========================================

use crate::engine::ports::CalendarProvider;
use chrono::{Duration, NaiveDate};
use std::collections::VecDeque;

// ==========================================
// WorkingDaySequencer - 工作日序列器
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingDaySequencer {
    horizon: usize, // 最多产出的工作日数
    chunk: usize,   // 每次向日历请求的工作日数
}

impl WorkingDaySequencer {
    pub fn new(horizon: usize) -> Self {
        Self {
            horizon,
            chunk: horizon.max(1),
        }
    }

    /// 指定每次拉取块大小（限制在 [1, horizon]）
    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.clamp(1, self.horizon.max(1));
        self
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// start 当天（若为工作日）起的工作日序列，至多 min(count, horizon) 个
    ///
    /// 日历读取失败时序列提前结束，调用方按“无后续工作日”处理
    pub fn next_working_days<'a, C>(
        &self,
        calendar: &'a C,
        start: NaiveDate,
        count: usize,
    ) -> WorkingDays<'a, C>
    where
        C: CalendarProvider + ?Sized,
    {
        WorkingDays {
            calendar,
            cursor: Some(start),
            remaining: count.min(self.horizon),
            chunk: self.chunk,
            buffer: VecDeque::new(),
        }
    }
}

/// 一次性取出工作日列表
pub fn next_working_days<C>(calendar: &C, start: NaiveDate, count: usize) -> Vec<NaiveDate>
where
    C: CalendarProvider + ?Sized,
{
    WorkingDaySequencer::new(count)
        .next_working_days(calendar, start, count)
        .collect()
}

/// 估算前瞻块大小: 受限工序按 ceil(数量/上限) 计天，不限工序各计 1 天
pub fn lookahead_days(quantity: i64, ceilings: &[Option<i64>], horizon: usize) -> usize {
    let qty = quantity.max(0) as u64;
    let days: u64 = ceilings
        .iter()
        .map(|ceiling| match ceiling {
            Some(limit) if *limit > 0 => qty.div_ceil(*limit as u64),
            _ => 1,
        })
        .sum();
    (days.min(usize::MAX as u64) as usize).clamp(1, horizon.max(1))
}

// ==========================================
// WorkingDays - 惰性工作日迭代器
// ==========================================
pub struct WorkingDays<'a, C: ?Sized> {
    calendar: &'a C,
    cursor: Option<NaiveDate>, // 下一次拉取的起点，None 表示日历已耗尽
    remaining: usize,
    chunk: usize,
    buffer: VecDeque<NaiveDate>,
}

impl<'a, C> WorkingDays<'a, C>
where
    C: CalendarProvider + ?Sized,
{
    fn refill(&mut self) {
        let start = match self.cursor {
            Some(d) => d,
            None => return,
        };
        let want = self.chunk.min(self.remaining);

        match self.calendar.working_days_from(start, want) {
            Ok(days) => {
                if days.len() < want {
                    self.cursor = None;
                } else {
                    self.cursor = days.last().map(|last| *last + Duration::days(1));
                }
                self.buffer.extend(days.into_iter().filter(|d| *d >= start));
            }
            Err(e) => {
                tracing::warn!(start = %start, error = %e, "日历读取失败，工作日序列提前结束");
                self.cursor = None;
            }
        }
    }
}

impl<'a, C> Iterator for WorkingDays<'a, C>
where
    C: CalendarProvider + ?Sized,
{
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.remaining == 0 {
            return None;
        }
        if self.buffer.is_empty() {
            self.refill();
        }
        let day = self.buffer.pop_front()?;
        self.remaining -= 1;
        Some(day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WorkCalendar;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn test_includes_start_when_working() {
        let cal = WorkCalendar::weekdays(d(1, 1), 30);
        let days: Vec<_> = WorkingDaySequencer::new(90)
            .with_chunk(2)
            .next_working_days(&cal, d(1, 4), 4)
            .collect();

        // 2024-01-06/07 周末
        assert_eq!(days, vec![d(1, 4), d(1, 5), d(1, 8), d(1, 9)]);
    }

    #[test]
    fn test_bounded_by_horizon() {
        let cal = WorkCalendar::every_day(d(1, 1), 200);
        let days: Vec<_> = WorkingDaySequencer::new(10)
            .with_chunk(3)
            .next_working_days(&cal, d(1, 1), 500)
            .collect();
        assert_eq!(days.len(), 10);
        assert_eq!(days.last(), Some(&d(1, 10)));
    }

    #[test]
    fn test_empty_when_no_working_day_after_start() {
        let cal = WorkCalendar::every_day(d(1, 1), 5);
        assert!(next_working_days(&cal, d(2, 1), 5).is_empty());
    }

    #[test]
    fn test_restartable_from_later_start() {
        let cal = WorkCalendar::every_day(d(1, 1), 10);
        let seq = WorkingDaySequencer::new(90);

        let first: Vec<_> = seq.next_working_days(&cal, d(1, 1), 2).collect();
        let second: Vec<_> = seq.next_working_days(&cal, d(1, 5), 2).collect();

        assert_eq!(first, vec![d(1, 1), d(1, 2)]);
        assert_eq!(second, vec![d(1, 5), d(1, 6)]);
    }

    #[test]
    fn test_lookahead_days() {
        // 70/30 → 3 天，不限工序 1 天
        assert_eq!(lookahead_days(70, &[None, Some(30)], 90), 4);
        assert_eq!(lookahead_days(10_000, &[Some(1)], 90), 90);
        assert_eq!(lookahead_days(0, &[], 90), 1);
    }
}
