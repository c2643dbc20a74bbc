// ==========================================
// 连续流排产系统 - 优先工序重排
// ==========================================
// 触发: 优先模式开启，且优先工序在工单路线内
// 判定: diff = 交期 - 优先工序最后产出日；diff ≤ 阈值时询问是否取消星期限制
// 重排:
//   1) 清除该工单在优先工序及其下游工序的全部分配
//   2) 上游工序按原方案回放（已在账本中，不重复写入）
//   3) 取消星期限制重跑，结果标记 replanned
// ==========================================

use crate::engine::flow::{ContinuousFlowEngine, FlowPlan, PipelineRun, ReplayPrefix};
use crate::engine::ports::{AllocationStore, CalendarProvider, RetryDecider};
use crate::repository::error::RepositoryResult;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 重排审查结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind")]
pub enum ReplanDecision {
    NotApplicable,              // 未开启优先模式或路线不含优先工序
    WithinMargin { diff: i64 }, // 余量充足，保持原方案
    Declined { diff: i64 },     // 人工拒绝重排
    Replanned { diff: i64 },    // 已取消星期限制重排
}

pub struct PriorityReplanner {
    delta_days: i64,
}

impl PriorityReplanner {
    pub fn new(delta_days: i64) -> Self {
        Self { delta_days }
    }

    /// 审查一次运行结果，必要时重排
    ///
    /// # 返回
    /// - (最终运行结果, 审查结论)
    /// - Err: 清除旧分配失败
    #[instrument(skip_all, fields(order_id = %plan.order.order_id))]
    pub fn review<S, C>(
        &self,
        engine: &ContinuousFlowEngine,
        plan: &FlowPlan,
        run: PipelineRun,
        store: &S,
        calendar: &C,
        decider: &dyn RetryDecider,
    ) -> RepositoryResult<(PipelineRun, ReplanDecision)>
    where
        S: AllocationStore + ?Sized,
        C: CalendarProvider + ?Sized,
    {
        let rule = match plan.priority.as_ref() {
            Some(rule) => rule,
            None => return Ok((run, ReplanDecision::NotApplicable)),
        };
        let idx = match plan.stages.iter().position(|s| rule.applies_to(&s.sector)) {
            Some(idx) => idx,
            None => return Ok((run, ReplanDecision::NotApplicable)),
        };

        let reference = match run.sectors[idx]
            .last_output_day()
            .or(run.last_processed_day)
        {
            Some(day) => day,
            None => return Ok((run, ReplanDecision::NotApplicable)),
        };

        let diff = (plan.order.delivery_date - reference).num_days();
        if diff > self.delta_days {
            return Ok((run, ReplanDecision::WithinMargin { diff }));
        }

        tracing::info!(
            sector = %rule.sector_name,
            reference_day = %reference,
            delivery_date = %plan.order.delivery_date,
            diff,
            delta_days = self.delta_days,
            "优先工序交期余量不足，等待人工决策"
        );

        if !decider.ask_retry_without_priority(&plan.order, diff) {
            return Ok((run, ReplanDecision::Declined { diff }));
        }

        let mut cleared = 0;
        for stage in &plan.stages[idx..] {
            cleared += store.clear_allocations(&plan.order.order_id, &stage.sector.name)?;
        }

        let replay = ReplayPrefix {
            outputs: run.sectors[..idx]
                .iter()
                .map(|s| s.daily_output.clone())
                .collect(),
        };
        let retry_plan = FlowPlan {
            order: plan.order.clone(),
            stages: plan.stages.clone(),
            priority: None,
            replay: Some(replay),
        };

        let mut rerun = engine.run(&retry_plan, store, calendar);
        rerun.replanned = true;

        tracing::info!(
            cleared,
            status = %rerun.status,
            last_day = ?rerun.last_day,
            "优先工序已取消星期限制重排"
        );

        Ok((rerun, ReplanDecision::Replanned { diff }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::decider::FixedRetryDecider;
    use crate::domain::{CutType, RunStatus, Sector, WorkCalendar, WorkOrder};
    use crate::engine::capacity::SectorCapacity;
    use crate::engine::flow::{FlowStage, PriorityRule};
    use crate::repository::CapacityLedger;
    use chrono::{NaiveDate, Weekday};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    // PCP(不限) → Estampa(上限 10) → Costura(上限 10)
    fn plan(delivery: NaiveDate) -> FlowPlan {
        let order = WorkOrder::new("P1", 20, CutType::Manual, "PCP", d(1), delivery);
        FlowPlan::new(
            order,
            vec![
                FlowStage {
                    sector: Sector::unlimited("PCP"),
                    capacity: SectorCapacity::unlimited(),
                },
                FlowStage {
                    sector: Sector::limited("Estampa"),
                    capacity: SectorCapacity::limited(10, 10.0),
                },
                FlowStage {
                    sector: Sector::limited("Costura"),
                    capacity: SectorCapacity::limited(10, 10.0),
                },
            ],
        )
        .with_priority(PriorityRule {
            sector_name: "Estampa".to_string(),
            weekdays: [Weekday::Tue, Weekday::Thu],
        })
    }

    fn estampa_total(ledger: &CapacityLedger) -> i64 {
        ledger
            .allocations_for_order("P1")
            .unwrap()
            .iter()
            .filter(|a| a.sector == "Estampa")
            .map(|a| a.quantity)
            .sum()
    }

    #[test]
    fn test_accept_replans_without_weekday_limit() {
        let ledger = CapacityLedger::new();
        let calendar = WorkCalendar::every_day(d(1), 60);
        let engine = ContinuousFlowEngine::new(90);
        let plan = plan(d(5));

        // 受限: Estampa 01-02(二) 10, 01-04(四) 10
        let run = engine.run(&plan, &ledger, &calendar);
        assert_eq!(run.sector("Estampa").unwrap().last_output_day(), Some(d(4)));

        let (rerun, decision) = PriorityReplanner::new(5)
            .review(&engine, &plan, run, &ledger, &calendar, &FixedRetryDecider::accept())
            .unwrap();

        assert_eq!(decision, ReplanDecision::Replanned { diff: 1 });
        assert!(rerun.replanned);
        assert_eq!(rerun.status, RunStatus::Completed);
        // 不限制: Estampa 01-02 10, 01-03 10
        assert_eq!(rerun.sector("Estampa").unwrap().last_output_day(), Some(d(3)));
        assert_eq!(estampa_total(&ledger), 20);
        assert_eq!(rerun.first_day, Some(d(1)));
        assert_eq!(rerun.last_day, Some(d(4)));
    }

    #[test]
    fn test_decline_keeps_original() {
        let ledger = CapacityLedger::new();
        let calendar = WorkCalendar::every_day(d(1), 60);
        let engine = ContinuousFlowEngine::new(90);
        let plan = plan(d(5));

        let run = engine.run(&plan, &ledger, &calendar);
        let original = run.clone();
        let (kept, decision) = PriorityReplanner::new(5)
            .review(&engine, &plan, run, &ledger, &calendar, &FixedRetryDecider::decline())
            .unwrap();

        assert_eq!(decision, ReplanDecision::Declined { diff: 1 });
        assert_eq!(kept, original);
        assert_eq!(estampa_total(&ledger), 20);
    }

    #[test]
    fn test_enough_margin_skips_question() {
        let ledger = CapacityLedger::new();
        let calendar = WorkCalendar::every_day(d(1), 60);
        let engine = ContinuousFlowEngine::new(90);
        let plan = plan(d(30));

        let run = engine.run(&plan, &ledger, &calendar);
        let (_, decision) = PriorityReplanner::new(5)
            .review(&engine, &plan, run, &ledger, &calendar, &FixedRetryDecider::accept())
            .unwrap();

        assert_eq!(decision, ReplanDecision::WithinMargin { diff: 26 });
    }
}
