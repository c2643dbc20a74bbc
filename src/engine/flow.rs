// ==========================================
// 连续流排产系统 - 连续流分配引擎
// ==========================================
// 职责: 单个工单逐工作日、逐工序分配产量
// 红线:
//   1. 流量守恒: 工序当日可做量只来自上道工序前一工作日及以前的产出
//   2. 受限工序当日全部工单合计不超过上限
//   3. 末道工序累计达到需求即停止，绝不超产
// ==========================================
// 每日步骤:
//   1) 结转: 上道工序前一工作日产出 → 下道工序可做量
//   2) 按路线顺序逐工序分配（优先工序星期限制 / 余量 / 换型下限）
//   3) 当日无任何产出 → 延误 +1
//   4) 末道工序累计 ≥ 需求 → 完成
// ==========================================

use crate::domain::{DailyAllocation, RunStatus, Sector, WorkOrder};
use crate::engine::capacity::SectorCapacity;
use crate::engine::ports::{AllocationStore, CalendarProvider};
use crate::engine::sequencer::{lookahead_days, WorkingDaySequencer};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

// ==========================================
// 输入: FlowPlan
// ==========================================

/// 路线中的一道工序及其产能
#[derive(Debug, Clone, PartialEq)]
pub struct FlowStage {
    pub sector: Sector,
    pub capacity: SectorCapacity,
}

/// 优先工序星期限制
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityRule {
    pub sector_name: String,
    pub weekdays: [Weekday; 2],
}

impl PriorityRule {
    pub fn applies_to(&self, sector: &Sector) -> bool {
        self.sector_name.trim().eq_ignore_ascii_case(sector.name.trim())
    }

    pub fn allows(&self, day: NaiveDate) -> bool {
        self.weekdays.contains(&day.weekday())
    }
}

/// 重排时前缀工序按原方案回放（不写库、不校验产能）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayPrefix {
    pub outputs: Vec<BTreeMap<NaiveDate, i64>>, // 下标对应路线前缀工序
}

impl ReplayPrefix {
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowPlan {
    pub order: WorkOrder,
    pub stages: Vec<FlowStage>,
    pub priority: Option<PriorityRule>,
    pub replay: Option<ReplayPrefix>,
}

impl FlowPlan {
    pub fn new(order: WorkOrder, stages: Vec<FlowStage>) -> Self {
        Self {
            order,
            stages,
            priority: None,
            replay: None,
        }
    }

    pub fn with_priority(mut self, rule: PriorityRule) -> Self {
        self.priority = Some(rule);
        self
    }

    fn replayed_output(&self, stage_idx: usize, day: NaiveDate) -> Option<i64> {
        let replay = self.replay.as_ref()?;
        let outputs = replay.outputs.get(stage_idx)?;
        Some(outputs.get(&day).copied().unwrap_or(0))
    }
}

// ==========================================
// 输出: PipelineRun
// ==========================================

/// 单道工序的运行状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorProgress {
    pub name: String,
    pub available: i64,                          // 待做量
    pub accumulated: i64,                        // 累计产出
    pub daily_output: BTreeMap<NaiveDate, i64>, // 仅记录正产出日
}

impl SectorProgress {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            available: 0,
            accumulated: 0,
            daily_output: BTreeMap::new(),
        }
    }

    pub fn last_output_day(&self) -> Option<NaiveDate> {
        self.daily_output.keys().next_back().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub order_id: String,
    pub requested: i64,
    pub sectors: Vec<SectorProgress>,
    pub allocations: Vec<DailyAllocation>, // 本次运行新写入的分配
    pub delay: u32,
    pub priority_skips: u32,
    pub idle_days: u32,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub last_processed_day: Option<NaiveDate>,
    pub status: RunStatus,
    pub replanned: bool,
}

impl PipelineRun {
    fn start(plan: &FlowPlan) -> Self {
        let mut sectors: Vec<SectorProgress> = plan
            .stages
            .iter()
            .map(|stage| SectorProgress::new(&stage.sector.name))
            .collect();
        if let Some(first) = sectors.first_mut() {
            first.available = plan.order.quantity;
        }

        Self {
            order_id: plan.order.order_id.clone(),
            requested: plan.order.quantity,
            sectors,
            allocations: Vec::new(),
            delay: 0,
            priority_skips: 0,
            idle_days: 0,
            first_day: None,
            last_day: None,
            last_processed_day: None,
            status: RunStatus::Exhausted,
            replanned: false,
        }
    }

    /// 末道工序累计产出
    pub fn final_output(&self) -> i64 {
        self.sectors.last().map(|s| s.accumulated).unwrap_or(0)
    }

    pub fn sector(&self, name: &str) -> Option<&SectorProgress> {
        self.sectors.iter().find(|s| s.name == name)
    }

    fn record_output(&mut self, stage_idx: usize, day: NaiveDate, qty: i64) {
        let progress = &mut self.sectors[stage_idx];
        progress.available -= qty;
        progress.accumulated += qty;
        *progress.daily_output.entry(day).or_insert(0) += qty;

        if self.first_day.is_none() {
            self.first_day = Some(day);
        }
        self.last_day = Some(day);
    }
}

// ==========================================
// ContinuousFlowEngine - 连续流分配引擎
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct ContinuousFlowEngine {
    horizon_days: usize,
}

impl ContinuousFlowEngine {
    pub fn new(horizon_days: usize) -> Self {
        Self { horizon_days }
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_days
    }

    /// 运行一次完整分配
    ///
    /// # 参数
    /// - plan: 工单、路线、优先规则与回放前缀
    /// - store: 共享产能账本（读已排量、写分配）
    /// - calendar: 工作日历
    ///
    /// # 返回
    /// 终态 PipelineRun（Completed 或 Exhausted）
    #[instrument(skip(self, plan, store, calendar), fields(
        order_id = %plan.order.order_id,
        quantity = plan.order.quantity,
        stages = plan.stages.len()
    ))]
    pub fn run<S, C>(&self, plan: &FlowPlan, store: &S, calendar: &C) -> PipelineRun
    where
        S: AllocationStore + ?Sized,
        C: CalendarProvider + ?Sized,
    {
        let mut run = PipelineRun::start(plan);
        if plan.stages.is_empty() {
            return run;
        }

        let ceilings: Vec<Option<i64>> = plan
            .stages
            .iter()
            .map(|stage| stage.capacity.ceiling.limit())
            .collect();
        let chunk = lookahead_days(plan.order.quantity, &ceilings, self.horizon_days);
        let days = WorkingDaySequencer::new(self.horizon_days)
            .with_chunk(chunk)
            .next_working_days(calendar, plan.order.start_date, self.horizon_days);

        let last_idx = plan.stages.len() - 1;
        let mut previous_output: Option<Vec<i64>> = None;

        for day in days {
            // 1) 结转
            if let Some(prev) = previous_output.as_ref() {
                for i in 0..last_idx {
                    if prev[i] > 0 {
                        run.sectors[i + 1].available += prev[i];
                    }
                }
            }

            // 2) 逐工序分配
            let mut today_output = vec![0_i64; plan.stages.len()];
            for (idx, stage) in plan.stages.iter().enumerate() {
                let available = run.sectors[idx].available;
                if available <= 0 {
                    continue;
                }

                let qty = match plan.replayed_output(idx, day) {
                    Some(replayed) => replayed.clamp(0, available),
                    None => {
                        if let Some(rule) = plan.priority.as_ref() {
                            if rule.applies_to(&stage.sector) && !rule.allows(day) {
                                run.delay += 1;
                                run.priority_skips += 1;
                                tracing::debug!(sector = %stage.sector.name, plan_date = %day, "优先工序非指定星期，跳过");
                                continue;
                            }
                        }
                        self.allocate(&plan.order, stage, day, available, store, &mut run)
                    }
                };

                if qty > 0 {
                    run.record_output(idx, day, qty);
                    today_output[idx] = qty;
                }
            }

            run.last_processed_day = Some(day);

            // 3) 当日无产出
            if today_output.iter().all(|q| *q == 0) {
                run.delay += 1;
                run.idle_days += 1;
            }

            // 4) 完成判定
            if run.final_output() >= plan.order.quantity {
                run.status = RunStatus::Completed;
                break;
            }

            previous_output = Some(today_output);
        }

        if run.last_processed_day.is_none() {
            tracing::warn!(
                order_id = %plan.order.order_id,
                start_date = %plan.order.start_date,
                "日历中没有可用工作日，工单标记为 EXHAUSTED"
            );
        } else if run.status == RunStatus::Exhausted {
            tracing::warn!(
                order_id = %plan.order.order_id,
                produced = run.final_output(),
                requested = plan.order.quantity,
                "工作日窗口耗尽，工单未完成"
            );
        }

        run
    }

    /// 单工序单日分配，返回实际写入数量
    fn allocate<S>(
        &self,
        order: &WorkOrder,
        stage: &FlowStage,
        day: NaiveDate,
        available: i64,
        store: &S,
        run: &mut PipelineRun,
    ) -> i64
    where
        S: AllocationStore + ?Sized,
    {
        let sector = &stage.sector.name;
        let capacity = &stage.capacity;

        let qty = match capacity.ceiling.limit() {
            None => available,
            Some(limit) => {
                let planned = match store.already_planned(sector, day) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(sector = %sector, plan_date = %day, error = %e, "读取已排量失败，当日不分配");
                        return 0;
                    }
                };
                let headroom = (limit - planned).max(0);
                if capacity.below_setup(headroom) {
                    tracing::debug!(
                        sector = %sector,
                        plan_date = %day,
                        headroom,
                        setup_min = capacity.setup_min,
                        "余量低于换型下限，当日不分配"
                    );
                    return 0;
                }
                headroom.min(available)
            }
        };

        if qty <= 0 {
            return 0;
        }

        let allocation = DailyAllocation::new(&order.order_id, sector, day, qty);
        if let Err(e) = store.write_allocation(&allocation) {
            tracing::warn!(sector = %sector, plan_date = %day, qty, error = %e, "分配写入失败，按无产能处理");
            return 0;
        }

        tracing::debug!(sector = %sector, plan_date = %day, qty, "分配已写入");
        run.allocations.push(allocation);
        qty
    }
}
