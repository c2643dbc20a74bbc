// ==========================================
// 连续流排产系统 - 批量排产编排器
// ==========================================
// 用途: 按顺序逐单执行 路由 → 分配 → 优先重排 → 汇总
// 红线:
//   1. 工单严格串行，前单占用的产能对后单立即可见
//   2. 单个工单失败只记录到该工单，批次继续
// ==========================================

use crate::config::PlanningParameters;
use crate::domain::{DailyAllocation, Pipeline, SchedulingResult, WorkOrder};
use crate::engine::aggregator::ResultAggregator;
use crate::engine::capacity::SectorCapacityModel;
use crate::engine::error::{PlanningError, PlanningResult};
use crate::engine::flow::{ContinuousFlowEngine, FlowPlan, FlowStage, PipelineRun, PriorityRule};
use crate::engine::ports::{AllocationStore, CalendarProvider, RetryDecider, SectorLimitStore};
use crate::engine::replanner::{PriorityReplanner, ReplanDecision};
use crate::engine::router::CutTypeRouter;
use crate::repository::error::RepositoryResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// OrderOutcome / BatchReport - 批次输出
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOutcome {
    pub order: WorkOrder,
    pub result: Option<SchedulingResult>, // 失败时为 None
    pub error: Option<String>,
    pub replan: Option<ReplanDecision>,
    pub allocations: Vec<DailyAllocation>, // 该工单在账本中的全部分配
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub outcomes: Vec<OrderOutcome>,
}

impl BatchReport {
    pub fn completed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                o.result
                    .as_ref()
                    .map(|r| r.status == crate::domain::RunStatus::Completed)
                    .unwrap_or(false)
            })
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_none()).count()
    }

    pub fn outcome(&self, order_id: &str) -> Option<&OrderOutcome> {
        self.outcomes.iter().find(|o| o.order.order_id == order_id)
    }
}

// ==========================================
// BatchPlanner - 批量排产编排器
// ==========================================
pub struct BatchPlanner<S, C>
where
    S: AllocationStore,
    C: CalendarProvider,
{
    store: Arc<S>,
    calendar: Arc<C>,
    pipeline: Pipeline,
    params: PlanningParameters,
    capacity: SectorCapacityModel,
    decider: Arc<dyn RetryDecider>,
    engine: ContinuousFlowEngine,
    replanner: PriorityReplanner,
}

impl<S, C> BatchPlanner<S, C>
where
    S: AllocationStore,
    C: CalendarProvider,
{
    /// 使用已就绪的产能模型创建编排器
    pub fn new(
        store: Arc<S>,
        calendar: Arc<C>,
        pipeline: Pipeline,
        params: PlanningParameters,
        capacity: SectorCapacityModel,
        decider: Arc<dyn RetryDecider>,
    ) -> Self {
        Self {
            engine: ContinuousFlowEngine::new(params.horizon_days),
            replanner: PriorityReplanner::new(params.priority.delta_days),
            store,
            calendar,
            pipeline,
            params,
            capacity,
            decider,
        }
    }

    /// 写入本批上限并创建编排器
    pub fn prepare<L>(
        store: Arc<S>,
        limits: &L,
        calendar: Arc<C>,
        pipeline: Pipeline,
        params: PlanningParameters,
        decider: Arc<dyn RetryDecider>,
    ) -> RepositoryResult<Self>
    where
        L: SectorLimitStore + ?Sized,
    {
        let capacity = SectorCapacityModel::prepare(&pipeline, &params, limits)?;
        Ok(Self::new(store, calendar, pipeline, params, capacity, decider))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// 工单 → 路线与产能
    pub fn build_plan(&self, order: &WorkOrder) -> PlanningResult<FlowPlan> {
        if order.quantity <= 0 {
            return Err(PlanningError::InvalidQuantity {
                order_id: order.order_id.clone(),
                quantity: order.quantity,
            });
        }

        let start_idx = self
            .pipeline
            .index_of(&order.start_sector)
            .ok_or_else(|| PlanningError::UnknownSector {
                order_id: order.order_id.clone(),
                sector: order.start_sector.clone(),
            })?;

        let route = CutTypeRouter::route(self.pipeline.from_index(start_idx), order.cut_type);
        if route.is_empty() {
            return Err(PlanningError::EmptyRoute {
                order_id: order.order_id.clone(),
            });
        }

        let stages = route
            .into_iter()
            .map(|sector| FlowStage {
                capacity: self.capacity.capacity_of(&sector),
                sector,
            })
            .collect();

        let mut plan = FlowPlan::new(order.clone(), stages);
        if self.params.priority.enabled {
            plan = plan.with_priority(PriorityRule {
                sector_name: self.params.priority.sector_name.clone(),
                weekdays: self.params.priority.weekdays,
            });
        }
        Ok(plan)
    }

    /// 排一个工单
    ///
    /// 同一工单号再次排产时先清除其旧分配
    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    pub fn plan_order(&self, order: &WorkOrder) -> PlanningResult<(PipelineRun, ReplanDecision)> {
        let plan = self.build_plan(order)?;

        for sector in self.pipeline.sectors() {
            self.store.clear_allocations(&order.order_id, &sector.name)?;
        }

        let run = self
            .engine
            .run(&plan, self.store.as_ref(), self.calendar.as_ref());
        match self.replanner.review(
            &self.engine,
            &plan,
            run,
            self.store.as_ref(),
            self.calendar.as_ref(),
            self.decider.as_ref(),
        ) {
            Ok(reviewed) => Ok(reviewed),
            Err(e) => {
                // 重排清除中途失败: 撤掉该工单的全部分配，不占用后续工单的产能
                self.release_order(&order.order_id);
                Err(e.into())
            }
        }
    }

    /// 尽力清除工单在所有工序上的分配，失败只告警
    fn release_order(&self, order_id: &str) {
        for sector in self.pipeline.sectors() {
            if let Err(e) = self.store.clear_allocations(order_id, &sector.name) {
                warn!(order_id, sector = %sector.name, error = %e, "清除工单分配失败");
            }
        }
    }

    /// 按给定顺序排整批工单
    pub fn plan_batch(&self, orders: &[WorkOrder]) -> BatchReport {
        let batch_id = uuid::Uuid::new_v4().to_string();
        info!(batch_id = %batch_id, orders = orders.len(), "批量排产开始");

        let outcomes: Vec<OrderOutcome> = orders
            .iter()
            .map(|order| match self.plan_order(order) {
                Ok((run, decision)) => {
                    let result = ResultAggregator::aggregate(&run);
                    info!(
                        order_id = %order.order_id,
                        first_day = ?result.first_day,
                        last_day = ?result.last_day,
                        delay = result.delay,
                        status = %result.status,
                        "工单排产完成"
                    );
                    let allocations = match self.store.allocations_for_order(&order.order_id) {
                        Ok(rows) => rows,
                        Err(e) => {
                            warn!(order_id = %order.order_id, error = %e, "读取工单分配失败，使用本次运行记录");
                            run.allocations.clone()
                        }
                    };
                    OrderOutcome {
                        order: order.clone(),
                        result: Some(result),
                        error: None,
                        replan: Some(decision),
                        allocations,
                    }
                }
                Err(e) => {
                    warn!(order_id = %order.order_id, error = %e, "工单排产失败，继续下一工单");
                    let allocations = match self.store.allocations_for_order(&order.order_id) {
                        Ok(rows) => rows,
                        Err(read_err) => {
                            warn!(order_id = %order.order_id, error = %read_err, "读取工单分配失败");
                            Vec::new()
                        }
                    };
                    OrderOutcome {
                        order: order.clone(),
                        result: None,
                        error: Some(e.to_string()),
                        replan: None,
                        allocations,
                    }
                }
            })
            .collect();

        let report = BatchReport { batch_id, outcomes };
        info!(
            batch_id = %report.batch_id,
            completed = report.completed_count(),
            failed = report.failed_count(),
            "批量排产结束"
        );
        report
    }
}
