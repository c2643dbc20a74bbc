// ==========================================
// 连续流排产系统 - 引擎层
// ==========================================
// 职责: 实现排产规则,不拼 SQL
// 红线: Engine 只通过 ports 中的 trait 访问账本与日历
// ==========================================

pub mod aggregator;
pub mod batch_order;
pub mod capacity;
pub mod error;
pub mod flow;
pub mod orchestrator;
pub mod ports;
pub mod replanner;
pub mod router;
pub mod sequencer;

// 重导出核心引擎
pub use aggregator::ResultAggregator;
pub use batch_order::BatchOrdering;
pub use capacity::{SectorCapacity, SectorCapacityModel};
pub use error::{PlanningError, PlanningResult};
pub use flow::{
    ContinuousFlowEngine, FlowPlan, FlowStage, PipelineRun, PriorityRule, ReplayPrefix,
    SectorProgress,
};
pub use orchestrator::{BatchPlanner, BatchReport, OrderOutcome};
pub use ports::{AllocationStore, CalendarProvider, RetryDecider, SectorLimitStore};
pub use replanner::{PriorityReplanner, ReplanDecision};
pub use router::CutTypeRouter;
pub use sequencer::{next_working_days, WorkingDaySequencer, WorkingDays};
