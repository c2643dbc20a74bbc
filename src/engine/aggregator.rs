// ==========================================
// 连续流排产系统 - 结果汇总
// ==========================================
// 红线: 纯函数，不读写账本
// ==========================================

use crate::domain::SchedulingResult;
use crate::engine::flow::PipelineRun;

pub struct ResultAggregator;

impl ResultAggregator {
    pub fn aggregate(run: &PipelineRun) -> SchedulingResult {
        SchedulingResult {
            order_id: run.order_id.clone(),
            first_day: run.first_day,
            last_day: run.last_day,
            delay: run.delay,
            status: run.status,
            replanned: run.replanned,
        }
    }
}
