// ==========================================
// 连续流排产系统 - 引擎层外部接口
// ==========================================
// 职责: 定义引擎依赖的外部协作者 trait，实现依赖倒置
// 说明: Engine 层定义 trait，Repository / App 层实现适配器
// ==========================================

use crate::domain::{Ceiling, DailyAllocation, WorkCalendar, WorkOrder};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;

// ==========================================
// AllocationStore - 共享产能账本
// ==========================================
// 以 (工序, 日期) 为键汇总所有工单的已排数量
// 写入语义为“覆盖”: 同一 (工单, 工序, 日期) 再次写入替换原值
pub trait AllocationStore {
    /// 某工序某日已排数量（全部工单合计）
    fn already_planned(&self, sector: &str, date: NaiveDate) -> RepositoryResult<i64>;

    /// 写入单日分配（覆盖语义）
    fn write_allocation(&self, allocation: &DailyAllocation) -> RepositoryResult<()>;

    /// 清除某工单在某工序上的全部分配，返回清除条数
    fn clear_allocations(&self, order_id: &str, sector: &str) -> RepositoryResult<usize>;

    /// 某工单的全部分配，按日期、工序排序
    fn allocations_for_order(&self, order_id: &str) -> RepositoryResult<Vec<DailyAllocation>>;
}

// ==========================================
// CalendarProvider - 工作日历
// ==========================================
pub trait CalendarProvider {
    /// start 当天（若为工作日）及之后的前 count 个工作日，升序
    fn working_days_from(&self, start: NaiveDate, count: usize) -> RepositoryResult<Vec<NaiveDate>>;
}

impl CalendarProvider for WorkCalendar {
    fn working_days_from(&self, start: NaiveDate, count: usize) -> RepositoryResult<Vec<NaiveDate>> {
        Ok(WorkCalendar::working_days_from(self, start, count))
    }
}

// ==========================================
// SectorLimitStore - 工序日产能上限区
// ==========================================
// 每次批量排产开始时按负荷系数写入一次，之后只读
pub trait SectorLimitStore {
    /// 读取工序上限，None 表示尚未写入
    fn read_limit(&self, sector: &str) -> RepositoryResult<Option<Ceiling>>;

    fn write_limit(&self, sector: &str, ceiling: Ceiling) -> RepositoryResult<()>;
}

// ==========================================
// RetryDecider - 人工决策
// ==========================================
// 优先工序重排前的唯一人工确认点
pub trait RetryDecider {
    /// 是否取消星期限制重新排优先工序
    ///
    /// # 参数
    /// - order: 当前工单
    /// - diff_days: 交期减去优先工序最后产出日的天数
    fn ask_retry_without_priority(&self, order: &WorkOrder, diff_days: i64) -> bool;
}
