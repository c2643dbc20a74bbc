// ==========================================
// 连续流排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod allocation;
pub mod calendar;
pub mod sector;
pub mod types;
pub mod work_order;

// 重导出核心类型
pub use allocation::{DailyAllocation, SchedulingResult};
pub use calendar::{CalendarDay, WorkCalendar};
pub use sector::{sector_names, Pipeline, Sector};
pub use types::{Ceiling, CutType, DeadlineStatus, RunStatus, SectorKind};
pub use work_order::WorkOrder;
