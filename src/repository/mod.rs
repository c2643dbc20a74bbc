// ==========================================
// 连续流排产系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod allocation_repo;
pub mod calendar_repo;
pub mod error;
pub mod ledger;
pub mod sector_limit_repo;
pub mod work_order_repo;

// 重导出核心仓储
pub use allocation_repo::AllocationRepository;
pub use calendar_repo::CalendarRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use ledger::CapacityLedger;
pub use sector_limit_repo::SectorLimitRepository;
pub use work_order_repo::{WorkOrderRecord, WorkOrderRepository};
