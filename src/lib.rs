// ==========================================
// 连续流排产系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 工单逐日、逐工序的产能分配引擎
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 排产规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 排产参数
pub mod config;

// 报表层 - 工序报表与批次汇总
pub mod report;

// 应用层 - 仓储装配与人工决策
pub mod app;

// 数据库基础设施（连接初始化/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    Ceiling, CutType, DailyAllocation, DeadlineStatus, Pipeline, RunStatus, SchedulingResult,
    Sector, SectorKind, WorkCalendar, WorkOrder,
};

pub use engine::{
    BatchOrdering, BatchPlanner, BatchReport, ContinuousFlowEngine, CutTypeRouter,
    OrderOutcome, PipelineRun, PriorityReplanner, ResultAggregator, SectorCapacityModel,
    WorkingDaySequencer,
};

pub use config::{ConfigManager, PlanningParameters};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "连续流排产系统";
