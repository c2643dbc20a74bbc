// ==========================================
// 连续流排产系统 - 配置层
// ==========================================
// 职责: 排产参数读取与导入
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod planning_config;

// 重导出核心配置管理器
pub use config_manager::ConfigManager;
pub use planning_config::{
    config_keys, default_sector_max, PlanningConfigReader, PlanningParameters, PriorityPolicy,
};
