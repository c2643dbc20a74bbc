// ==========================================
// 连续流排产系统 - 应用层
// ==========================================
// 职责: 仓储装配、批量排产用例、人工决策适配
// ==========================================

pub mod decider;
pub mod state;

pub use decider::{FixedRetryDecider, PromptRetryDecider};
pub use state::{get_default_db_path, AppState};
