// ==========================================
// 连续流排产系统 - 排产错误类型
// ==========================================
// 红线: 单个工单的错误只影响该工单，批次继续
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("工单 {order_id} 的起始工序不存在: {sector}")]
    UnknownSector { order_id: String, sector: String },

    #[error("工单 {order_id} 的数量必须为正整数: {quantity}")]
    InvalidQuantity { order_id: String, quantity: i64 },

    #[error("工单 {order_id} 路由后没有可排工序")]
    EmptyRoute { order_id: String },

    #[error("仓储错误: {0}")]
    Repository(#[from] RepositoryError),
}

pub type PlanningResult<T> = Result<T, PlanningError>;
