// ==========================================
// 连续流排产系统 - 分配记录与排产结果
// ==========================================
// 红线: 分配记录只累加不回退，唯一例外是重排时的显式清除
// ==========================================

use crate::domain::types::{DeadlineStatus, RunStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// DailyAllocation - 单日分配
// ==========================================
// 引擎的最小产出单元: (工单, 工序, 日期, 数量)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAllocation {
    pub order_id: String,
    pub sector: String,
    pub plan_date: NaiveDate,
    pub quantity: i64,
}

impl DailyAllocation {
    pub fn new(order_id: &str, sector: &str, plan_date: NaiveDate, quantity: i64) -> Self {
        Self {
            order_id: order_id.to_string(),
            sector: sector.to_string(),
            plan_date,
            quantity,
        }
    }
}

// ==========================================
// SchedulingResult - 工单排产结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingResult {
    pub order_id: String,
    pub first_day: Option<NaiveDate>, // 首个有产出的日期
    pub last_day: Option<NaiveDate>,  // 最后一个有产出的日期
    pub delay: u32,                   // 延误计数
    pub status: RunStatus,
    pub replanned: bool, // 是否经过优先工序重排
}

impl SchedulingResult {
    pub fn deadline_status(&self, delivery_date: NaiveDate) -> DeadlineStatus {
        DeadlineStatus::evaluate(self.last_day, delivery_date)
    }
}
