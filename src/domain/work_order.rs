// ==========================================
// 连续流排产系统 - 工单领域模型
// ==========================================
// 红线: 排产开始后工单不可变
// ==========================================

use crate::domain::types::CutType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// WorkOrder - 工单
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub order_id: String,         // 工单号（Pedido）
    pub delivery_date: NaiveDate, // 交期
    pub client: String,           // 客户
    pub product: String,          // 产品
    pub quantity: i64,            // 需求数量（正整数）
    pub cut_type: CutType,        // 裁剪方式
    pub start_sector: String,     // 起始工序
    pub start_date: NaiveDate,    // 起排日期
}

impl WorkOrder {
    /// 以最少字段创建工单，客户与产品留空
    pub fn new(
        order_id: &str,
        quantity: i64,
        cut_type: CutType,
        start_sector: &str,
        start_date: NaiveDate,
        delivery_date: NaiveDate,
    ) -> Self {
        Self {
            order_id: order_id.to_string(),
            delivery_date,
            client: String::new(),
            product: String::new(),
            quantity,
            cut_type,
            start_sector: start_sector.to_string(),
            start_date,
        }
    }

    pub fn with_client(mut self, client: &str, product: &str) -> Self {
        self.client = client.to_string();
        self.product = product.to_string();
        self
    }
}
