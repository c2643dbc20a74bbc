// ==========================================
// 连续流排产系统 - 批次排序
// ==========================================
// 说明: 工单按提交顺序先到先得占用产能，排产前可重新排序
// 红线: 排序均为稳定升序
// ==========================================

use crate::domain::WorkOrder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchOrdering {
    #[default]
    AsSubmitted,        // 保持提交顺序
    ByDeliveryDate,     // 交期升序
    ByQuantity,         // 数量升序
    Manual(Vec<usize>), // 人工指定顺序（1 起的行号）
}

impl BatchOrdering {
    pub fn apply(&self, mut orders: Vec<WorkOrder>) -> Vec<WorkOrder> {
        match self {
            BatchOrdering::AsSubmitted => orders,
            BatchOrdering::ByDeliveryDate => {
                orders.sort_by_key(|o| o.delivery_date);
                orders
            }
            BatchOrdering::ByQuantity => {
                orders.sort_by_key(|o| o.quantity);
                orders
            }
            BatchOrdering::Manual(sequence) => {
                if !is_permutation(sequence, orders.len()) {
                    tracing::warn!(
                        sequence = ?sequence,
                        orders = orders.len(),
                        "人工顺序不是 1..=n 的排列，保持提交顺序"
                    );
                    return orders;
                }
                let mut slots: Vec<Option<WorkOrder>> = orders.into_iter().map(Some).collect();
                sequence
                    .iter()
                    .filter_map(|pos| slots[pos - 1].take())
                    .collect()
            }
        }
    }
}

fn is_permutation(sequence: &[usize], n: usize) -> bool {
    if sequence.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &pos in sequence {
        if pos == 0 || pos > n || seen[pos - 1] {
            return false;
        }
        seen[pos - 1] = true;
    }
    true
}

impl fmt::Display for BatchOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOrdering::AsSubmitted => write!(f, "as-submitted"),
            BatchOrdering::ByDeliveryDate => write!(f, "delivery"),
            BatchOrdering::ByQuantity => write!(f, "quantity"),
            BatchOrdering::Manual(seq) => {
                let joined: Vec<String> = seq.iter().map(|p| p.to_string()).collect();
                write!(f, "manual:{}", joined.join(","))
            }
        }
    }
}

impl FromStr for BatchOrdering {
    type Err = String;

    /// 解析排序方式: as-submitted | delivery | quantity | manual:3,1,2
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let lower = raw.to_lowercase();
        match lower.as_str() {
            "" | "as-submitted" | "submitted" => Ok(BatchOrdering::AsSubmitted),
            "delivery" | "entrega" => Ok(BatchOrdering::ByDeliveryDate),
            "quantity" | "qtd" => Ok(BatchOrdering::ByQuantity),
            _ => {
                let list = lower
                    .strip_prefix("manual:")
                    .ok_or_else(|| format!("无法识别的排序方式: {}", raw))?;
                list.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|t| !t.is_empty())
                    .map(|t| t.parse::<usize>().map_err(|_| format!("非法行号: {}", t)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(BatchOrdering::Manual)
            }
        }
    }
}
