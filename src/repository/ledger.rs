// ==========================================
// 连续流排产系统 - 内存产能账本
// ==========================================
// 用途: 不落库的试算、合成流水线测试
// 键: (工单, 工序, 日期)，写入为覆盖语义
// ==========================================

use crate::domain::{Ceiling, DailyAllocation};
use crate::engine::ports::{AllocationStore, SectorLimitStore};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

type CellKey = (String, String, NaiveDate);

#[derive(Debug, Default)]
pub struct CapacityLedger {
    cells: Mutex<BTreeMap<CellKey, i64>>,
    limits: Mutex<HashMap<String, Ceiling>>,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn cells(&self) -> RepositoryResult<MutexGuard<'_, BTreeMap<CellKey, i64>>> {
        self.cells
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn limits(&self) -> RepositoryResult<MutexGuard<'_, HashMap<String, Ceiling>>> {
        self.limits
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 账本中全部分配（按工单、工序、日期排序）
    pub fn all_allocations(&self) -> RepositoryResult<Vec<DailyAllocation>> {
        Ok(self
            .cells()?
            .iter()
            .map(|((order_id, sector, date), qty)| DailyAllocation::new(order_id, sector, *date, *qty))
            .collect())
    }

    /// 预置他单占用（模拟历史批次）
    pub fn seed(&self, order_id: &str, sector: &str, date: NaiveDate, quantity: i64) -> RepositoryResult<()> {
        self.write_allocation(&DailyAllocation::new(order_id, sector, date, quantity))
    }
}

impl AllocationStore for CapacityLedger {
    fn already_planned(&self, sector: &str, date: NaiveDate) -> RepositoryResult<i64> {
        Ok(self
            .cells()?
            .iter()
            .filter(|((_, s, d), _)| s == sector && *d == date)
            .map(|(_, qty)| *qty)
            .sum())
    }

    fn write_allocation(&self, allocation: &DailyAllocation) -> RepositoryResult<()> {
        self.cells()?.insert(
            (
                allocation.order_id.clone(),
                allocation.sector.clone(),
                allocation.plan_date,
            ),
            allocation.quantity,
        );
        Ok(())
    }

    fn clear_allocations(&self, order_id: &str, sector: &str) -> RepositoryResult<usize> {
        let mut cells = self.cells()?;
        let before = cells.len();
        cells.retain(|(o, s, _), _| !(o == order_id && s == sector));
        Ok(before - cells.len())
    }

    fn allocations_for_order(&self, order_id: &str) -> RepositoryResult<Vec<DailyAllocation>> {
        let mut rows: Vec<DailyAllocation> = self
            .cells()?
            .iter()
            .filter(|((o, _, _), _)| o == order_id)
            .map(|((o, s, d), qty)| DailyAllocation::new(o, s, *d, *qty))
            .collect();
        rows.sort_by(|a, b| a.plan_date.cmp(&b.plan_date).then_with(|| a.sector.cmp(&b.sector)));
        Ok(rows)
    }
}

impl SectorLimitStore for CapacityLedger {
    fn read_limit(&self, sector: &str) -> RepositoryResult<Option<Ceiling>> {
        Ok(self.limits()?.get(sector).copied())
    }

    fn write_limit(&self, sector: &str, ceiling: Ceiling) -> RepositoryResult<()> {
        self.limits()?.insert(sector.to_string(), ceiling);
        Ok(())
    }
}
