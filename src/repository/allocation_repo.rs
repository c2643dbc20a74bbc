// ==========================================
// 连续流排产系统 - 单日分配数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 存储: daily_allocation 表，主键 (order_id, sector_name, plan_date)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::DailyAllocation;
use crate::engine::ports::AllocationStore;
use crate::repository::error::{parse_db_date, RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// AllocationRepository - 分配仓储
// ==========================================
pub struct AllocationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AllocationRepository {
    /// 打开数据库文件创建仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_rows(
        stmt: &mut rusqlite::Statement<'_>,
        params: impl rusqlite::Params,
    ) -> RepositoryResult<Vec<DailyAllocation>> {
        let raw = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(order_id, sector, plan_date, quantity)| {
                Ok(DailyAllocation {
                    order_id,
                    sector,
                    plan_date: parse_db_date("plan_date", &plan_date)?,
                    quantity,
                })
            })
            .collect()
    }

    /// 某工序的全部分配（用于按工序导出报表）
    pub fn list_by_sector(&self, sector: &str) -> RepositoryResult<Vec<DailyAllocation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT order_id, sector_name, plan_date, quantity
            FROM daily_allocation
            WHERE sector_name = ?1 AND quantity > 0
            ORDER BY plan_date, order_id
            "#,
        )?;
        Self::map_rows(&mut stmt, params![sector])
    }

    /// 删除某工单的全部分配，返回删除条数
    pub fn delete_by_order(&self, order_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM daily_allocation WHERE order_id = ?1",
            params![order_id],
        )?;
        Ok(affected)
    }
}

impl AllocationStore for AllocationRepository {
    fn already_planned(&self, sector: &str, date: NaiveDate) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let total: i64 = conn.query_row(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM daily_allocation
            WHERE sector_name = ?1 AND plan_date = ?2
            "#,
            params![sector, date.format("%Y-%m-%d").to_string()],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    fn write_allocation(&self, allocation: &DailyAllocation) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO daily_allocation (order_id, sector_name, plan_date, quantity)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(order_id, sector_name, plan_date)
            DO UPDATE SET quantity = excluded.quantity, updated_at = datetime('now')
            "#,
            params![
                allocation.order_id,
                allocation.sector,
                allocation.plan_date.format("%Y-%m-%d").to_string(),
                allocation.quantity,
            ],
        )?;
        Ok(())
    }

    fn clear_allocations(&self, order_id: &str, sector: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM daily_allocation WHERE order_id = ?1 AND sector_name = ?2",
            params![order_id, sector],
        )?;
        Ok(affected)
    }

    fn allocations_for_order(&self, order_id: &str) -> RepositoryResult<Vec<DailyAllocation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT order_id, sector_name, plan_date, quantity
            FROM daily_allocation
            WHERE order_id = ?1
            ORDER BY plan_date, sector_name
            "#,
        )?;
        Self::map_rows(&mut stmt, params![order_id])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn repo() -> AllocationRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        AllocationRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_write_is_set_not_add() {
        let repo = repo();
        repo.write_allocation(&DailyAllocation::new("P1", "Costura", d(2), 20)).unwrap();
        repo.write_allocation(&DailyAllocation::new("P1", "Costura", d(2), 25)).unwrap();

        assert_eq!(repo.already_planned("Costura", d(2)).unwrap(), 25);
    }

    #[test]
    fn test_already_planned_sums_across_orders() {
        let repo = repo();
        repo.write_allocation(&DailyAllocation::new("P1", "Costura", d(2), 20)).unwrap();
        repo.write_allocation(&DailyAllocation::new("P2", "Costura", d(2), 7)).unwrap();
        repo.write_allocation(&DailyAllocation::new("P2", "Costura", d(3), 9)).unwrap();

        assert_eq!(repo.already_planned("Costura", d(2)).unwrap(), 27);
        assert_eq!(repo.already_planned("Costura", d(4)).unwrap(), 0);
        assert_eq!(repo.already_planned("Arremate", d(2)).unwrap(), 0);
    }

    #[test]
    fn test_clear_only_touches_one_order_and_sector() {
        let repo = repo();
        repo.write_allocation(&DailyAllocation::new("P1", "Estampa", d(2), 10)).unwrap();
        repo.write_allocation(&DailyAllocation::new("P1", "Estampa", d(3), 10)).unwrap();
        repo.write_allocation(&DailyAllocation::new("P1", "Costura", d(3), 5)).unwrap();
        repo.write_allocation(&DailyAllocation::new("P2", "Estampa", d(2), 4)).unwrap();

        assert_eq!(repo.clear_allocations("P1", "Estampa").unwrap(), 2);

        let remaining = repo.allocations_for_order("P1").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].sector, "Costura");
        assert_eq!(repo.already_planned("Estampa", d(2)).unwrap(), 4);
    }

    #[test]
    fn test_list_by_sector_and_delete_by_order() {
        let repo = repo();
        repo.write_allocation(&DailyAllocation::new("P2", "Costura", d(3), 5)).unwrap();
        repo.write_allocation(&DailyAllocation::new("P1", "Costura", d(2), 6)).unwrap();

        let rows = repo.list_by_sector("Costura").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].order_id, "P1");

        assert_eq!(repo.delete_by_order("P1").unwrap(), 1);
        assert_eq!(repo.list_by_sector("Costura").unwrap().len(), 1);
    }
}
