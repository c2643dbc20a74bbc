// ==========================================
// 连续流排产系统 - 工单与排产结果仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 存储: work_order 表，一行同时保存工单与其排产结果
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::{RunStatus, SchedulingResult, WorkOrder};
use crate::repository::error::{parse_db_date, RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ==========================================
// WorkOrderRecord - 工单持久化记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderRecord {
    pub batch_id: Option<String>,
    pub order: WorkOrder,
    pub result: Option<SchedulingResult>, // 排产失败时为 None
    pub error_message: Option<String>,
}

// 数据库原始行，日期与枚举仍为字符串
struct RawRow {
    order_id: String,
    batch_id: Option<String>,
    delivery_date: String,
    client: String,
    product: String,
    quantity: i64,
    cut_type: String,
    start_sector: String,
    start_date: String,
    first_day: Option<String>,
    last_day: Option<String>,
    delay_days: Option<i64>,
    run_status: Option<String>,
    replanned: i64,
    error_message: Option<String>,
}

const SELECT_COLUMNS: &str = r#"
    SELECT order_id, batch_id, delivery_date, client, product, quantity, cut_type,
           start_sector, start_date, first_day, last_day, delay_days, run_status,
           replanned, error_message
    FROM work_order
"#;

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            order_id: row.get(0)?,
            batch_id: row.get(1)?,
            delivery_date: row.get(2)?,
            client: row.get(3)?,
            product: row.get(4)?,
            quantity: row.get(5)?,
            cut_type: row.get(6)?,
            start_sector: row.get(7)?,
            start_date: row.get(8)?,
            first_day: row.get(9)?,
            last_day: row.get(10)?,
            delay_days: row.get(11)?,
            run_status: row.get(12)?,
            replanned: row.get(13)?,
            error_message: row.get(14)?,
        })
    }

    fn into_record(self) -> RepositoryResult<WorkOrderRecord> {
        let cut_type = self
            .cut_type
            .parse()
            .map_err(|message| RepositoryError::FieldValueError {
                field: "cut_type".to_string(),
                message,
            })?;

        let order = WorkOrder {
            order_id: self.order_id.clone(),
            delivery_date: parse_db_date("delivery_date", &self.delivery_date)?,
            client: self.client,
            product: self.product,
            quantity: self.quantity,
            cut_type,
            start_sector: self.start_sector,
            start_date: parse_db_date("start_date", &self.start_date)?,
        };

        let result = match self.run_status {
            Some(status) => {
                let status: RunStatus =
                    status
                        .parse()
                        .map_err(|message| RepositoryError::FieldValueError {
                            field: "run_status".to_string(),
                            message,
                        })?;
                Some(SchedulingResult {
                    order_id: self.order_id,
                    first_day: parse_optional_date("first_day", self.first_day)?,
                    last_day: parse_optional_date("last_day", self.last_day)?,
                    delay: self.delay_days.unwrap_or(0).max(0) as u32,
                    status,
                    replanned: self.replanned != 0,
                })
            }
            None => None,
        };

        Ok(WorkOrderRecord {
            batch_id: self.batch_id,
            order,
            result,
            error_message: self.error_message,
        })
    }
}

fn parse_optional_date(field: &str, raw: Option<String>) -> RepositoryResult<Option<NaiveDate>> {
    raw.map(|s| parse_db_date(field, &s)).transpose()
}

fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ==========================================
// WorkOrderRepository - 工单仓储
// ==========================================
pub struct WorkOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkOrderRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存工单及其排产结果（同一工单号覆盖）
    ///
    /// # 参数
    /// - batch_id: 批次号
    /// - order: 工单
    /// - result: 排产结果，失败时为 None
    /// - error_message: 失败原因
    pub fn save_outcome(
        &self,
        batch_id: &str,
        order: &WorkOrder,
        result: Option<&SchedulingResult>,
        error_message: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO work_order (
                order_id, batch_id, delivery_date, client, product, quantity, cut_type,
                start_sector, start_date, first_day, last_day, delay_days, run_status,
                replanned, error_message, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, datetime('now'))
            ON CONFLICT(order_id) DO UPDATE SET
                batch_id = excluded.batch_id,
                delivery_date = excluded.delivery_date,
                client = excluded.client,
                product = excluded.product,
                quantity = excluded.quantity,
                cut_type = excluded.cut_type,
                start_sector = excluded.start_sector,
                start_date = excluded.start_date,
                first_day = excluded.first_day,
                last_day = excluded.last_day,
                delay_days = excluded.delay_days,
                run_status = excluded.run_status,
                replanned = excluded.replanned,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at
            "#,
            params![
                order.order_id,
                batch_id,
                fmt_date(order.delivery_date),
                order.client,
                order.product,
                order.quantity,
                order.cut_type.to_string(),
                order.start_sector,
                fmt_date(order.start_date),
                result.and_then(|r| r.first_day).map(fmt_date),
                result.and_then(|r| r.last_day).map(fmt_date),
                result.map(|r| r.delay as i64),
                result.map(|r| r.status.to_string()),
                result.map(|r| r.replanned as i64).unwrap_or(0),
                error_message,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<WorkOrderRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE order_id = ?1", SELECT_COLUMNS);
        let raw = conn
            .query_row(&sql, params![order_id], RawRow::from_row)
            .optional()?;
        raw.map(RawRow::into_record).transpose()
    }

    /// 某批次的全部工单（按交期）
    pub fn list_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<WorkOrderRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE batch_id = ?1 ORDER BY delivery_date, order_id", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![batch_id], RawRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawRow::into_record).collect()
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<WorkOrderRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY delivery_date, order_id", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], RawRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawRow::into_record).collect()
    }

    /// 删除工单及其全部分配，释放占用的产能
    ///
    /// # 返回
    /// - Ok(usize): 释放的分配条数
    /// - Err(NotFound): 工单不存在
    pub fn remove_order(&self, order_id: &str) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let released = tx.execute(
            "DELETE FROM daily_allocation WHERE order_id = ?1",
            params![order_id],
        )?;
        let removed = tx.execute("DELETE FROM work_order WHERE order_id = ?1", params![order_id])?;

        if removed == 0 && released == 0 {
            return Err(RepositoryError::NotFound {
                entity: "WorkOrder".to_string(),
                id: order_id.to_string(),
            });
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(released)
    }
}
