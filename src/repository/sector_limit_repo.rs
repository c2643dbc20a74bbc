// ==========================================
// 连续流排产系统 - 工序产能上限仓储
// ==========================================
// 存储: sector_limit 表，limit_qty 为 NULL 表示不限产能
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::Ceiling;
use crate::engine::ports::SectorLimitStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct SectorLimitRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SectorLimitRepository {
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

    /// 全部工序上限（按工序名排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<(String, Ceiling)>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT sector_name, limit_qty FROM sector_limit ORDER BY sector_name")?;
        let rows = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let limit: Option<i64> = row.get(1)?;
                Ok((name, to_ceiling(limit)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn to_ceiling(limit: Option<i64>) -> Ceiling {
    match limit {
        Some(qty) => Ceiling::Limited(qty),
        None => Ceiling::Unlimited,
    }
}

impl SectorLimitStore for SectorLimitRepository {
    fn read_limit(&self, sector: &str) -> RepositoryResult<Option<Ceiling>> {
        let conn = self.get_conn()?;
        let row: Option<Option<i64>> = conn
            .query_row(
                "SELECT limit_qty FROM sector_limit WHERE sector_name = ?1",
                params![sector],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.map(to_ceiling))
    }

    fn write_limit(&self, sector: &str, ceiling: Ceiling) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO sector_limit (sector_name, limit_qty)
            VALUES (?1, ?2)
            ON CONFLICT(sector_name)
            DO UPDATE SET limit_qty = excluded.limit_qty, updated_at = datetime('now')
            "#,
            params![sector, ceiling.limit()],
        )?;
        Ok(())
    }
}
