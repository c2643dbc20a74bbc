// ==========================================
// 连续流排产系统 - 工作日历数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 存储: work_calendar 表，cal_date 为 YYYY-MM-DD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::{CalendarDay, WorkCalendar};
use crate::engine::ports::CalendarProvider;
use crate::repository::error::{parse_db_date, RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// CalendarRepository - 日历仓储
// ==========================================
pub struct CalendarRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CalendarRepository {
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

    /// 批量写入日历日（同日覆盖）
    ///
    /// # 返回
    /// - Ok(usize): 写入条数
    pub fn upsert_days(&self, days: &[CalendarDay]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO work_calendar (cal_date, is_working)
                VALUES (?1, ?2)
                ON CONFLICT(cal_date) DO UPDATE SET is_working = excluded.is_working
                "#,
            )?;
            for day in days {
                stmt.execute(params![
                    day.date.format("%Y-%m-%d").to_string(),
                    day.is_working as i64
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(days.len())
    }

    /// 读取全部日历
    pub fn load_calendar(&self) -> RepositoryResult<WorkCalendar> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT cal_date, is_working FROM work_calendar ORDER BY cal_date")?;
        let raw = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let days = raw
            .into_iter()
            .map(|(date, flag)| {
                Ok(CalendarDay {
                    date: parse_db_date("cal_date", &date)?,
                    is_working: flag != 0,
                })
            })
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok(WorkCalendar::from_days(days))
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM work_calendar", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl CalendarProvider for CalendarRepository {
    fn working_days_from(&self, start: NaiveDate, count: usize) -> RepositoryResult<Vec<NaiveDate>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT cal_date
            FROM work_calendar
            WHERE is_working = 1 AND cal_date >= ?1
            ORDER BY cal_date
            LIMIT ?2
            "#,
        )?;
        let raw = stmt
            .query_map(
                params![start.format("%Y-%m-%d").to_string(), count as i64],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        raw.iter().map(|s| parse_db_date("cal_date", s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn repo() -> CalendarRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        CalendarRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_working_days_skip_non_working() {
        let repo = repo();
        let cal = WorkCalendar::weekdays(d(1), 14);
        let days: Vec<CalendarDay> = cal.days().collect();
        assert_eq!(repo.upsert_days(&days).unwrap(), 14);

        // 2024-01-06/07 为周末
        let got = repo.working_days_from(d(5), 3).unwrap();
        assert_eq!(got, vec![d(5), d(8), d(9)]);
    }

    #[test]
    fn test_upsert_overrides_flag() {
        let repo = repo();
        repo.upsert_days(&[CalendarDay { date: d(2), is_working: true }]).unwrap();
        repo.upsert_days(&[CalendarDay { date: d(2), is_working: false }]).unwrap();

        assert_eq!(repo.count().unwrap(), 1);
        assert!(repo.working_days_from(d(1), 10).unwrap().is_empty());
        assert!(!repo.load_calendar().unwrap().is_working(d(2)));
    }
}
