// ==========================================
// 连续流排产系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::planning_config::{
    config_keys, default_sector_max, defaults, parse_flag, parse_weekday, PlanningConfigReader,
    PriorityPolicy,
};
use crate::db::open_sqlite_connection;
use crate::domain::{sector_names, Sector};
use chrono::Weekday;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 导入参数表 CSV（表头 PARAMETRO,VALOR）
    ///
    /// # 返回
    /// - Ok(usize): 写入的参数条数
    ///
    /// # 说明
    /// - 分隔符支持 ',' 与 ';'
    /// - 空参数名的行跳过
    pub fn import_parameters_csv(&self, path: &Path) -> Result<usize, Box<dyn Error>> {
        let content = std::fs::read_to_string(path)?;
        let delimiter = match content.lines().next() {
            Some(header) if header.contains(';') && !header.contains(',') => b';',
            _ => b',',
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader.headers()?.clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        };
        let key_idx = find("PARAMETRO").ok_or("参数表缺少 PARAMETRO 列")?;
        let value_idx = find("VALOR").ok_or("参数表缺少 VALOR 列")?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            let key = record.get(key_idx).unwrap_or("").trim();
            if key.is_empty() {
                continue;
            }
            let value = record.get(value_idx).unwrap_or("").trim();
            entries.push((key.to_string(), value.to_string()));
        }

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute("BEGIN TRANSACTION", [])?;
        for (key, value) in &entries {
            let written = conn.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
                params![key, value],
            );
            if let Err(e) = written {
                conn.execute("ROLLBACK", [])?;
                return Err(Box::new(e));
            }
        }
        conn.execute("COMMIT", [])?;

        tracing::info!(path = %path.display(), count = entries.len(), "参数表导入完成");
        Ok(entries.len())
    }

    /// 读取非负数值参数，缺失或格式错误时告警并取默认值
    fn get_number_or_default(&self, key: &str, default: f64) -> Result<f64, Box<dyn Error>> {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => {
                tracing::warn!(config_key = key, default, "参数缺失，使用默认值");
                return Ok(default);
            }
        };

        match raw.trim().replace(',', ".").parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, default, "参数格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    fn get_weekdays(&self) -> Result<[Weekday; 2], Box<dyn Error>> {
        let raw = match self.get_config_value(config_keys::PRIORITY_WEEKDAYS)? {
            Some(v) => v,
            None => return Ok(defaults::PRIORITY_WEEKDAYS),
        };

        let days: Vec<Weekday> = raw
            .split(|c: char| c == ',' || c == ';' || c == '/')
            .filter_map(parse_weekday)
            .collect();

        match days.as_slice() {
            [first, second] => Ok([*first, *second]),
            _ => {
                tracing::warn!(
                    config_key = config_keys::PRIORITY_WEEKDAYS,
                    raw_value = %raw,
                    "优先星期需恰好两个，使用默认值 TER,QUI"
                );
                Ok(defaults::PRIORITY_WEEKDAYS)
            }
        }
    }
}

// ==========================================
// PlanningConfigReader Trait 实现
// ==========================================
impl PlanningConfigReader for ConfigManager {
    fn get_setup_percent(&self) -> Result<f64, Box<dyn Error>> {
        self.get_number_or_default(config_keys::SETUP, defaults::SETUP_PERCENT)
    }

    fn get_load_factor_percent(&self) -> Result<f64, Box<dyn Error>> {
        self.get_number_or_default(config_keys::LOAD_FACTOR, defaults::LOAD_FACTOR_PERCENT)
    }

    fn get_sector_max(&self, sector: &Sector) -> Result<f64, Box<dyn Error>> {
        self.get_number_or_default(&sector.max_param_key(), default_sector_max(&sector.name))
    }

    fn get_priority_policy(&self) -> Result<PriorityPolicy, Box<dyn Error>> {
        let enabled = self
            .get_config_value(config_keys::PRIORITY_ENABLED)?
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        let sector_name = self
            .get_config_value(config_keys::PRIORITY_SECTOR)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| sector_names::ESTAMPA.to_string());

        let delta_days = self
            .get_number_or_default(
                config_keys::PRIORITY_DELTA_DAYS,
                defaults::PRIORITY_DELTA_DAYS as f64,
            )?
            .trunc() as i64;

        Ok(PriorityPolicy {
            enabled,
            sector_name,
            weekdays: self.get_weekdays()?,
            delta_days,
        })
    }

    fn get_horizon_days(&self) -> Result<usize, Box<dyn Error>> {
        let days = self.get_number_or_default(config_keys::HORIZON_DAYS, defaults::HORIZON_DAYS as f64)?;
        if days < 1.0 {
            tracing::warn!(config_key = config_keys::HORIZON_DAYS, days, "前瞻窗口至少 1 天，使用默认值");
            return Ok(defaults::HORIZON_DAYS);
        }
        Ok(days.trunc() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::domain::Pipeline;
    use std::io::Write;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_empty_store_yields_defaults() {
        let config = manager();
        let params = config.load_parameters(&Pipeline::production()).unwrap();

        assert_eq!(params.setup_percent, 10.0);
        assert_eq!(params.load_factor_percent, 100.0);
        assert_eq!(params.horizon_days, 90);
        assert!(!params.priority.enabled);
        assert_eq!(params.priority.delta_days, 5);
        assert_eq!(params.sector_max.get("Estampa"), Some(&300.0));
        // 不限产能工序不读取最大产能
        assert!(!params.sector_max.contains_key("PCP"));
    }

    #[test]
    fn test_global_value_overwrite() {
        let config = manager();
        assert_eq!(config.get_global_config_value("SETUP").unwrap(), None);

        config.set_global_config_value("SETUP", "12").unwrap();
        config.set_global_config_value("SETUP", "15").unwrap();
        assert_eq!(
            config.get_global_config_value("SETUP").unwrap(),
            Some("15".to_string())
        );
        assert_eq!(config.get_setup_percent().unwrap(), 15.0);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let config = manager();
        config.set_global_config_value("SETUP", "abc").unwrap();
        config.set_global_config_value("FATOR_CARGA", "80,5").unwrap();
        config.set_global_config_value("DIAS_ESTAMPA", "SEG").unwrap();

        assert_eq!(config.get_setup_percent().unwrap(), 10.0);
        assert_eq!(config.get_load_factor_percent().unwrap(), 80.5);
        assert_eq!(
            config.get_priority_policy().unwrap().weekdays,
            [Weekday::Tue, Weekday::Thu]
        );
    }

    #[test]
    fn test_import_parameters_csv() {
        let config = manager();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "PARAMETRO,VALOR").unwrap();
        writeln!(file, "MAX_SEPARACAO_MP,999").unwrap();
        writeln!(file, "MAX_CORTE_MANUAL,120").unwrap();
        writeln!(file, "PRIORIDADE_ESTAMPA,Sim").unwrap();
        writeln!(file, "DELTA_DIAS_ESTAMPA,3").unwrap();
        writeln!(file, "DIAS_ESTAMPA,\"SEG,QUA\"").unwrap();
        writeln!(file, ",ignorado").unwrap();

        assert_eq!(config.import_parameters_csv(file.path()).unwrap(), 5);

        let sector = Sector::limited("Corte manual");
        assert_eq!(config.get_sector_max(&sector).unwrap(), 120.0);

        let policy = config.get_priority_policy().unwrap();
        assert!(policy.enabled);
        assert_eq!(policy.delta_days, 3);
        assert_eq!(policy.sector_name, "Estampa");

        let snapshot = config.get_config_snapshot().unwrap();
        assert!(snapshot.contains("MAX_CORTE_MANUAL"));
    }
}
