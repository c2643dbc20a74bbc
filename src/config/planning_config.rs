// ==========================================
// 连续流排产系统 - 排产参数快照
// ==========================================
// 职责: 定义排产参数、默认值与读取接口
// 红线: 参数在一次批量排产开始时读取一次，之后不可变
// ==========================================

use crate::domain::{sector_names, Pipeline, Sector};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;

// ==========================================
// 参数键常量
// ==========================================
pub mod config_keys {
    // 工序最大产能前缀，完整键为 MAX_<工序名折叠>
    pub const MAX_PREFIX: &str = "MAX_";

    // 换型准备百分比
    pub const SETUP: &str = "SETUP";

    // 负荷系数百分比
    pub const LOAD_FACTOR: &str = "FATOR_CARGA";

    // 优先工序
    pub const PRIORITY_ENABLED: &str = "PRIORIDADE_ESTAMPA";
    pub const PRIORITY_DELTA_DAYS: &str = "DELTA_DIAS_ESTAMPA";
    pub const PRIORITY_WEEKDAYS: &str = "DIAS_ESTAMPA";
    pub const PRIORITY_SECTOR: &str = "SETOR_PRIORITARIO";

    // 工作日前瞻窗口
    pub const HORIZON_DAYS: &str = "HORIZONTE_DIAS";
}

// ==========================================
// 默认值
// ==========================================
pub mod defaults {
    use chrono::Weekday;

    pub const SETUP_PERCENT: f64 = 10.0;
    pub const LOAD_FACTOR_PERCENT: f64 = 100.0;
    pub const PRIORITY_DELTA_DAYS: i64 = 5;
    pub const PRIORITY_WEEKDAYS: [Weekday; 2] = [Weekday::Tue, Weekday::Thu];
    pub const HORIZON_DAYS: usize = 90;

    // 未列出的受限工序
    pub const OTHER_SECTOR_MAX: f64 = 100.0;
}

/// 工序基础最大产能的默认值
pub fn default_sector_max(sector_name: &str) -> f64 {
    use sector_names::*;

    match sector_name {
        n if n == CORTE_MANUAL => 500.0,
        n if n == IMPRESSAO => 400.0,
        n if n == ESTAMPA => 300.0,
        n if n == CORTE_LASER => 400.0,
        n if n == COSTURA => 250.0,
        n if n == ARREMATE => 400.0,
        n if n == EMBALAGEM => 600.0,
        _ => defaults::OTHER_SECTOR_MAX,
    }
}

/// 解析星期文本
///
/// 支持葡语缩写（SEG..DOM）、英语缩写（MON..SUN）及 0-6（周一为 0）
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    let token: String = raw.trim().to_uppercase().chars().take(3).collect();
    match token.as_str() {
        "SEG" | "MON" | "0" => Some(Weekday::Mon),
        "TER" | "TUE" | "1" => Some(Weekday::Tue),
        "QUA" | "WED" | "2" => Some(Weekday::Wed),
        "QUI" | "THU" | "3" => Some(Weekday::Thu),
        "SEX" | "FRI" | "4" => Some(Weekday::Fri),
        "SAB" | "SÁB" | "SAT" | "5" => Some(Weekday::Sat),
        "DOM" | "SUN" | "6" => Some(Weekday::Sun),
        _ => None,
    }
}

/// 解析开关文本（Sim/Yes/True/1 为开启）
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "sim" | "s" | "yes" | "y" | "true" | "1" | "on"
    )
}

// ==========================================
// PriorityPolicy - 优先工序策略
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityPolicy {
    pub enabled: bool,
    pub sector_name: String,
    pub weekdays: [Weekday; 2], // 允许该工序生产的两个星期
    pub delta_days: i64,        // 触发重排询问的交期余量阈值
}

impl Default for PriorityPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            sector_name: sector_names::ESTAMPA.to_string(),
            weekdays: defaults::PRIORITY_WEEKDAYS,
            delta_days: defaults::PRIORITY_DELTA_DAYS,
        }
    }
}

// ==========================================
// PlanningParameters - 排产参数快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningParameters {
    pub setup_percent: f64,
    pub load_factor_percent: f64,
    pub sector_max: HashMap<String, f64>, // 工序名 → 基础最大产能
    pub priority: PriorityPolicy,
    pub horizon_days: usize,
}

impl Default for PlanningParameters {
    fn default() -> Self {
        Self {
            setup_percent: defaults::SETUP_PERCENT,
            load_factor_percent: defaults::LOAD_FACTOR_PERCENT,
            sector_max: HashMap::new(),
            priority: PriorityPolicy::default(),
            horizon_days: defaults::HORIZON_DAYS,
        }
    }
}

impl PlanningParameters {
    /// 指定工序基础最大产能
    pub fn with_sector_max(mut self, sector_name: &str, max: f64) -> Self {
        self.sector_max.insert(sector_name.to_string(), max);
        self
    }

    pub fn with_setup_percent(mut self, setup_percent: f64) -> Self {
        self.setup_percent = setup_percent;
        self
    }

    pub fn with_priority(mut self, priority: PriorityPolicy) -> Self {
        self.priority = priority;
        self
    }

    /// 工序基础最大产能，缺失时取默认值
    pub fn base_max(&self, sector: &Sector) -> f64 {
        match self.sector_max.get(&sector.name) {
            Some(v) => *v,
            None => {
                let fallback = default_sector_max(&sector.name);
                tracing::warn!(
                    sector = %sector.name,
                    param_key = %sector.max_param_key(),
                    fallback,
                    "工序最大产能参数缺失，使用默认值"
                );
                fallback
            }
        }
    }
}

// ==========================================
// PlanningConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
// 约定: 参数缺失或格式错误时返回默认值并告警，不返回错误
pub trait PlanningConfigReader {
    /// 换型准备百分比，默认 10
    fn get_setup_percent(&self) -> Result<f64, Box<dyn Error>>;

    /// 负荷系数百分比，默认 100
    fn get_load_factor_percent(&self) -> Result<f64, Box<dyn Error>>;

    /// 工序基础最大产能，默认见 default_sector_max
    fn get_sector_max(&self, sector: &Sector) -> Result<f64, Box<dyn Error>>;

    /// 优先工序策略，默认关闭
    fn get_priority_policy(&self) -> Result<PriorityPolicy, Box<dyn Error>>;

    /// 工作日前瞻窗口，默认 90
    fn get_horizon_days(&self) -> Result<usize, Box<dyn Error>>;

    /// 读取一次完整参数快照
    fn load_parameters(&self, pipeline: &Pipeline) -> Result<PlanningParameters, Box<dyn Error>> {
        let mut sector_max = HashMap::new();
        for sector in pipeline.sectors().iter().filter(|s| !s.unlimited) {
            sector_max.insert(sector.name.clone(), self.get_sector_max(sector)?);
        }

        Ok(PlanningParameters {
            setup_percent: self.get_setup_percent()?,
            load_factor_percent: self.get_load_factor_percent()?,
            sector_max,
            priority: self.get_priority_policy()?,
            horizon_days: self.get_horizon_days()?,
        })
    }
}
