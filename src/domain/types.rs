// ==========================================
// 连续流排产系统 - 领域类型定义
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 裁剪方式 (Cut Type)
// ==========================================
// 决定工单经过手工裁剪还是激光裁剪工序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CutType {
    Manual, // 手工裁剪
    Laser,  // 激光裁剪
}

impl fmt::Display for CutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutType::Manual => write!(f, "MANUAL"),
            CutType::Laser => write!(f, "LASER"),
        }
    }
}

impl FromStr for CutType {
    type Err = String;

    /// 解析裁剪方式
    ///
    /// 兼容表格里的自由文本，例如 "Corte manual"、"Corte a laser"、"LASER"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower.contains("laser") {
            Ok(CutType::Laser)
        } else if lower.contains("manual") {
            Ok(CutType::Manual)
        } else {
            Err(format!("无法识别的裁剪方式: {}", s))
        }
    }
}

// ==========================================
// 工序类别 (Sector Kind)
// ==========================================
// 裁剪路由只关心两类裁剪工序，其余工序一律放行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectorKind {
    Standard,  // 普通工序
    ManualCut, // 手工裁剪工序
    LaserCut,  // 激光裁剪工序
}

impl fmt::Display for SectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectorKind::Standard => write!(f, "STANDARD"),
            SectorKind::ManualCut => write!(f, "MANUAL_CUT"),
            SectorKind::LaserCut => write!(f, "LASER_CUT"),
        }
    }
}

// ==========================================
// 日产能上限 (Ceiling)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ceiling {
    Limited(i64), // 每个工作日最多产出的件数
    Unlimited,    // 不做产能校验
}

impl Ceiling {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Ceiling::Unlimited)
    }

    /// 上限数值（无上限返回 None）
    pub fn limit(&self) -> Option<i64> {
        match self {
            Ceiling::Limited(v) => Some(*v),
            Ceiling::Unlimited => None,
        }
    }
}

impl fmt::Display for Ceiling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ceiling::Limited(v) => write!(f, "{}", v),
            Ceiling::Unlimited => write!(f, "UNLIMITED"),
        }
    }
}

// ==========================================
// 排产终态 (Run Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Completed, // 末道工序累计产出达到需求数量
    Exhausted, // 工作日窗口耗尽仍未完成
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "COMPLETED"),
            RunStatus::Exhausted => write!(f, "EXHAUSTED"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "COMPLETED" => Ok(RunStatus::Completed),
            "EXHAUSTED" => Ok(RunStatus::Exhausted),
            other => Err(format!("未知排产状态: {}", other)),
        }
    }
}

// ==========================================
// 交期判定 (Deadline Status)
// ==========================================
// 顺序: Early < OnDay < Late, Unknown 表示没有任何产出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeadlineStatus {
    Early,   // 最后产出日早于交期
    OnDay,   // 最后产出日等于交期
    Late,    // 最后产出日晚于交期
    Unknown, // 无产出
}

impl DeadlineStatus {
    /// 比较最后产出日与交期
    pub fn evaluate(last_day: Option<NaiveDate>, delivery_date: NaiveDate) -> Self {
        match last_day {
            None => DeadlineStatus::Unknown,
            Some(day) if day < delivery_date => DeadlineStatus::Early,
            Some(day) if day == delivery_date => DeadlineStatus::OnDay,
            Some(_) => DeadlineStatus::Late,
        }
    }

    /// 国际化文案 key
    pub fn i18n_key(&self) -> &'static str {
        match self {
            DeadlineStatus::Early => "deadline.early",
            DeadlineStatus::OnDay => "deadline.on_day",
            DeadlineStatus::Late => "deadline.late",
            DeadlineStatus::Unknown => "deadline.unknown",
        }
    }
}

impl fmt::Display for DeadlineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadlineStatus::Early => write!(f, "EARLY"),
            DeadlineStatus::OnDay => write!(f, "ON_DAY"),
            DeadlineStatus::Late => write!(f, "LATE"),
            DeadlineStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}
