// ==========================================
// 连续流排产系统 - 应用状态
// ==========================================
// 职责: 装配共享连接上的各仓储，提供批量排产用例
// 红线: 一个进程一条共享连接，所有仓储经 from_connection 创建
// ==========================================

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::{ConfigManager, PlanningConfigReader};
use crate::domain::{Pipeline, WorkOrder};
use crate::engine::{BatchOrdering, BatchPlanner, BatchReport, RetryDecider};
use crate::report::SectorReportExporter;
use crate::repository::{
    AllocationRepository, CalendarRepository, SectorLimitRepository, WorkOrderRepository,
};

/// 应用状态
///
/// CLI 每次运行创建一个实例
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 单日分配仓储（产能账本）
    pub allocation_repo: Arc<AllocationRepository>,

    /// 工作日历仓储
    pub calendar_repo: Arc<CalendarRepository>,

    /// 工序上限仓储
    pub sector_limit_repo: Arc<SectorLimitRepository>,

    /// 工单与排产结果仓储
    pub work_order_repo: Arc<WorkOrderRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 工序流水线
    pub pipeline: Pipeline,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（":memory:" 可用于测试）
    ///
    /// # 说明
    /// 1. 打开共享连接并建表（幂等）
    /// 2. 基于共享连接初始化所有仓储
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        Self::from_connection(db_path, conn)
    }

    fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        let config_manager = ConfigManager::from_connection(conn.clone())
            .map_err(|e| format!("配置管理器初始化失败: {}", e))?;

        Ok(Self {
            db_path,
            allocation_repo: Arc::new(AllocationRepository::from_connection(conn.clone())),
            calendar_repo: Arc::new(CalendarRepository::from_connection(conn.clone())),
            sector_limit_repo: Arc::new(SectorLimitRepository::from_connection(conn.clone())),
            work_order_repo: Arc::new(WorkOrderRepository::from_connection(conn)),
            config_manager: Arc::new(config_manager),
            pipeline: Pipeline::production(),
        })
    }

    /// 排一批工单并保存每个工单的结果
    ///
    /// 参数在批次开始时读取一次；失败工单同样落库（带错误原因）
    pub fn plan_orders(
        &self,
        orders: Vec<WorkOrder>,
        ordering: &BatchOrdering,
        decider: Arc<dyn RetryDecider>,
    ) -> Result<BatchReport, String> {
        let params = self
            .config_manager
            .load_parameters(&self.pipeline)
            .map_err(|e| format!("读取排产参数失败: {}", e))?;

        match self.calendar_repo.count() {
            Ok(0) => tracing::warn!("工作日历为空，所有工单将无法排产"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "读取工作日历失败"),
        }

        let planner = BatchPlanner::prepare(
            self.allocation_repo.clone(),
            self.sector_limit_repo.as_ref(),
            self.calendar_repo.clone(),
            self.pipeline.clone(),
            params,
            decider,
        )
        .map_err(|e| format!("写入工序上限失败: {}", e))?;

        let ordered = ordering.apply(orders);
        let report = planner.plan_batch(&ordered);

        for outcome in &report.outcomes {
            self.work_order_repo
                .save_outcome(
                    &report.batch_id,
                    &outcome.order,
                    outcome.result.as_ref(),
                    outcome.error.as_deref(),
                )
                .map_err(|e| format!("保存工单 {} 失败: {}", outcome.order.order_id, e))?;
        }

        Ok(report)
    }

    /// 删除工单及其全部分配，返回释放的分配行数
    pub fn remove_order(&self, order_id: &str) -> Result<usize, String> {
        let released = self
            .work_order_repo
            .remove_order(order_id)
            .map_err(|e| e.to_string())?;
        tracing::info!(order_id, released, "工单已删除");
        Ok(released)
    }

    /// 按工序导出账本中的分配，返回写出的文件数
    pub fn export_sector_reports(&self, dir: &Path) -> Result<usize, String> {
        let orders: HashMap<String, WorkOrder> = self
            .work_order_repo
            .list_all()
            .map_err(|e| format!("读取工单失败: {}", e))?
            .into_iter()
            .map(|record| (record.order.order_id.clone(), record.order))
            .collect();

        let exporter = SectorReportExporter::new(dir);
        let mut written = 0;
        for sector in self.pipeline.sectors() {
            let rows = self
                .allocation_repo
                .list_by_sector(&sector.name)
                .map_err(|e| format!("读取工序 {} 分配失败: {}", sector.name, e))?;
            exporter
                .write_sector(&sector.name, &rows, &orders)
                .map_err(|e| format!("导出工序 {} 失败: {}", sector.name, e))?;
            written += 1;
        }
        Ok(written)
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - FLOW_APS_DB_PATH 环境变量（非空时）
/// - 开发环境: 用户数据目录/flow-aps-dev/production_flow_aps.db
/// - 生产环境: 用户数据目录/flow-aps/production_flow_aps.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("FLOW_APS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./production_flow_aps.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("flow-aps-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("flow-aps");
        }

        std::fs::create_dir_all(&path).ok();
        path = path.join("production_flow_aps.db");
    }

    path.to_string_lossy().to_string()
}
