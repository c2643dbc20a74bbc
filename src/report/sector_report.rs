// ==========================================
// 连续流排产系统 - 工序报表导出
// ==========================================
// 输出: 每个工序一个 CSV，文件名 planejamento_<工序>.csv
// 列: 工单号, 客户, 产品, 日期, 数量（按日期、工单号排序）
// ==========================================

use crate::domain::{DailyAllocation, WorkOrder};
use crate::report::error::ReportResult;
use csv::WriterBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const HEADERS: [&str; 5] = ["PEDIDO", "CLIENTE", "PRODUTO", "DATA", "QUANTIDADE"];

pub struct SectorReportExporter {
    dir: PathBuf,
}

impl SectorReportExporter {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn file_name(sector: &str) -> String {
        format!("planejamento_{}.csv", sector)
    }

    /// 写出一个工序的报表，返回文件路径
    ///
    /// 工序没有分配时只写表头
    pub fn write_sector(
        &self,
        sector: &str,
        rows: &[DailyAllocation],
        orders: &HashMap<String, WorkOrder>,
    ) -> ReportResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(Self::file_name(sector));

        let mut sorted: Vec<&DailyAllocation> = rows
            .iter()
            .filter(|a| a.sector == sector && a.quantity > 0)
            .collect();
        sorted.sort_by(|a, b| {
            a.plan_date
                .cmp(&b.plan_date)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });

        let mut writer = WriterBuilder::new().from_path(&path)?;
        writer.write_record(HEADERS)?;
        for allocation in sorted {
            let (client, product) = orders
                .get(&allocation.order_id)
                .map(|o| (o.client.as_str(), o.product.as_str()))
                .unwrap_or(("", ""));
            let date = allocation.plan_date.format("%d/%m/%Y").to_string();
            let quantity = allocation.quantity.to_string();
            writer.write_record([
                allocation.order_id.as_str(),
                client,
                product,
                date.as_str(),
                quantity.as_str(),
            ])?;
        }
        writer.flush()?;

        tracing::debug!(sector, path = %path.display(), "工序报表已写出");
        Ok(path)
    }
}
