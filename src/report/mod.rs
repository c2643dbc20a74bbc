// ==========================================
// 连续流排产系统 - 报表层
// ==========================================
// 职责: 工序报表导出、批次汇总
// ==========================================

pub mod batch_summary;
pub mod error;
pub mod sector_report;

pub use batch_summary::{BatchSummary, SummaryRow};
pub use error::{ReportError, ReportResult};
pub use sector_report::SectorReportExporter;
