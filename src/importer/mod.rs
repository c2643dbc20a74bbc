// ==========================================
// 连续流排产系统 - 导入层
// ==========================================
// 职责: 外部数据导入（订单表、工作日历）
// 支持: Excel, CSV
// ==========================================

pub mod calendar_importer;
pub mod error;
pub mod file_parser;
pub mod order_importer;

// 重导出核心类型
pub use calendar_importer::{CalendarImportReport, CalendarImporter};
pub use error::{ImportError, ImportResult, RowIssue};
pub use file_parser::{
    parse_date, parse_quantity, CsvParser, ExcelParser, FileParser, RawRecord,
    UniversalFileParser,
};
pub use order_importer::{OrderImportOptions, OrderImportReport, OrderImporter};
