// ==========================================
// 连续流排产系统 - 工作日历导入器
// ==========================================
// 输入: 日历 CSV，列 DATA (DD/MM/YYYY) 与 VALOR
// 规则: VALOR = "UTIL" 为工作日，其余为非工作日
// ==========================================

use crate::domain::{CalendarDay, WorkCalendar};
use crate::importer::error::{ImportError, ImportResult, RowIssue};
use crate::importer::file_parser::{parse_date, RawRecord, UniversalFileParser};
use crate::repository::CalendarRepository;
use std::path::Path;
use tracing::{info, warn};

pub const COL_DATA: &str = "DATA";
pub const COL_VALOR: &str = "VALOR";
pub const WORKING_MARK: &str = "UTIL";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarImportReport {
    pub days: Vec<CalendarDay>,
    pub issues: Vec<RowIssue>,
}

impl CalendarImportReport {
    pub fn working_count(&self) -> usize {
        self.days.iter().filter(|d| d.is_working).count()
    }

    pub fn to_calendar(&self) -> WorkCalendar {
        WorkCalendar::from_days(self.days.iter().copied())
    }
}

pub struct CalendarImporter {
    parser: UniversalFileParser,
}

impl Default for CalendarImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CalendarImporter {
    pub fn new() -> Self {
        Self {
            parser: UniversalFileParser,
        }
    }

    /// 读取日历文件
    pub fn load_file(&self, path: &Path) -> ImportResult<CalendarImportReport> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let records = self.parser.parse(path, Some(COL_DATA))?;
        Ok(Self::map_records(&records))
    }

    /// 读取日历文件并写入 work_calendar 表，返回写入天数
    pub fn import_into(&self, repo: &CalendarRepository, path: &Path) -> ImportResult<usize> {
        let report = self.load_file(path)?;
        let written = repo.upsert_days(&report.days)?;
        info!(
            path = %path.display(),
            days = written,
            working = report.working_count(),
            issues = report.issues.len(),
            "工作日历导入完成"
        );
        Ok(written)
    }

    pub fn map_records(records: &[RawRecord]) -> CalendarImportReport {
        let mut report = CalendarImportReport::default();

        for record in records {
            let Some(raw_date) = record.get(COL_DATA) else {
                continue;
            };
            match parse_date(raw_date) {
                Some(date) => {
                    let is_working = record
                        .get(COL_VALOR)
                        .map(|v| v.eq_ignore_ascii_case(WORKING_MARK))
                        .unwrap_or(false);
                    report.days.push(CalendarDay { date, is_working });
                }
                None => {
                    warn!(row = record.row, value = raw_date, "日历日期无法解析");
                    report.issues.push(RowIssue::new(
                        record.row,
                        None,
                        format!("日期无法解析: {}", raw_date),
                    ));
                }
            }
        }

        report
    }
}
