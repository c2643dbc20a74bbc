// ==========================================
// 连续流排产系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 表头: 第一行，或第一个包含标记列（如 "Pedido"）的行
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

// ==========================================
// RawRecord - 原始行记录
// ==========================================
// 列名按去空白、小写后存储，取值时大小写不敏感
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub row: usize, // 文件中的行号（从 1 开始）
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            fields: HashMap::new(),
        }
    }

    pub fn insert(&mut self, header: &str, value: &str) {
        self.fields
            .insert(normalize_header(header), value.trim().to_string());
    }

    /// 读取非空单元格
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .get(&normalize_header(header))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// 依次尝试多个列名
    pub fn get_any(&self, headers: &[&str]) -> Option<&str> {
        headers.iter().find_map(|h| self.get(h))
    }

    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.is_empty())
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser: Send + Sync {
    /// 读取文件的全部单元格（按行）
    fn read_rows(&self, file_path: &Path) -> ImportResult<Vec<Vec<String>>>;

    /// 解析文件为行记录
    ///
    /// # 参数
    /// - header_marker: 表头标记列；为 None 时第一行即表头
    fn parse_to_raw_records(
        &self,
        file_path: &Path,
        header_marker: Option<&str>,
    ) -> ImportResult<Vec<RawRecord>> {
        let rows = self.read_rows(file_path)?;
        rows_to_records(rows, header_marker)
    }
}

/// 定位表头并把其后的行转换为记录，完全空白的行被跳过
pub fn rows_to_records(
    rows: Vec<Vec<String>>,
    header_marker: Option<&str>,
) -> ImportResult<Vec<RawRecord>> {
    let header_idx = match header_marker {
        Some(marker) => {
            let wanted = normalize_header(marker);
            rows.iter()
                .position(|row| row.iter().any(|cell| normalize_header(cell) == wanted))
                .ok_or_else(|| ImportError::HeaderNotFound(marker.to_string()))?
        }
        None => {
            if rows.is_empty() {
                return Ok(Vec::new());
            }
            0
        }
    };

    let headers: Vec<String> = rows[header_idx].iter().map(|h| h.trim().to_string()).collect();
    tracing::debug!(header_row = header_idx + 1, columns = headers.len(), "定位表头");

    let mut records = Vec::new();
    for (offset, row) in rows.into_iter().enumerate().skip(header_idx + 1) {
        let mut record = RawRecord::new(offset + 1);
        for (col_idx, value) in row.iter().enumerate() {
            if let Some(header) = headers.get(col_idx) {
                if !header.is_empty() {
                    record.insert(header, value);
                }
            }
        }

        if record.is_blank() {
            continue;
        }
        records.push(record);
    }

    Ok(records)
}

// ==========================================
// CSV Parser 实现
// ==========================================
// 分隔符按首行自动识别（';' 或 ','）
pub struct CsvParser;

impl CsvParser {
    fn sniff_delimiter(path: &Path) -> ImportResult<u8> {
        let mut first_line = String::new();
        BufReader::new(File::open(path)?).read_line(&mut first_line)?;
        let semicolons = first_line.matches(';').count();
        let commas = first_line.matches(',').count();
        Ok(if semicolons > commas { b';' } else { b',' })
    }
}

impl FileParser for CsvParser {
    fn read_rows(&self, file_path: &Path) -> ImportResult<Vec<Vec<String>>> {
        let path = file_path;

        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        if let Some(ext) = path.extension() {
            if !ext.eq_ignore_ascii_case("csv") {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        let delimiter = Self::sniff_delimiter(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(delimiter)
            .from_reader(File::open(path)?);

        let mut rows = Vec::new();
        for result in reader.byte_records() {
            let record = result?;
            let row = record
                .iter()
                .map(|field| {
                    String::from_utf8_lossy(field)
                        .trim_start_matches('\u{feff}')
                        .trim()
                        .to_string()
                })
                .collect();
            rows.push(row);
        }

        Ok(rows)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
// 只读第一个工作表
pub struct ExcelParser;

impl ExcelParser {
    fn cell_text(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            // 日期单元格按序列号输出，交给 parse_date 统一处理
            Data::DateTime(dt) => dt.as_f64().to_string(),
            other => other.to_string().trim().to_string(),
        }
    }
}

impl FileParser for ExcelParser {
    fn read_rows(&self, file_path: &Path) -> ImportResult<Vec<Vec<String>>> {
        let path = file_path;

        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "xlsx" && ext != "xls" && ext != "xlsm" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(path)?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        Ok(range
            .rows()
            .map(|row| row.iter().map(Self::cell_text).collect())
            .collect())
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(
        &self,
        file_path: P,
        header_marker: Option<&str>,
    ) -> ImportResult<Vec<RawRecord>> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_to_raw_records(path, header_marker),
            "xlsx" | "xls" | "xlsm" => ExcelParser.parse_to_raw_records(path, header_marker),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

// ==========================================
// 单元格取值工具
// ==========================================

/// 解析日期单元格
///
/// 支持 DD/MM/YYYY、YYYY-MM-DD（可带时间部分）与表格日期序列号
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let date_part = text.split_whitespace().next().unwrap_or(text);
    let date_part = date_part.split('T').next().unwrap_or(date_part);
    for fmt in ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, fmt) {
            return Some(date);
        }
    }

    // 序列号以 1899-12-30 为 0
    let serial: f64 = text.replace(',', ".").parse().ok()?;
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// 解析数量单元格（允许逗号小数点，小数部分截断）
pub fn parse_quantity(raw: &str) -> Option<i64> {
    let value: f64 = raw.trim().replace(',', ".").parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.trunc() as i64)
}
