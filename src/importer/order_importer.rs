// ==========================================
// 连续流排产系统 - 工单导入器
// ==========================================
// 输入: 订单表（.xlsx/.csv），表头为第一个包含 "Pedido" 的行
// 输出: WorkOrder 列表 + 被跳过行的问题清单
// 规则:
//   - 无工单号的行忽略；工单号重复时保留第一行
//   - 数值型工单号去掉末尾 ".0"
//   - 缺少裁剪方式时使用调用方给定的默认值，否则该行跳过
// ==========================================

use crate::domain::{CutType, Pipeline, WorkOrder};
use crate::importer::error::{ImportError, ImportResult, RowIssue};
use crate::importer::file_parser::{parse_date, parse_quantity, RawRecord, UniversalFileParser};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// 订单表列名
pub mod columns {
    pub const PEDIDO: &str = "Pedido";
    pub const ENTREGA: &str = "Entrega";
    pub const CLIENTE: &str = "Cliente";
    pub const PRODUTO: &str = "Produto";
    pub const QTD: &str = "QTD";
    pub const TIPO_CORTE: &[&str] = &["Tipo de Corte", "Corte"];
    pub const SETOR_INICIAL: &[&str] = &["Setor Inicial", "Setor"];
    pub const DATA_INICIO: &[&str] = &["Data Inicio", "Data Início"];
}

// ==========================================
// OrderImportOptions - 导入默认值
// ==========================================
#[derive(Debug, Clone)]
pub struct OrderImportOptions {
    pub default_cut: Option<CutType>,
    pub default_start_sector: String,
    pub today: NaiveDate, // 缺少起排日期时使用
}

impl OrderImportOptions {
    pub fn new(pipeline: &Pipeline, today: NaiveDate) -> Self {
        Self {
            default_cut: None,
            default_start_sector: pipeline
                .first()
                .map(|s| s.name.clone())
                .unwrap_or_default(),
            today,
        }
    }

    pub fn with_default_cut(mut self, cut: Option<CutType>) -> Self {
        self.default_cut = cut;
        self
    }
}

// ==========================================
// OrderImportReport - 导入结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderImportReport {
    pub orders: Vec<WorkOrder>,
    pub issues: Vec<RowIssue>,
    pub duplicates: usize,
}

impl OrderImportReport {
    pub fn skipped(&self) -> usize {
        self.issues.len() + self.duplicates
    }
}

// ==========================================
// OrderImporter
// ==========================================
pub struct OrderImporter {
    parser: UniversalFileParser,
    options: OrderImportOptions,
}

impl OrderImporter {
    pub fn new(options: OrderImportOptions) -> Self {
        Self {
            parser: UniversalFileParser,
            options,
        }
    }

    /// 读取订单文件
    pub fn import_file(&self, path: &Path) -> ImportResult<OrderImportReport> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let records = self.parser.parse(path, Some(columns::PEDIDO))?;
        let report = self.import_records(records);
        info!(
            path = %path.display(),
            orders = report.orders.len(),
            issues = report.issues.len(),
            duplicates = report.duplicates,
            "工单导入完成"
        );
        Ok(report)
    }

    /// 把原始行转换为工单
    pub fn import_records(&self, records: Vec<RawRecord>) -> OrderImportReport {
        let mut report = OrderImportReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        for record in records {
            let order_id = match record.get(columns::PEDIDO) {
                Some(raw) => normalize_order_id(raw),
                None => continue,
            };

            if !seen.insert(order_id.clone()) {
                warn!(row = record.row, order_id = %order_id, "工单号重复，保留第一行");
                report.duplicates += 1;
                continue;
            }

            match self.map_record(&record, &order_id) {
                Ok(order) => report.orders.push(order),
                Err(message) => {
                    warn!(row = record.row, order_id = %order_id, %message, "跳过工单行");
                    report
                        .issues
                        .push(RowIssue::new(record.row, Some(&order_id), message));
                }
            }
        }

        report
    }

    fn map_record(&self, record: &RawRecord, order_id: &str) -> Result<WorkOrder, String> {
        let quantity = match record.get(columns::QTD) {
            Some(raw) => parse_quantity(raw).ok_or_else(|| format!("数量无法解析: {}", raw))?,
            None => return Err("缺少数量".to_string()),
        };
        if quantity <= 0 {
            return Err(format!("数量必须为正整数: {}", quantity));
        }

        let delivery_date = match record.get(columns::ENTREGA) {
            Some(raw) => parse_date(raw).ok_or_else(|| format!("交期无法解析: {}", raw))?,
            None => return Err("缺少交期".to_string()),
        };

        let cut_type = match record.get_any(columns::TIPO_CORTE) {
            Some(raw) => raw.parse::<CutType>()?,
            None => self
                .options
                .default_cut
                .ok_or_else(|| "缺少裁剪方式且未指定默认值".to_string())?,
        };

        let start_sector = record
            .get_any(columns::SETOR_INICIAL)
            .map(str::to_string)
            .unwrap_or_else(|| self.options.default_start_sector.clone());

        let start_date = match record.get_any(columns::DATA_INICIO) {
            Some(raw) => parse_date(raw).ok_or_else(|| format!("起排日期无法解析: {}", raw))?,
            None => self.options.today,
        };

        let mut order = WorkOrder::new(
            order_id,
            quantity,
            cut_type,
            &start_sector,
            start_date,
            delivery_date,
        );
        order.client = record.get(columns::CLIENTE).unwrap_or_default().to_string();
        order.product = record.get(columns::PRODUTO).unwrap_or_default().to_string();
        Ok(order)
    }
}

/// 数值型工单号会带 ".0"
fn normalize_order_id(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn importer(default_cut: Option<CutType>) -> OrderImporter {
        let options =
            OrderImportOptions::new(&Pipeline::production(), d(1, 2)).with_default_cut(default_cut);
        OrderImporter::new(options)
    }

    fn record(row: usize, fields: &[(&str, &str)]) -> RawRecord {
        let mut r = RawRecord::new(row);
        for (k, v) in fields {
            r.insert(k, v);
        }
        r
    }

    #[test]
    fn test_defaults_and_id_normalization() {
        let report = importer(Some(CutType::Manual)).import_records(vec![record(
            2,
            &[
                ("Pedido", "1001.0"),
                ("Entrega", "10/01/2024"),
                ("Cliente", "ACME"),
                ("Produto", "Camiseta"),
                ("QTD", "70"),
            ],
        )]);

        assert!(report.issues.is_empty());
        let order = &report.orders[0];
        assert_eq!(order.order_id, "1001");
        assert_eq!(order.cut_type, CutType::Manual);
        assert_eq!(order.start_sector, "PCP");
        assert_eq!(order.start_date, d(1, 2));
        assert_eq!(order.delivery_date, d(1, 10));
        assert_eq!(order.client, "ACME");
    }

    #[test]
    fn test_duplicates_keep_first_and_blank_ids_ignored() {
        let report = importer(Some(CutType::Laser)).import_records(vec![
            record(2, &[("Pedido", "1001"), ("Entrega", "10/01/2024"), ("QTD", "70")]),
            record(3, &[("Pedido", "1001"), ("Entrega", "11/01/2024"), ("QTD", "10")]),
            record(4, &[("Cliente", "sem pedido"), ("QTD", "5")]),
        ]);

        assert_eq!(report.orders.len(), 1);
        assert_eq!(report.orders[0].quantity, 70);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.skipped(), 1);
    }

    #[test]
    fn test_row_issues() {
        let report = importer(None).import_records(vec![
            // 无裁剪方式且无默认值
            record(2, &[("Pedido", "1"), ("Entrega", "10/01/2024"), ("QTD", "70")]),
            record(3, &[("Pedido", "2"), ("Entrega", "10/01/2024"), ("QTD", "0"), ("Tipo de Corte", "laser")]),
            record(4, &[("Pedido", "3"), ("QTD", "5"), ("Tipo de Corte", "laser")]),
            record(5, &[("Pedido", "4"), ("Entrega", "10/01/2024"), ("QTD", "5"), ("Tipo de Corte", "jato")]),
            record(6, &[("Pedido", "5"), ("Entrega", "2024-01-10"), ("QTD", "5"), ("Tipo de Corte", "Corte a Laser"), ("Setor Inicial", "Estampa"), ("Data Inicio", "05/01/2024")]),
        ]);

        assert_eq!(report.issues.len(), 4);
        assert_eq!(
            report.issues.iter().map(|i| i.row).collect::<Vec<_>>(),
            vec![2, 3, 4, 5]
        );
        let ok = &report.orders[0];
        assert_eq!(ok.order_id, "5");
        assert_eq!(ok.cut_type, CutType::Laser);
        assert_eq!(ok.start_sector, "Estampa");
        assert_eq!(ok.start_date, d(1, 5));
    }

    #[test]
    fn test_import_csv_file_with_title_rows() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Carteira de pedidos;;;;").unwrap();
        writeln!(file, "Pedido;Entrega;Cliente;Produto;QTD").unwrap();
        writeln!(file, "1001;10/01/2024;ACME;Camiseta;70").unwrap();
        writeln!(file, "1002;12/01/2024;Globex;Boné;30").unwrap();

        let report = importer(Some(CutType::Manual)).import_file(file.path()).unwrap();

        assert_eq!(report.orders.len(), 2);
        assert_eq!(report.orders[1].product, "Boné");
    }

    #[test]
    fn test_import_missing_file() {
        let result = importer(None).import_file(Path::new("/nao/existe/pedidos.xlsx"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }
}
