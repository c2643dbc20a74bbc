// ==========================================
// 连续流排产系统 - 批次汇总
// ==========================================
// 用途: 批次结束后的终端汇总表与 JSON 输出
// ==========================================

use crate::domain::{DeadlineStatus, RunStatus};
use crate::engine::BatchReport;
use crate::i18n::{deadline_label, t, t_with_args};
use crate::report::error::ReportResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub order_id: String,
    pub client: String,
    pub delivery_date: NaiveDate,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub delay: Option<u32>,
    pub status: Option<RunStatus>,
    pub deadline: DeadlineStatus,
    pub replanned: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub rows: Vec<SummaryRow>,
}

impl BatchSummary {
    pub fn from_report(report: &BatchReport) -> Self {
        let rows = report
            .outcomes
            .iter()
            .map(|outcome| {
                let result = outcome.result.as_ref();
                SummaryRow {
                    order_id: outcome.order.order_id.clone(),
                    client: outcome.order.client.clone(),
                    delivery_date: outcome.order.delivery_date,
                    first_day: result.and_then(|r| r.first_day),
                    last_day: result.and_then(|r| r.last_day),
                    delay: result.map(|r| r.delay),
                    status: result.map(|r| r.status),
                    deadline: result
                        .map(|r| r.deadline_status(outcome.order.delivery_date))
                        .unwrap_or(DeadlineStatus::Unknown),
                    replanned: result.map(|r| r.replanned).unwrap_or(false),
                    error: outcome.error.clone(),
                }
            })
            .collect();

        Self {
            batch_id: report.batch_id.clone(),
            total: report.outcomes.len(),
            completed: report.completed_count(),
            failed: report.failed_count(),
            rows,
        }
    }

    /// 渲染终端汇总表
    pub fn render(&self) -> String {
        let headers = vec![
            t("summary.order"),
            t("summary.client"),
            t("summary.delivery"),
            t("summary.first_day"),
            t("summary.last_day"),
            t("summary.delay"),
            t("summary.status"),
            t("summary.deadline"),
        ];

        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                let status = match (&row.status, &row.error) {
                    (Some(status), _) => status.to_string(),
                    (None, Some(error)) => format!("{}: {}", t("summary.error"), error),
                    (None, None) => "-".to_string(),
                };
                vec![
                    row.order_id.clone(),
                    row.client.clone(),
                    fmt_day(Some(row.delivery_date)),
                    fmt_day(row.first_day),
                    fmt_day(row.last_day),
                    row.delay.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
                    status,
                    deadline_label(row.deadline),
                ]
            })
            .collect();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for line in &body {
            for (idx, cell) in line.iter().enumerate() {
                widths[idx] = widths[idx].max(cell.chars().count());
            }
        }

        let mut out = String::new();
        out.push_str(&format!("{} ({})\n", t("summary.title"), self.batch_id));
        out.push_str(&render_line(&headers, &widths));
        out.push_str(&render_line(
            &widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>(),
            &widths,
        ));
        for line in &body {
            out.push_str(&render_line(line, &widths));
        }
        let total = self.total.to_string();
        let completed = self.completed.to_string();
        let failed = self.failed.to_string();
        out.push_str(&t_with_args(
            "summary.totals",
            &[
                ("total", total.as_str()),
                ("completed", completed.as_str()),
                ("failed", failed.as_str()),
            ],
        ));
        out.push('\n');
        out
    }

    pub fn to_json(&self) -> ReportResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> ReportResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn fmt_day(day: Option<NaiveDate>) -> String {
    day.map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn render_line(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect();
    format!("{}\n", padded.join(" | ").trim_end())
}
