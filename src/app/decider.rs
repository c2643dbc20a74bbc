// ==========================================
// 连续流排产系统 - 人工决策适配器
// ==========================================
// 实现 engine::ports::RetryDecider
// - PromptRetryDecider: 终端提问（s/sim/y/yes 为同意）
// - FixedRetryDecider: 预设答案（自动化与测试）
// ==========================================

use crate::domain::WorkOrder;
use crate::engine::ports::RetryDecider;
use crate::i18n::{t, t_with_args};
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ==========================================
// PromptRetryDecider - 终端交互
// ==========================================
pub struct PromptRetryDecider<R, W> {
    sector_name: String,
    input: Mutex<R>,
    output: Mutex<W>,
}

impl PromptRetryDecider<std::io::BufReader<std::io::Stdin>, std::io::Stderr> {
    /// 从标准输入读取回答，提问写到 stderr
    pub fn stdin(sector_name: &str) -> Self {
        Self::new(
            sector_name,
            std::io::BufReader::new(std::io::stdin()),
            std::io::stderr(),
        )
    }
}

impl<R, W> PromptRetryDecider<R, W>
where
    R: BufRead,
    W: Write,
{
    pub fn new(sector_name: &str, input: R, output: W) -> Self {
        Self {
            sector_name: sector_name.to_string(),
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "sim" | "y" | "yes" | "是"
    )
}

impl<R, W> RetryDecider for PromptRetryDecider<R, W>
where
    R: BufRead,
    W: Write,
{
    fn ask_retry_without_priority(&self, order: &WorkOrder, diff_days: i64) -> bool {
        let diff = diff_days.to_string();
        let prompt = t_with_args(
            "retry.prompt",
            &[
                ("order_id", order.order_id.as_str()),
                ("sector", self.sector_name.as_str()),
                ("diff", diff.as_str()),
            ],
        );

        if let Ok(mut out) = self.output.lock() {
            let _ = write!(out, "{}", prompt);
            let _ = out.flush();
        }

        let mut answer = String::new();
        let read = match self.input.lock() {
            Ok(mut input) => input.read_line(&mut answer),
            Err(e) => {
                tracing::warn!(error = %e, "读取人工决策失败，按拒绝处理");
                return false;
            }
        };

        match read {
            Ok(_) => {
                let accepted = is_yes(&answer);
                tracing::info!(order_id = %order.order_id, diff_days, accepted, "人工决策");
                if let Ok(mut out) = self.output.lock() {
                    let key = if accepted { "retry.accepted" } else { "retry.declined" };
                    let _ = writeln!(out, "{}", t(key));
                }
                accepted
            }
            Err(e) => {
                tracing::warn!(error = %e, "读取人工决策失败，按拒绝处理");
                false
            }
        }
    }
}

// ==========================================
// FixedRetryDecider - 预设答案
// ==========================================
#[derive(Debug, Default)]
pub struct FixedRetryDecider {
    answer: bool,
    asked: AtomicUsize,
}

impl FixedRetryDecider {
    pub fn accept() -> Self {
        Self {
            answer: true,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn decline() -> Self {
        Self::default()
    }

    /// 被询问的次数
    pub fn asked_count(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl RetryDecider for FixedRetryDecider {
    fn ask_retry_without_priority(&self, order: &WorkOrder, diff_days: i64) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(order_id = %order.order_id, diff_days, answer = self.answer, "预设人工决策");
        self.answer
    }
}
