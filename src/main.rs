// ==========================================
// 连续流排产系统 - 命令行入口
// ==========================================
// 子命令: plan / import-calendar / import-config / export / remove-order / show-config
// 约定: 日志写 stderr，汇总表写 stdout
// ==========================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use production_flow_aps::app::{get_default_db_path, AppState, FixedRetryDecider, PromptRetryDecider};
use production_flow_aps::config::PlanningConfigReader;
use production_flow_aps::engine::RetryDecider;
use production_flow_aps::i18n::{set_locale, t_with_args};
use production_flow_aps::importer::{CalendarImporter, OrderImportOptions, OrderImporter};
use production_flow_aps::report::BatchSummary;
use production_flow_aps::{BatchOrdering, CutType};

#[derive(Parser, Debug)]
#[command(name = "flow-aps", version, about = "连续流排产系统")]
struct Cli {
    /// 数据库文件（默认: FLOW_APS_DB_PATH 或用户数据目录）
    #[arg(long, global = true)]
    db: Option<String>,

    /// 以 JSON 行输出日志
    #[arg(long, global = true)]
    log_json: bool,

    /// 界面语言（zh-CN / en）
    #[arg(long, global = true, default_value = "zh-CN")]
    lang: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 读取订单表并排产
    Plan(PlanArgs),
    /// 导入工作日历 CSV（DATA, VALOR）
    ImportCalendar { file: PathBuf },
    /// 导入参数 CSV（PARAMETRO, VALOR）
    ImportConfig { file: PathBuf },
    /// 按工序导出分配报表
    Export {
        #[arg(long, default_value = "exp")]
        dir: PathBuf,
    },
    /// 删除工单并释放其占用的产能
    RemoveOrder { order_id: String },
    /// 打印当前参数
    ShowConfig,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// 订单表（.xlsx / .csv）
    #[arg(long)]
    orders: PathBuf,
    /// 排产前先导入的工作日历
    #[arg(long)]
    calendar: Option<PathBuf>,
    /// 排产前先导入的参数表
    #[arg(long)]
    config: Option<PathBuf>,
    /// as-submitted | delivery | quantity | manual:3,1,2
    #[arg(long, default_value = "as-submitted")]
    ordering: BatchOrdering,
    /// 订单表缺少裁剪方式时使用（manual / laser）
    #[arg(long)]
    default_cut: Option<CutType>,
    #[arg(long, value_enum, default_value_t = RetryPolicy::Ask)]
    retry: RetryPolicy,
    /// 排产后导出工序报表的目录
    #[arg(long)]
    report_dir: Option<PathBuf>,
    /// 批次汇总 JSON 输出路径
    #[arg(long)]
    json: Option<PathBuf>,
    /// 缺省起排日期（YYYY-MM-DD，默认今天）
    #[arg(long)]
    today: Option<NaiveDate>,
}

/// 优先工序临近交期时的人工决策方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RetryPolicy {
    Ask,
    Accept,
    Decline,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    production_flow_aps::logging::init(cli.log_json);
    set_locale(&cli.lang);

    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    tracing::info!(version = production_flow_aps::VERSION, db_path = %db_path, "{}", production_flow_aps::APP_NAME);
    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Plan(args) => handle_plan(&state, args),
        Commands::ImportCalendar { file } => import_calendar(&state, &file),
        Commands::ImportConfig { file } => import_config(&state, &file),
        Commands::Export { dir } => export_reports(&state, &dir),
        Commands::RemoveOrder { order_id } => {
            let released = state.remove_order(&order_id).map_err(anyhow::Error::msg)?;
            let count = released.to_string();
            println!(
                "{}",
                t_with_args(
                    "order.removed",
                    &[("order_id", order_id.as_str()), ("count", count.as_str())]
                )
            );
            Ok(())
        }
        Commands::ShowConfig => {
            let snapshot = state
                .config_manager
                .get_config_snapshot()
                .map_err(|e| anyhow!("读取参数失败: {}", e))?;
            println!("{}", snapshot);
            Ok(())
        }
    }
}

fn handle_plan(state: &AppState, args: PlanArgs) -> Result<()> {
    if let Some(calendar) = &args.calendar {
        import_calendar(state, calendar)?;
    }
    if let Some(config) = &args.config {
        import_config(state, config)?;
    }

    let today = args
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let options = OrderImportOptions::new(&state.pipeline, today).with_default_cut(args.default_cut);
    let imported = OrderImporter::new(options)
        .import_file(&args.orders)
        .with_context(|| format!("读取订单表失败: {}", args.orders.display()))?;

    for issue in &imported.issues {
        let row = issue.row.to_string();
        eprintln!(
            "{}",
            t_with_args(
                "import.row_issue",
                &[("row", row.as_str()), ("message", issue.message.as_str())]
            )
        );
    }
    let count = imported.orders.len().to_string();
    let skipped = imported.skipped().to_string();
    eprintln!(
        "{}",
        t_with_args(
            "import.orders_loaded",
            &[("count", count.as_str()), ("skipped", skipped.as_str())]
        )
    );

    let decider: Arc<dyn RetryDecider> = match args.retry {
        RetryPolicy::Accept => Arc::new(FixedRetryDecider::accept()),
        RetryPolicy::Decline => Arc::new(FixedRetryDecider::decline()),
        RetryPolicy::Ask => {
            let policy = state
                .config_manager
                .get_priority_policy()
                .map_err(|e| anyhow!("读取优先工序参数失败: {}", e))?;
            Arc::new(PromptRetryDecider::stdin(&policy.sector_name))
        }
    };

    let report = state
        .plan_orders(imported.orders, &args.ordering, decider)
        .map_err(anyhow::Error::msg)?;

    let summary = BatchSummary::from_report(&report);
    print!("{}", summary.render());

    if let Some(path) = &args.json {
        summary
            .write_json(path)
            .with_context(|| format!("写入批次汇总失败: {}", path.display()))?;
        let shown = path.display().to_string();
        eprintln!("{}", t_with_args("report.json_written", &[("path", shown.as_str())]));
    }

    if let Some(dir) = &args.report_dir {
        export_reports(state, dir)?;
    }

    Ok(())
}

fn import_calendar(state: &AppState, file: &Path) -> Result<()> {
    let written = CalendarImporter::new()
        .import_into(&state.calendar_repo, file)
        .with_context(|| format!("导入工作日历失败: {}", file.display()))?;
    let count = written.to_string();
    eprintln!("{}", t_with_args("import.calendar_loaded", &[("count", count.as_str())]));
    Ok(())
}

fn import_config(state: &AppState, file: &Path) -> Result<()> {
    let written = state
        .config_manager
        .import_parameters_csv(file)
        .map_err(|e| anyhow!("导入参数失败 ({}): {}", file.display(), e))?;
    let count = written.to_string();
    eprintln!("{}", t_with_args("import.config_loaded", &[("count", count.as_str())]));
    Ok(())
}

fn export_reports(state: &AppState, dir: &Path) -> Result<()> {
    let written = state
        .export_sector_reports(dir)
        .map_err(anyhow::Error::msg)?;
    let count = written.to_string();
    let shown = dir.display().to_string();
    println!(
        "{}",
        t_with_args("report.exported", &[("count", count.as_str()), ("dir", shown.as_str())])
    );
    Ok(())
}
