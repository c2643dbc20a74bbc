// ==========================================
// 连续流分配性质测试
// ==========================================
// 测试目标: 多工单共享账本下的分配性质
// 覆盖范围: 流量守恒、产能上限、完成边界、裁剪排除、延误计数、换型下限、重排幂等
// ==========================================


use chrono::NaiveDate;
use production_flow_aps::app::FixedRetryDecider;
use production_flow_aps::domain::{
    CutType, DailyAllocation, Pipeline, RunStatus, SectorKind, WorkCalendar, WorkOrder,
};
use production_flow_aps::engine::{
    AllocationStore, BatchPlanner, CutTypeRouter, PipelineRun, ReplanDecision, RetryDecider,
};
use production_flow_aps::repository::CapacityLedger;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use test_helpers::{cutting_pipeline, d, priority_pipeline};

// ==========================================
// 测试辅助函数
// ==========================================

fn make_planner(
    ledger: &Arc<CapacityLedger>,
    calendar: WorkCalendar,
    setup: (Pipeline, production_flow_aps::config::PlanningParameters),
    decider: Arc<dyn RetryDecider>,
) -> BatchPlanner<CapacityLedger, WorkCalendar> {
    let (pipeline, params) = setup;
    BatchPlanner::prepare(
        ledger.clone(),
        ledger.as_ref(),
        Arc::new(calendar),
        pipeline,
        params,
        decider,
    )
    .unwrap()
}

fn orders() -> Vec<WorkOrder> {
    vec![
        WorkOrder::new("A", 61, CutType::Manual, "PCP", d(1), d(20)),
        WorkOrder::new("B", 40, CutType::Laser, "PCP", d(1), d(20)),
        WorkOrder::new("C", 33, CutType::Manual, "PCP", d(2), d(20)),
        WorkOrder::new("D", 7, CutType::Laser, "PCP", d(1), d(20)),
    ]
}

/// 其他批次已占用的产能，制造低于换型下限的余量
fn seeded_ledger() -> Arc<CapacityLedger> {
    let ledger = Arc::new(CapacityLedger::new());
    ledger.seed("OUTRO", "Corte manual", d(2), 28).unwrap(); // 余量 2 < 3
    ledger.seed("OUTRO", "Costura", d(4), 19).unwrap(); // 余量 1 < 2
    ledger
}

/// 顺序排全部工单，返回各工单的运行结果
fn run_all(
    planner: &BatchPlanner<CapacityLedger, WorkCalendar>,
    orders: &[WorkOrder],
) -> Vec<(WorkOrder, PipelineRun)> {
    orders
        .iter()
        .map(|o| (o.clone(), planner.plan_order(o).unwrap().0))
        .collect()
}

fn by_order(rows: &[DailyAllocation], order_id: &str) -> Vec<DailyAllocation> {
    rows.iter().filter(|a| a.order_id == order_id).cloned().collect()
}

fn cumulative(rows: &[DailyAllocation], sector: &str) -> BTreeMap<NaiveDate, i64> {
    let mut daily: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for a in rows.iter().filter(|a| a.sector == sector) {
        *daily.entry(a.plan_date).or_insert(0) += a.quantity;
    }
    let mut total = 0;
    daily
        .into_iter()
        .map(|(day, qty)| {
            total += qty;
            (day, total)
        })
        .collect()
}

fn cumulative_before(cum: &BTreeMap<NaiveDate, i64>, day: NaiveDate) -> i64 {
    cum.range(..day).next_back().map(|(_, v)| *v).unwrap_or(0)
}

// ==========================================
// 性质测试
// ==========================================

#[test]
fn test_flow_conservation() {
    let ledger = seeded_ledger();
    let (pipeline, params) = cutting_pipeline();
    let planner = make_planner(
        &ledger,
        WorkCalendar::every_day(d(1), 60),
        (pipeline.clone(), params),
        Arc::new(FixedRetryDecider::decline()),
    );
    run_all(&planner, &orders());
    let rows = ledger.all_allocations().unwrap();

    for order in orders() {
        let mine = by_order(&rows, &order.order_id);
        let route = CutTypeRouter::route(pipeline.sectors(), order.cut_type);
        for pair in route.windows(2) {
            let upstream = cumulative(&mine, &pair[0].name);
            let downstream = cumulative(&mine, &pair[1].name);
            for (day, produced) in &downstream {
                assert!(
                    *produced <= cumulative_before(&upstream, *day),
                    "{} {} 在 {} 超出上游前一日累计",
                    order.order_id,
                    pair[1].name,
                    day
                );
            }
        }
    }
}

#[test]
fn test_capacity_bound_across_orders() {
    let ledger = seeded_ledger();
    let planner = make_planner(
        &ledger,
        WorkCalendar::every_day(d(1), 60),
        cutting_pipeline(),
        Arc::new(FixedRetryDecider::decline()),
    );
    run_all(&planner, &orders());

    let ceilings: HashMap<&str, i64> =
        [("Corte manual", 30), ("Corte laser", 25), ("Costura", 20)].into();
    let mut totals: HashMap<(String, NaiveDate), i64> = HashMap::new();
    for a in ledger.all_allocations().unwrap() {
        *totals.entry((a.sector.clone(), a.plan_date)).or_insert(0) += a.quantity;
    }

    for ((sector, day), total) in &totals {
        if let Some(ceiling) = ceilings.get(sector.as_str()) {
            assert!(total <= ceiling, "{} 在 {} 合计 {} 超过上限 {}", sector, day, total, ceiling);
        }
        assert_eq!(
            ledger.already_planned(sector, *day).unwrap(),
            *total,
            "账本汇总与明细不一致"
        );
    }
}

#[test]
fn test_completion_bound() {
    let ledger = seeded_ledger();
    let planner = make_planner(
        &ledger,
        WorkCalendar::every_day(d(1), 60),
        cutting_pipeline(),
        Arc::new(FixedRetryDecider::decline()),
    );

    for (order, run) in run_all(&planner, &orders()) {
        assert_eq!(run.status, RunStatus::Completed, "{}", order.order_id);
        assert_eq!(run.final_output(), order.quantity);
    }

    // 日历只有 3 天，无法完成
    let short = Arc::new(CapacityLedger::new());
    let planner = make_planner(
        &short,
        WorkCalendar::every_day(d(1), 3),
        cutting_pipeline(),
        Arc::new(FixedRetryDecider::decline()),
    );
    let order = WorkOrder::new("LONGO", 100, CutType::Manual, "PCP", d(1), d(3));
    let (run, _) = planner.plan_order(&order).unwrap();
    assert_eq!(run.status, RunStatus::Exhausted);
    assert!(run.final_output() < order.quantity);
}

#[test]
fn test_cut_type_exclusion() {
    let ledger = seeded_ledger();
    let (pipeline, params) = cutting_pipeline();
    let planner = make_planner(
        &ledger,
        WorkCalendar::every_day(d(1), 60),
        (pipeline.clone(), params),
        Arc::new(FixedRetryDecider::decline()),
    );
    run_all(&planner, &orders());
    let rows = ledger.all_allocations().unwrap();

    let kind_of: HashMap<String, SectorKind> = pipeline
        .sectors()
        .iter()
        .map(|s| (s.name.clone(), s.kind))
        .collect();

    for order in orders() {
        for a in by_order(&rows, &order.order_id) {
            let kind = kind_of[&a.sector];
            assert!(
                !CutTypeRouter::excludes(kind, order.cut_type),
                "{} ({}) 不应分配到 {}",
                order.order_id,
                order.cut_type,
                a.sector
            );
        }
    }
}

#[test]
fn test_delay_accounting() {
    let ledger = seeded_ledger();
    let planner = make_planner(
        &ledger,
        WorkCalendar::every_day(d(1), 60),
        cutting_pipeline(),
        Arc::new(FixedRetryDecider::decline()),
    );

    for (order, run) in run_all(&planner, &orders()) {
        let last = run.last_processed_day.unwrap();
        let processed = (last - order.start_date).num_days() + 1;
        let productive: HashSet<NaiveDate> = run
            .sectors
            .iter()
            .flat_map(|s| s.daily_output.keys().copied())
            .collect();
        let idle = processed as u32 - productive.len() as u32;

        assert_eq!(run.idle_days, idle, "{}", order.order_id);
        assert_eq!(run.delay, idle + run.priority_skips, "{}", order.order_id);
    }

    // A 在 01-02 因换型下限无法开工
    let (_, run_a) = run_all(
        &planner_fresh(),
        &[WorkOrder::new("A", 61, CutType::Manual, "PCP", d(1), d(20))],
    )
    .remove(0);
    assert!(run_a.sector("Corte manual").unwrap().daily_output.get(&d(2)).is_none());
    assert_eq!(run_a.delay, 1);
}

fn planner_fresh() -> BatchPlanner<CapacityLedger, WorkCalendar> {
    make_planner(
        &seeded_ledger(),
        WorkCalendar::every_day(d(1), 60),
        cutting_pipeline(),
        Arc::new(FixedRetryDecider::decline()),
    )
}

#[test]
fn test_setup_floor() {
    let ledger = seeded_ledger();
    let (pipeline, params) = cutting_pipeline();
    let planner = make_planner(
        &ledger,
        WorkCalendar::every_day(d(1), 60),
        (pipeline.clone(), params),
        Arc::new(FixedRetryDecider::decline()),
    );
    run_all(&planner, &orders());
    let rows = ledger.all_allocations().unwrap();

    // 余量低于换型下限的格子不再接新分配
    assert_eq!(ledger.already_planned("Corte manual", d(2)).unwrap(), 28);
    assert_eq!(ledger.already_planned("Costura", d(4)).unwrap(), 19);

    // 收尾批次例外: 待做量本身低于换型下限时允许一次做完，其余分配不得低于下限
    let setup_min: HashMap<&str, f64> =
        [("Corte manual", 3.0), ("Corte laser", 2.5), ("Costura", 2.0)].into();
    for order in orders() {
        let mine = by_order(&rows, &order.order_id);
        let route = CutTypeRouter::route(pipeline.sectors(), order.cut_type);
        for (idx, sector) in route.iter().enumerate() {
            let Some(floor) = setup_min.get(sector.name.as_str()) else {
                continue;
            };
            let own = cumulative(&mine, &sector.name);
            let upstream = cumulative(&mine, &route[idx - 1].name);
            for a in mine.iter().filter(|a| a.sector == sector.name) {
                if (a.quantity as f64) < *floor {
                    assert_eq!(
                        own[&a.plan_date],
                        cumulative_before(&upstream, a.plan_date),
                        "{} {} 在 {} 出现低于换型下限的分配",
                        order.order_id,
                        sector.name,
                        a.plan_date
                    );
                }
            }
        }
    }
}

// ==========================================
// 优先工序重排
// ==========================================

fn priority_order() -> WorkOrder {
    // 2024-01-01 为周一
    WorkOrder::new("P1", 20, CutType::Manual, "PCP", d(1), d(5))
}

#[test]
fn test_priority_skip_counts_as_delay_when_declined() {
    let ledger = Arc::new(CapacityLedger::new());
    let decider = Arc::new(FixedRetryDecider::decline());
    let planner = make_planner(
        &ledger,
        WorkCalendar::every_day(d(1), 60),
        priority_pipeline(),
        decider.clone(),
    );

    let (run, decision) = planner.plan_order(&priority_order()).unwrap();

    assert_eq!(decision, ReplanDecision::Declined { diff: 1 });
    assert_eq!(decider.asked_count(), 1);
    assert_eq!(run.last_day, Some(d(5)));
    assert_eq!(run.priority_skips, 1);
    assert_eq!(run.delay, 1);
    assert!(!run.replanned);
    let estampa_days: Vec<NaiveDate> = run
        .sector("Estampa")
        .unwrap()
        .daily_output
        .keys()
        .copied()
        .collect();
    assert_eq!(estampa_days, vec![d(2), d(4)]);
}

#[test]
fn test_idempotent_replan() {
    let ledger = Arc::new(CapacityLedger::new());
    let planner = make_planner(
        &ledger,
        WorkCalendar::every_day(d(1), 60),
        priority_pipeline(),
        Arc::new(FixedRetryDecider::accept()),
    );
    let order = priority_order();

    let (run, decision) = planner.plan_order(&order).unwrap();

    assert_eq!(decision, ReplanDecision::Replanned { diff: 1 });
    assert!(run.replanned);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.last_day, Some(d(4)));

    let rows = by_order(&ledger.all_allocations().unwrap(), "P1");
    let estampa: Vec<&DailyAllocation> = rows.iter().filter(|a| a.sector == "Estampa").collect();
    assert_eq!(estampa.iter().map(|a| a.quantity).sum::<i64>(), order.quantity);
    assert_eq!(
        estampa.iter().map(|a| a.plan_date).collect::<Vec<_>>(),
        vec![d(2), d(3)]
    );
    let costura_total: i64 = rows
        .iter()
        .filter(|a| a.sector == "Costura")
        .map(|a| a.quantity)
        .sum();
    assert_eq!(costura_total, order.quantity);
    assert_eq!(ledger.already_planned("PCP", d(1)).unwrap(), 20);

    // 同一工单再排一次，账本不重复累计
    planner.plan_order(&order).unwrap();
    let again = by_order(&ledger.all_allocations().unwrap(), "P1");
    let estampa_again: i64 = again
        .iter()
        .filter(|a| a.sector == "Estampa")
        .map(|a| a.quantity)
        .sum();
    assert_eq!(estampa_again, order.quantity);
}

#[test]
fn test_route_without_priority_sector_skips_replan() {
    let ledger = Arc::new(CapacityLedger::new());
    let decider = Arc::new(FixedRetryDecider::accept());
    let planner = make_planner(
        &ledger,
        WorkCalendar::every_day(d(1), 60),
        priority_pipeline(),
        decider.clone(),
    );
    // 从 Costura 起排，路线不经过 Estampa；交期余量 1 天，低于阈值
    let order = WorkOrder::new("P2", 20, CutType::Manual, "Costura", d(1), d(3));

    let (run, decision) = planner.plan_order(&order).unwrap();

    assert_eq!(decision, ReplanDecision::NotApplicable);
    assert_eq!(decider.asked_count(), 0);
    assert!(!run.replanned);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.last_day, Some(d(2)));
    assert_eq!(run.priority_skips, 0);

    let mut stored: Vec<(String, NaiveDate, i64)> = ledger
        .allocations_for_order("P2")
        .unwrap()
        .into_iter()
        .map(|a| (a.sector, a.plan_date, a.quantity))
        .collect();
    stored.sort();
    let mut recorded: Vec<(String, NaiveDate, i64)> = run
        .allocations
        .iter()
        .map(|a| (a.sector.clone(), a.plan_date, a.quantity))
        .collect();
    recorded.sort();
    assert_eq!(stored, recorded);
    assert_eq!(
        stored,
        vec![
            ("Costura".to_string(), d(1), 10),
            ("Costura".to_string(), d(2), 10),
        ]
    );
}
