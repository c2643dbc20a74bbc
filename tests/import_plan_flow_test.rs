// ==========================================
// 导入 → 排产 → 导出 全流程测试
// ==========================================
// 测试目标: 从 CSV 文件出发，经 AppState 完成一次完整批次
// 覆盖范围: 日历导入、参数导入、订单导入、批次汇总、工序报表
// ==========================================


use chrono::{Duration, Weekday};
use production_flow_aps::app::FixedRetryDecider;
use production_flow_aps::config::PlanningConfigReader;
use production_flow_aps::domain::{CutType, RunStatus};
use production_flow_aps::engine::{AllocationStore, BatchOrdering};
use production_flow_aps::importer::{CalendarImporter, OrderImportOptions, OrderImporter};
use production_flow_aps::report::{BatchSummary, SectorReportExporter};
use std::sync::Arc;
use test_helpers::{create_test_state, d, write_file};

fn calendar_lines(days: i64) -> Vec<String> {
    let mut lines = vec!["DATA;VALOR".to_string()];
    for offset in 0..days {
        let date = d(1) + Duration::days(offset);
        lines.push(format!("{};UTIL", date.format("%d/%m/%Y")));
    }
    lines
}

#[test]
fn test_csv_batch_end_to_end() {
    let (dir, state) = create_test_state();

    // 1. 日历
    let calendar = calendar_lines(60);
    let calendar_refs: Vec<&str> = calendar.iter().map(String::as_str).collect();
    let calendar_path = write_file(dir.path(), "calendario.csv", &calendar_refs);
    let written = CalendarImporter::new()
        .import_into(&state.calendar_repo, &calendar_path)
        .unwrap();
    assert_eq!(written, 60);

    // 2. 参数
    let config_path = write_file(
        dir.path(),
        "parametros.csv",
        &[
            "PARAMETRO;VALOR",
            "MAX_CORTE_MANUAL;60",
            "MAX_COSTURA;50",
            "SETUP;10",
            "PRIORIDADE_ESTAMPA;nao",
            "DIAS_ESTAMPA;SEG,QUA",
        ],
    );
    let imported = state.config_manager.import_parameters_csv(&config_path).unwrap();
    assert_eq!(imported, 5);

    let policy = state.config_manager.get_priority_policy().unwrap();
    assert!(!policy.enabled);
    assert_eq!(policy.weekdays, [Weekday::Mon, Weekday::Wed]);

    // 3. 订单（含一行坏数量、一行重复单号）
    let orders_path = write_file(
        dir.path(),
        "pedidos.csv",
        &[
            "Relatorio de pedidos;;;;;",
            "Pedido;Entrega;Cliente;Produto;QTD;Tipo de Corte",
            "5001;29/02/2024;ACME;Camiseta;100;Manual",
            "5002;15/02/2024;Globex;Jaqueta;40;Laser",
            "5003;15/02/2024;Initech;Bone;abc;Manual",
            "5001;01/03/2024;ACME;Camiseta;999;Manual",
        ],
    );
    let options = OrderImportOptions::new(&state.pipeline, d(1));
    let report = OrderImporter::new(options).import_file(&orders_path).unwrap();
    assert_eq!(report.orders.len(), 2);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].order_id.as_deref(), Some("5003"));
    assert_eq!(report.skipped(), 2);
    assert_eq!(report.orders[0].quantity, 100);
    assert_eq!(report.orders[1].cut_type, CutType::Laser);

    // 4. 排产（交期升序: 5002 先排）
    let batch = state
        .plan_orders(
            report.orders,
            &BatchOrdering::ByDeliveryDate,
            Arc::new(FixedRetryDecider::decline()),
        )
        .unwrap();
    assert_eq!(batch.completed_count(), 2);
    assert_eq!(batch.failed_count(), 0);

    for order_id in ["5001", "5002"] {
        let result = batch.outcome(order_id).unwrap().result.clone().unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.first_day, Some(d(1)));
    }

    // 裁剪方式互斥
    let manual_rows = state.allocation_repo.allocations_for_order("5001").unwrap();
    assert!(manual_rows.iter().all(|a| a.sector != "Corte laser"));
    let laser_rows = state.allocation_repo.allocations_for_order("5002").unwrap();
    assert!(laser_rows.iter().all(|a| a.sector != "Corte manual"));

    // 参数表中的上限生效
    let corte_total: i64 = manual_rows
        .iter()
        .filter(|a| a.sector == "Corte manual")
        .map(|a| a.quantity)
        .sum();
    assert_eq!(corte_total, 100);
    for offset in 0..60 {
        let day = d(1) + Duration::days(offset);
        assert!(state.allocation_repo.already_planned("Corte manual", day).unwrap() <= 60);
        assert!(state.allocation_repo.already_planned("Costura", day).unwrap() <= 50);
    }

    // 5. 汇总
    let summary = BatchSummary::from_report(&batch);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.rows[0].order_id, "5002");
    let rendered = summary.render();
    assert!(rendered.contains("5001"));
    assert!(rendered.contains("Globex"));

    let json_path = dir.path().join("resumo.json");
    summary.write_json(&json_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["completed"], 2);

    // 6. 工序报表
    let exp_dir = dir.path().join("exp");
    let files = state.export_sector_reports(&exp_dir).unwrap();
    assert_eq!(files, state.pipeline.len());

    let costura = std::fs::read_to_string(exp_dir.join(SectorReportExporter::file_name("Costura")))
        .unwrap();
    assert!(costura.starts_with("PEDIDO,CLIENTE,PRODUTO,DATA,QUANTIDADE"));
    assert!(costura.contains("5001"));
    assert!(costura.contains("5002"));

    // 7. 删除工单后报表不再包含该工单
    state.remove_order("5002").unwrap();
    state.export_sector_reports(&exp_dir).unwrap();
    let costura = std::fs::read_to_string(exp_dir.join(SectorReportExporter::file_name("Costura")))
        .unwrap();
    assert!(!costura.contains("5002"));
}
