//! End-to-end tests for the payroll aggregation engine.
//!
//! This suite covers:
//! - Hourly and per-diem pay through the report service
//! - Multi-client checks and division check counts
//! - Container/Projects division override
//! - Expense isolation and the synthetic expenses stats row
//! - Security scoping
//! - Live synchronization feeding the aggregator
//! - Error cases

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use tower::ServiceExt;

use payroll_engine::aggregation::{SecurityScope, build_client_department_stats, build_report};
use payroll_engine::api::{AppState, create_router};
use payroll_engine::config::ConfigLoader;
use payroll_engine::models::{Check, Client, Company};
use payroll_engine::sync::{ChunkedSynchronizer, DocumentStore, LiveQuery, MemoryStore, QuerySpec};

// =============================================================================
// Test Helpers
// =============================================================================

fn create_test_state() -> AppState {
    AppState::load("./config").expect("Failed to load config")
}

fn create_router_for_test() -> Router {
    create_router(create_test_state())
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Reads a decimal that may be serialized as a string or a number.
fn json_decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => decimal(s),
        other => decimal(&other.to_string()),
    }
}

async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

fn admin_request(checks: Vec<Value>) -> Value {
    json!({
        "companies": [
            {"id": "co_1", "name": "North Staffing"},
            {"id": "co_2", "name": "South Staffing"}
        ],
        "clients": [
            {"id": "cl_ops_1", "name": "Harbor Freight", "division": "Ops", "companyIds": ["co_1"]},
            {"id": "cl_ops_2", "name": "Dockside", "division": "Ops", "companyIds": ["co_1"]},
            {"id": "cl_field", "name": "Ridge Farms", "division": "Field", "companyIds": ["co_1", "co_2"]},
            {"id": "cl_yard", "name": "Container", "division": "Yard", "companyIds": ["co_2"]},
            {"id": "cl_projects", "name": "Projects", "division": "Field", "companyIds": ["co_2"]}
        ],
        "checks": checks,
        "scope": {"role": "admin", "visibleClientIds": []}
    })
}

fn division<'a>(company: &'a Value, label: &str) -> &'a Value {
    company["divisions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["division"] == label)
        .unwrap_or_else(|| panic!("division {} not found in {}", label, company))
}

// =============================================================================
// Pay Scenarios
// =============================================================================

/// Hourly check: 40h at $20 plus 5 OT hours at the default 1.5x = $950
#[tokio::test]
async fn test_hourly_check_with_default_overtime() {
    let request = admin_request(vec![json!({
        "id": "chk_hourly",
        "companyId": "co_1",
        "clientId": "cl_ops_1",
        "payType": "hourly",
        "hours": 40,
        "rate": 20,
        "otHours": 5,
        "holidayHours": 0,
        "amount": 950
    })]);

    let (status, body) = post_json(create_router_for_test(), "/reports", request).await;
    assert_eq!(status, StatusCode::OK);

    let company = &body["companies"][0];
    assert_eq!(json_decimal(&company["hourlyAmount"]), decimal("950"));
    assert_eq!(json_decimal(&company["totalAmount"]), decimal("950"));
    assert!(body["warnings"].as_array().unwrap().is_empty());
}

/// Per-diem breakdown: Monday $50 + Wednesday $75 = $125
#[tokio::test]
async fn test_perdiem_breakdown() {
    let request = admin_request(vec![json!({
        "id": "chk_perdiem",
        "companyId": "co_1",
        "clientId": "cl_field",
        "payType": "perdiem",
        "perdiemBreakdown": true,
        "perdiemMonday": 50,
        "perdiemTuesday": 0,
        "perdiemWednesday": "75",
        "amount": 125
    })]);

    let (status, body) = post_json(create_router_for_test(), "/reports", request).await;
    assert_eq!(status, StatusCode::OK);

    let field = division(&body["companies"][0], "Field");
    assert_eq!(json_decimal(&field["perdiemAmount"]), decimal("125"));
    assert_eq!(json_decimal(&field["hourlyAmount"]), Decimal::ZERO);
}

/// Two relationships in the same division count the check once
#[tokio::test]
async fn test_multi_client_check_counted_once_per_division() {
    let request = admin_request(vec![json!({
        "id": "chk_multi",
        "companyId": "co_1",
        "payType": "hourly",
        "rate": 20,
        "relationshipDetails": [
            {"id": "rel_1", "clientId": "cl_ops_1", "clientName": "Harbor Freight", "hours": 10},
            {"id": "rel_2", "clientId": "cl_ops_2", "clientName": "Dockside", "hours": 5}
        ],
        "amount": 300
    })]);

    let (_, body) = post_json(create_router_for_test(), "/reports", request).await;
    let ops = division(&body["companies"][0], "Ops");
    assert_eq!(ops["checkIds"].as_array().unwrap().len(), 1);
    assert_eq!(ops["clients"].as_array().unwrap().len(), 2);
    assert_eq!(json_decimal(&ops["totalAmount"]), decimal("300"));
    assert_eq!(ops["clients"][0]["clientName"], "Harbor Freight");
}

/// A Container relationship alongside a client named Projects reports under Container
#[tokio::test]
async fn test_container_projects_override() {
    let request = admin_request(vec![json!({
        "id": "chk_yard",
        "companyId": "co_2",
        "clientName": "Projects",
        "payType": "hourly",
        "rate": 10,
        "relationshipDetails": [
            {"id": "rel_1", "clientId": "cl_yard", "clientName": "Container", "hours": 4},
            {"id": "rel_2", "clientId": "cl_projects", "clientName": "Projects", "hours": 6}
        ],
        "amount": 100
    })]);

    let (_, body) = post_json(create_router_for_test(), "/reports", request).await;
    let company = &body["companies"][0];
    let divisions = company["divisions"].as_array().unwrap();
    assert_eq!(divisions.len(), 1);
    assert_eq!(divisions[0]["division"], "Container");
    assert_eq!(json_decimal(&divisions[0]["totalAmount"]), decimal("100"));
}

/// Expense checks never leak into client divisions
#[tokio::test]
async fn test_expense_isolation_and_stats_row() {
    let checks = vec![
        json!({
            "id": "chk_wage",
            "companyId": "co_1",
            "clientId": "cl_ops_1",
            "payType": "hourly",
            "hours": 10,
            "rate": 30,
            "amount": 300
        }),
        json!({
            "id": "chk_mileage",
            "companyId": "co_1",
            "clientId": "cl_ops_1",
            "isExpense": true,
            "expenseName": "Mileage",
            "hours": 99,
            "rate": 99,
            "amount": "42.50"
        }),
    ];

    let (_, report) = post_json(create_router_for_test(), "/reports", admin_request(checks.clone())).await;
    let company = &report["companies"][0];
    let ops = division(company, "Ops");
    assert_eq!(json_decimal(&ops["expensesAmount"]), Decimal::ZERO);
    assert_eq!(json_decimal(&ops["totalAmount"]), decimal("300"));
    let divisions = company["divisions"].as_array().unwrap();
    assert_eq!(divisions.last().unwrap()["division"], "Expenses");
    assert_eq!(json_decimal(&divisions.last().unwrap()["expensesAmount"]), decimal("42.50"));

    let (status, stats) =
        post_json(create_router_for_test(), "/reports/client-stats", admin_request(checks)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = stats.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["clientId"], "cl_ops_1");
    assert_eq!(rows[1]["clientId"], "expenses");
    assert_eq!(rows[1]["checkCount"], 1);
}

/// A stale stored amount is reported but never used as the total
#[tokio::test]
async fn test_reconciliation_warning() {
    let request = admin_request(vec![json!({
        "id": "chk_stale",
        "companyId": "co_1",
        "clientId": "cl_ops_1",
        "payType": "hourly",
        "hours": 40,
        "rate": 20,
        "amount": 700
    })]);

    let (_, body) = post_json(create_router_for_test(), "/reports", request).await;
    assert_eq!(json_decimal(&body["totals"]["totalAmount"]), decimal("800"));
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["code"], "INCONSISTENT_TOTAL");
    assert_eq!(warnings[0]["checkId"], "chk_stale");
    assert_eq!(warnings[0]["severity"], "high");
}

// =============================================================================
// Security
// =============================================================================

#[tokio::test]
async fn test_member_scope_sees_only_visible_clients() {
    let mut request = admin_request(vec![
        json!({"id": "chk_1", "companyId": "co_1", "clientId": "cl_ops_1", "payType": "hourly", "hours": 1, "rate": 10, "amount": 10}),
        json!({"id": "chk_2", "companyId": "co_2", "clientId": "cl_yard", "payType": "hourly", "hours": 1, "rate": 10, "amount": 10}),
        json!({
            "id": "chk_3",
            "companyId": "co_2",
            "payType": "hourly",
            "rate": 10,
            "relationshipDetails": [
                {"id": "rel_1", "clientId": "cl_field", "clientName": "Ridge Farms", "hours": 1},
                {"id": "rel_2", "clientId": "cl_projects", "clientName": "Projects", "hours": 1}
            ],
            "amount": 20
        }),
    ]);
    request["scope"] = json!({"role": "manager", "visibleClientIds": ["cl_field"]});

    let (_, body) = post_json(create_router_for_test(), "/reports", request).await;
    let companies = body["companies"].as_array().unwrap();
    assert_eq!(companies.len(), 1);
    let check_ids: Vec<&str> = companies[0]["checks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(check_ids, vec!["chk_3"]);
    // Whole checks are kept, including the relationship outside the scope.
    assert_eq!(json_decimal(&companies[0]["totalAmount"]), decimal("20"));
}

// =============================================================================
// Filters and Errors
// =============================================================================

#[tokio::test]
async fn test_filters_restrict_checks() {
    let mut request = admin_request(vec![
        json!({"id": "chk_1", "companyId": "co_1", "clientId": "cl_ops_1", "payType": "hourly", "hours": 1, "rate": 10, "amount": 10, "paid": true, "createdAt": "2024-03-05T10:00:00Z"}),
        json!({"id": "chk_2", "companyId": "co_1", "clientId": "cl_ops_1", "payType": "hourly", "hours": 1, "rate": 10, "amount": 10, "paid": false, "createdAt": "2024-03-05T10:00:00Z"}),
        json!({"id": "chk_3", "companyId": "co_1", "clientId": "cl_ops_1", "payType": "hourly", "hours": 1, "rate": 10, "amount": 10, "paid": true, "createdAt": "2024-04-05T10:00:00Z"}),
    ]);
    request["filters"] = json!({
        "paid": true,
        "createdFrom": "2024-03-01T00:00:00Z",
        "createdTo": "2024-03-31T23:59:59Z"
    });

    let (status, body) = post_json(create_router_for_test(), "/reports", request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_decimal(&body["totals"]["totalAmount"]), decimal("10"));
    assert_eq!(body["companies"][0]["checks"][0]["id"], "chk_1");
}

#[tokio::test]
async fn test_malformed_json_returns_400() {
    let response = create_router_for_test()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/reports")
                .header("Content-Type", "application/json")
                .body(Body::from("{\"checks\": ["))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_content_type_returns_400() {
    let response = create_router_for_test()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/reports")
                .body(Body::from(admin_request(vec![]).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Live Synchronization
// =============================================================================

fn wage_check(id: &str, company: &str, client: &str, hours: i64) -> Check {
    Check {
        id: id.to_string(),
        company_id: company.to_string(),
        client_id: Some(client.to_string()),
        pay_type: Some(payroll_engine::models::PayType::Hourly),
        hours: Some(Decimal::from(hours)),
        rate: Some(Decimal::from(10)),
        amount: Some(Decimal::from(hours * 10)),
        ..Check::default()
    }
}

/// Many visible clients are synchronized in chunks and aggregated as one set
#[tokio::test]
async fn test_live_query_feeds_report() {
    let config = ConfigLoader::load("./config").unwrap();
    let companies = vec![Company {
        id: "co_1".to_string(),
        name: "North Staffing".to_string(),
        active: true,
    }];
    let clients: Vec<Client> = (0..25)
        .map(|i| Client {
            id: format!("cl_{:02}", i),
            name: format!("Client {:02}", i),
            division: Some(if i % 2 == 0 { "Even" } else { "Odd" }.to_string()),
            active: true,
            company_ids: vec!["co_1".to_string()],
        })
        .collect();
    let visible: Vec<String> = clients.iter().map(|c| c.id.clone()).collect();

    let store: MemoryStore<Check> = MemoryStore::new();
    store.upsert_many(
        "checks",
        visible
            .iter()
            .enumerate()
            .map(|(i, client)| wage_check(&format!("chk_{:02}", i), "co_1", client, 1)),
    );
    store.upsert("checks", wage_check("chk_other", "co_1", "cl_hidden", 100));

    let backend: Arc<dyn DocumentStore<Check>> = Arc::new(store.clone());
    let mut live = LiveQuery::new(ChunkedSynchronizer::from_config(backend, config.sync()));
    let mut receiver = live.watch();
    live.set_query(Some(
        QuerySpec::new("checks")
            .where_eq("companyId", "co_1")
            .where_in("clientId", visible.clone()),
    ))
    .unwrap();
    assert_eq!(store.active_listeners(), 3);

    let state = tokio::time::timeout(
        Duration::from_secs(2),
        receiver.wait_for(|s| !s.loading),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert_eq!(state.records.len(), 25);

    let scope = SecurityScope::member(visible.clone());
    let report = build_report(&companies, &clients, &state.records, &scope, config.aggregation());
    assert_eq!(report.totals.total_amount, decimal("250"));
    assert_eq!(report.companies[0].divisions.len(), 2);
    assert_eq!(report.companies[0].division("Even").unwrap().check_count(), 13);

    store.upsert("checks", wage_check("chk_late", "co_1", "cl_24", 5));
    let state = tokio::time::timeout(
        Duration::from_secs(2),
        receiver.wait_for(|s| s.records.len() == 26),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    let report = build_report(&companies, &clients, &state.records, &scope, config.aggregation());
    assert_eq!(report.totals.total_amount, decimal("300"));
    assert_eq!(build_client_department_stats(&report).len(), 25);

    live.set_query(None).unwrap();
    assert_eq!(store.active_listeners(), 0);
    assert!(live.state().records.is_empty());
}
