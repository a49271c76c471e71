//! Hierarchical report aggregation.
//!
//! Builds company → division → client rollups from a set of checks. Each
//! check is expanded into pay units (one per relationship, or one implicit
//! unit), each unit is classified and priced, and the results are summed
//! bottom-up so every parent total is exactly the sum of its children.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::calculation::{classify, compute_pay, pay_units, reconcile_checks};
use crate::config::AggregationConfig;
use crate::models::{
    AggregateReport, Check, Client, ClientDirectory, ClientReport, Company, CompanyReport,
    DivisionReport, EXPENSES_DIVISION, PayTotals, RelationshipDetail,
};

use super::security::SecurityScope;

/// Display name for units that reference no client.
pub const UNASSIGNED_CLIENT_NAME: &str = "Unassigned";

#[derive(Debug, Default)]
struct ClientBucket {
    client_id: String,
    client_name: String,
    totals: PayTotals,
    check_ids: Vec<String>,
    seen: HashSet<String>,
}

impl ClientBucket {
    fn add(&mut self, check_id: &str, totals: PayTotals) {
        self.totals += totals;
        if self.seen.insert(check_id.to_string()) {
            self.check_ids.push(check_id.to_string());
        }
    }

    fn finish(self) -> ClientReport {
        ClientReport {
            client_id: self.client_id,
            client_name: self.client_name,
            totals: self.totals,
            check_ids: self.check_ids,
        }
    }
}

#[derive(Debug, Default)]
struct DivisionBucket {
    label: String,
    check_ids: Vec<String>,
    seen: HashSet<String>,
    clients: Vec<ClientBucket>,
    client_index: HashMap<String, usize>,
}

impl DivisionBucket {
    fn add(&mut self, check_id: &str, client: (String, String), totals: PayTotals) {
        if self.seen.insert(check_id.to_string()) {
            self.check_ids.push(check_id.to_string());
        }

        let index = match self.client_index.get(&client.0) {
            Some(&index) => index,
            None => {
                let index = self.clients.len();
                self.client_index.insert(client.0.clone(), index);
                self.clients.push(ClientBucket {
                    client_id: client.0,
                    client_name: client.1,
                    ..ClientBucket::default()
                });
                index
            }
        };
        self.clients[index].add(check_id, totals);
    }

    fn finish(self) -> DivisionReport {
        let mut clients: Vec<ClientReport> =
            self.clients.into_iter().map(ClientBucket::finish).collect();
        clients.sort_by(|a, b| {
            b.totals
                .total_amount
                .cmp(&a.totals.total_amount)
                .then_with(|| a.client_name.cmp(&b.client_name))
        });
        DivisionReport {
            division: self.label,
            totals: clients.iter().map(|c| c.totals).sum(),
            check_ids: self.check_ids,
            clients,
        }
    }
}

/// Resolves the (id, display name) of the client a pay unit belongs to.
fn resolve_client(
    check: &Check,
    unit: Option<&RelationshipDetail>,
    directory: &ClientDirectory<'_>,
) -> (String, String) {
    let (id, recorded_name) = match unit {
        Some(rel) if !rel.client_id.is_empty() => {
            (rel.client_id.as_str(), Some(rel.client_name.as_str()))
        }
        _ => match check.client_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => (id, check.client_name.as_deref()),
            None => match check.relationships().first() {
                Some(rel) => (rel.client_id.as_str(), Some(rel.client_name.as_str())),
                None => ("", None),
            },
        },
    };

    let name = directory
        .name_of(id)
        .or(recorded_name.filter(|n| !n.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| {
            if id.is_empty() {
                UNASSIGNED_CLIENT_NAME.to_string()
            } else {
                id.to_string()
            }
        });

    (id.to_string(), name)
}

fn sort_divisions(divisions: &mut [DivisionReport]) {
    divisions.sort_by(|a, b| {
        let a_expenses = a.division == EXPENSES_DIVISION;
        let b_expenses = b.division == EXPENSES_DIVISION;
        a_expenses
            .cmp(&b_expenses)
            .then_with(|| b.totals.total_amount.cmp(&a.totals.total_amount))
            .then_with(|| a.division.cmp(&b.division))
    });
}

/// Builds the report for one company from its checks.
pub fn build_company_report(
    company_id: &str,
    company_name: &str,
    checks: &[&Check],
    directory: &ClientDirectory<'_>,
    config: &AggregationConfig,
) -> CompanyReport {
    let mut buckets: Vec<DivisionBucket> = Vec::new();
    let mut bucket_index: HashMap<String, usize> = HashMap::new();

    for check in checks {
        for unit in pay_units(check) {
            let label = classify(check, unit, directory);
            let totals = compute_pay(check, unit, config.pto_policy).to_totals();
            let client = resolve_client(check, unit, directory);

            let index = match bucket_index.get(&label) {
                Some(&index) => index,
                None => {
                    let index = buckets.len();
                    bucket_index.insert(label.clone(), index);
                    buckets.push(DivisionBucket {
                        label,
                        ..DivisionBucket::default()
                    });
                    index
                }
            };
            buckets[index].add(&check.id, client, totals);
        }
    }

    let mut divisions: Vec<DivisionReport> =
        buckets.into_iter().map(DivisionBucket::finish).collect();
    sort_divisions(&mut divisions);

    CompanyReport {
        company_id: company_id.to_string(),
        company_name: company_name.to_string(),
        totals: divisions.iter().map(|d| d.totals).sum(),
        divisions,
        checks: checks.iter().map(|c| (*c).clone()).collect(),
    }
}

/// Builds the full aggregate report.
///
/// Steps: scope the checks, group them by company (companies without checks
/// are skipped), roll each company up by division and client, and sort
/// companies by descending total. Ties keep the order of `companies`, with
/// unknown company ids after them in first-seen order.
///
/// The function is pure; identical inputs produce identical output.
///
/// # Examples
///
/// ```
/// use payroll_engine::aggregation::{SecurityScope, build_report};
/// use payroll_engine::config::AggregationConfig;
/// use payroll_engine::models::{Check, Company, PayType};
/// use rust_decimal::Decimal;
///
/// let companies = vec![Company { id: "co_1".to_string(), name: "North".to_string(), active: true }];
/// let checks = vec![Check {
///     id: "chk_1".to_string(),
///     company_id: "co_1".to_string(),
///     pay_type: Some(PayType::Hourly),
///     hours: Some(Decimal::new(10, 0)),
///     rate: Some(Decimal::new(25, 0)),
///     amount: Some(Decimal::new(250, 0)),
///     ..Check::default()
/// }];
/// let report = build_report(&companies, &[], &checks, &SecurityScope::admin(), &AggregationConfig::default());
/// assert_eq!(report.companies[0].totals.total_amount, Decimal::new(250, 0));
/// assert!(report.warnings.is_empty());
/// ```
pub fn build_report(
    companies: &[Company],
    clients: &[Client],
    checks: &[Check],
    scope: &SecurityScope,
    config: &AggregationConfig,
) -> AggregateReport {
    let visible = scope.filter(checks);
    let directory = ClientDirectory::new(clients);

    let mut order: Vec<&str> = Vec::new();
    let mut names: HashMap<&str, &str> = HashMap::new();
    for company in companies {
        if !names.contains_key(company.id.as_str()) {
            order.push(&company.id);
            names.insert(&company.id, &company.name);
        }
    }

    let mut grouped: HashMap<&str, Vec<&Check>> = HashMap::new();
    for check in &visible {
        let company_id = check.company_id.as_str();
        if !names.contains_key(company_id) && !grouped.contains_key(company_id) {
            order.push(company_id);
        }
        grouped.entry(company_id).or_default().push(check);
    }

    let mut reports: Vec<CompanyReport> = order
        .iter()
        .filter_map(|company_id| {
            let company_checks = grouped.get(company_id)?;
            let name = names
                .get(company_id)
                .copied()
                .filter(|n| !n.is_empty())
                .unwrap_or(*company_id);
            Some(build_company_report(
                company_id,
                name,
                company_checks,
                &directory,
                config,
            ))
        })
        .collect();

    reports.sort_by(|a, b| b.totals.total_amount.cmp(&a.totals.total_amount));

    let warnings = reconcile_checks(&visible, config.pto_policy, config.reconciliation_tolerance);

    debug!(
        companies = reports.len(),
        checks = visible.len(),
        hidden = checks.len() - visible.len(),
        warnings = warnings.len(),
        "Built aggregate report"
    );

    AggregateReport {
        totals: reports.iter().map(|c| c.totals).sum(),
        companies: reports,
        warnings,
    }
}
