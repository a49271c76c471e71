//! Cross-company client/division statistics.

use std::collections::{HashMap, HashSet};

use crate::models::{AggregateReport, ClientDepartmentStats, EXPENSES_DIVISION, PayTotals};

/// Client id of the synthetic expenses row.
pub const EXPENSES_CLIENT_ID: &str = "expenses";

#[derive(Debug, Default)]
struct StatsRow {
    client_id: String,
    client_name: String,
    division: String,
    company_ids: Vec<String>,
    totals: PayTotals,
    checks: HashSet<String>,
}

impl StatsRow {
    fn add(&mut self, company_id: &str, totals: PayTotals, check_ids: &[String]) {
        if !self.company_ids.iter().any(|id| id == company_id) {
            self.company_ids.push(company_id.to_string());
        }
        self.totals += totals;
        self.checks.extend(check_ids.iter().cloned());
    }

    fn finish(self) -> ClientDepartmentStats {
        ClientDepartmentStats {
            client_id: self.client_id,
            client_name: self.client_name,
            division: self.division,
            company_ids: self.company_ids,
            totals: self.totals,
            check_count: self.checks.len(),
        }
    }
}

/// Flattens a report into one row per (client, division) across companies.
///
/// Rows are ordered by descending total, then client name. Expense checks
/// never appear in client rows; when any exist they are summarized in a
/// single trailing row with client id `"expenses"` and division
/// `"Expenses"`.
pub fn build_client_department_stats(report: &AggregateReport) -> Vec<ClientDepartmentStats> {
    let mut rows: Vec<StatsRow> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut expenses = StatsRow {
        client_id: EXPENSES_CLIENT_ID.to_string(),
        client_name: EXPENSES_DIVISION.to_string(),
        division: EXPENSES_DIVISION.to_string(),
        ..StatsRow::default()
    };

    for company in &report.companies {
        for division in &company.divisions {
            if division.division == EXPENSES_DIVISION {
                expenses.add(&company.company_id, division.totals, &division.check_ids);
                continue;
            }

            for client in &division.clients {
                let key = (client.client_id.clone(), division.division.clone());
                let position = match index.get(&key) {
                    Some(&position) => position,
                    None => {
                        rows.push(StatsRow {
                            client_id: client.client_id.clone(),
                            client_name: client.client_name.clone(),
                            division: division.division.clone(),
                            ..StatsRow::default()
                        });
                        index.insert(key, rows.len() - 1);
                        rows.len() - 1
                    }
                };
                rows[position].add(&company.company_id, client.totals, &client.check_ids);
            }
        }
    }

    let mut stats: Vec<ClientDepartmentStats> = rows.into_iter().map(StatsRow::finish).collect();
    stats.sort_by(|a, b| {
        b.totals
            .total_amount
            .cmp(&a.totals.total_amount)
            .then_with(|| a.client_name.cmp(&b.client_name))
    });

    if !expenses.checks.is_empty() {
        stats.push(expenses.finish());
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{SecurityScope, build_report};
    use crate::config::AggregationConfig;
    use crate::models::{Check, Client, Company, PayType, RelationshipDetail};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn client(id: &str, name: &str, division: &str) -> Client {
        Client {
            id: id.to_string(),
            name: name.to_string(),
            division: Some(division.to_string()),
            active: true,
            company_ids: vec!["co_1".to_string(), "co_2".to_string()],
        }
    }

    fn hourly(id: &str, company: &str, client: &str, amount: &str) -> Check {
        Check {
            id: id.to_string(),
            company_id: company.to_string(),
            client_id: Some(client.to_string()),
            pay_type: Some(PayType::Hourly),
            hours: Some(Decimal::ONE),
            rate: Some(dec(amount)),
            amount: Some(dec(amount)),
            ..Check::default()
        }
    }

    fn expense(id: &str, company: &str, amount: &str) -> Check {
        Check {
            id: id.to_string(),
            company_id: company.to_string(),
            client_id: Some("cl_a".to_string()),
            is_expense: true,
            amount: Some(dec(amount)),
            ..Check::default()
        }
    }

    fn stats_for(checks: &[Check]) -> Vec<ClientDepartmentStats> {
        let companies = vec![
            Company {
                id: "co_1".to_string(),
                name: "North".to_string(),
                active: true,
            },
            Company {
                id: "co_2".to_string(),
                name: "South".to_string(),
                active: true,
            },
        ];
        let clients = vec![client("cl_a", "Acme", "Ops"), client("cl_b", "Globex", "Field")];
        let report = build_report(
            &companies,
            &clients,
            checks,
            &SecurityScope::admin(),
            &AggregationConfig::default(),
        );
        build_client_department_stats(&report)
    }

    /// CS-001: a client spanning companies becomes one row
    #[test]
    fn test_rows_merge_across_companies() {
        let stats = stats_for(&[
            hourly("k1", "co_1", "cl_a", "100"),
            hourly("k2", "co_2", "cl_a", "50"),
            hourly("k3", "co_2", "cl_b", "200"),
        ]);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].client_name, "Globex");
        assert_eq!(stats[1].client_id, "cl_a");
        assert_eq!(stats[1].totals.total_amount, dec("150"));
        assert_eq!(stats[1].check_count, 2);
        assert_eq!(stats[1].company_ids.len(), 2);
    }

    /// CS-002: expenses become one trailing synthetic row
    #[test]
    fn test_expense_row_is_last() {
        let stats = stats_for(&[
            hourly("k1", "co_1", "cl_a", "10"),
            expense("e1", "co_1", "900"),
            expense("e2", "co_2", "100"),
        ]);
        let last = stats.last().unwrap();
        assert_eq!(last.client_id, EXPENSES_CLIENT_ID);
        assert_eq!(last.client_name, "Expenses");
        assert_eq!(last.division, "Expenses");
        assert_eq!(last.totals.expenses_amount, dec("1000"));
        assert_eq!(last.check_count, 2);
        assert_eq!(stats[0].totals.expenses_amount, Decimal::ZERO);
    }

    /// CS-003: no expense checks means no synthetic row
    #[test]
    fn test_no_expense_row_without_expenses() {
        let stats = stats_for(&[hourly("k1", "co_1", "cl_a", "10")]);
        assert!(stats.iter().all(|s| s.client_id != EXPENSES_CLIENT_ID));
    }

    /// CS-004: a multi-relationship check counts once per row
    #[test]
    fn test_check_counted_once_per_row() {
        let mut r1 = RelationshipDetail::for_client("r1", "cl_a", "Acme");
        r1.hours = Some(dec("1"));
        let mut r2 = RelationshipDetail::for_client("r2", "cl_a", "Acme");
        r2.hours = Some(dec("2"));
        let check = Check {
            id: "k1".to_string(),
            company_id: "co_1".to_string(),
            pay_type: Some(PayType::Hourly),
            rate: Some(dec("10")),
            relationship_details: Some(vec![r1, r2]),
            amount: Some(dec("30")),
            ..Check::default()
        };
        let stats = stats_for(&[check]);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].check_count, 1);
        assert_eq!(stats[0].totals.hourly_amount, dec("30"));
    }
}
