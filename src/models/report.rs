//! Report models produced by the hierarchical aggregator.
//!
//! A report is a derived view: company → division → client, each level
//! carrying the same [`PayTotals`] buckets. Parent totals are always the sum
//! of their children.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Check;

/// The reserved division label for expense checks.
pub const EXPENSES_DIVISION: &str = "Expenses";

/// The reserved division label for clients without a configured division.
pub const NO_DIVISION: &str = "No Division";

/// Summed pay buckets for one node of the report tree.
///
/// `total_amount` is always the sum of the five buckets; it is never copied
/// from a check's stored amount. Addition saturates at the decimal range
/// instead of panicking.
///
/// # Example
///
/// ```
/// use payroll_engine::models::PayTotals;
/// use rust_decimal::Decimal;
///
/// let totals = PayTotals::from_buckets(
///     Decimal::new(950, 0),
///     Decimal::new(125, 0),
///     Decimal::ZERO,
///     Decimal::new(25, 0),
///     Decimal::ZERO,
/// );
/// assert_eq!(totals.total_amount, Decimal::new(1100, 0));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayTotals {
    /// Regular, overtime, and holiday pay.
    pub hourly_amount: Decimal,
    /// Per-diem pay.
    pub perdiem_amount: Decimal,
    /// Paid time off.
    pub pto_amount: Decimal,
    /// Other-pay lines.
    pub other_pay_amount: Decimal,
    /// Expense reimbursements.
    pub expenses_amount: Decimal,
    /// Sum of the five buckets above.
    pub total_amount: Decimal,
}

impl PayTotals {
    /// Builds totals from the five buckets, deriving `total_amount`.
    pub fn from_buckets(
        hourly: Decimal,
        perdiem: Decimal,
        pto: Decimal,
        other_pay: Decimal,
        expenses: Decimal,
    ) -> Self {
        Self {
            hourly_amount: hourly,
            perdiem_amount: perdiem,
            pto_amount: pto,
            other_pay_amount: other_pay,
            expenses_amount: expenses,
            total_amount: hourly
                .saturating_add(perdiem)
                .saturating_add(pto)
                .saturating_add(other_pay)
                .saturating_add(expenses),
        }
    }

    /// Returns true when `total_amount` equals the sum of the buckets.
    pub fn is_consistent(&self) -> bool {
        self.total_amount
            == self
                .hourly_amount
                .saturating_add(self.perdiem_amount)
                .saturating_add(self.pto_amount)
                .saturating_add(self.other_pay_amount)
                .saturating_add(self.expenses_amount)
    }
}

impl Add for PayTotals {
    type Output = PayTotals;

    fn add(self, rhs: PayTotals) -> PayTotals {
        PayTotals {
            hourly_amount: self.hourly_amount.saturating_add(rhs.hourly_amount),
            perdiem_amount: self.perdiem_amount.saturating_add(rhs.perdiem_amount),
            pto_amount: self.pto_amount.saturating_add(rhs.pto_amount),
            other_pay_amount: self.other_pay_amount.saturating_add(rhs.other_pay_amount),
            expenses_amount: self.expenses_amount.saturating_add(rhs.expenses_amount),
            total_amount: self.total_amount.saturating_add(rhs.total_amount),
        }
    }
}

impl AddAssign for PayTotals {
    fn add_assign(&mut self, rhs: PayTotals) {
        *self = *self + rhs;
    }
}

impl Sum for PayTotals {
    fn sum<I: Iterator<Item = PayTotals>>(iter: I) -> Self {
        iter.fold(PayTotals::default(), Add::add)
    }
}

impl<'a> Sum<&'a PayTotals> for PayTotals {
    fn sum<I: Iterator<Item = &'a PayTotals>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// One client's slice of a division.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientReport {
    /// Client identifier; empty when the check named no client.
    pub client_id: String,
    /// Client display name.
    pub client_name: String,
    /// Summed pay for this client within the division.
    #[serde(flatten)]
    pub totals: PayTotals,
    /// Distinct checks contributing to this client.
    pub check_ids: Vec<String>,
}

impl ClientReport {
    /// Number of distinct checks.
    pub fn check_count(&self) -> usize {
        self.check_ids.len()
    }
}

/// One division bucket within a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionReport {
    /// Division label.
    pub division: String,
    /// Summed pay; equal to the sum of `clients`.
    #[serde(flatten)]
    pub totals: PayTotals,
    /// Distinct checks touching this division, in first-seen order.
    pub check_ids: Vec<String>,
    /// Per-client breakdown.
    pub clients: Vec<ClientReport>,
}

impl DivisionReport {
    /// Number of distinct checks.
    pub fn check_count(&self) -> usize {
        self.check_ids.len()
    }
}

/// The rollup for one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyReport {
    /// Company identifier.
    pub company_id: String,
    /// Company display name.
    pub company_name: String,
    /// Summed pay; equal to the sum of `divisions`.
    #[serde(flatten)]
    pub totals: PayTotals,
    /// Division breakdown.
    pub divisions: Vec<DivisionReport>,
    /// The checks backing this report, for drill-down and export.
    pub checks: Vec<Check>,
}

impl CompanyReport {
    /// Finds a division by label.
    pub fn division(&self, label: &str) -> Option<&DivisionReport> {
        self.divisions.iter().find(|d| d.division == label)
    }
}

/// A non-fatal data-quality finding raised while building a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// The check the warning refers to.
    pub check_id: String,
    /// A human-readable description.
    pub message: String,
    /// The severity level ("low", "medium", "high").
    pub severity: String,
    /// The stored check amount, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored: Option<Decimal>,
    /// The amount computed from the pay fields.
    pub computed: Decimal,
}

/// The complete output of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    /// Companies ordered by descending total.
    pub companies: Vec<CompanyReport>,
    /// Grand totals across every company.
    pub totals: PayTotals,
    /// Reconciliation warnings, in check order.
    pub warnings: Vec<ReportWarning>,
}

/// A flat client/division rollup row across companies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDepartmentStats {
    /// Client identifier (`"expenses"` for the synthetic row).
    pub client_id: String,
    /// Client display name.
    pub client_name: String,
    /// Division label.
    pub division: String,
    /// Companies that contributed to this row, in first-seen order.
    pub company_ids: Vec<String>,
    /// Summed pay.
    #[serde(flatten)]
    pub totals: PayTotals,
    /// Distinct contributing checks.
    pub check_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn totals(h: &str, p: &str) -> PayTotals {
        PayTotals::from_buckets(dec(h), dec(p), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    }

    #[test]
    fn test_from_buckets_derives_total() {
        let t = PayTotals::from_buckets(dec("1"), dec("2"), dec("3"), dec("4"), dec("5"));
        assert_eq!(t.total_amount, dec("15"));
        assert!(t.is_consistent());
    }

    #[test]
    fn test_sum_preserves_consistency() {
        let parts = vec![totals("10.50", "3"), totals("0.25", "0"), totals("0", "7.75")];
        let sum: PayTotals = parts.iter().sum();
        assert_eq!(sum.hourly_amount, dec("10.75"));
        assert_eq!(sum.perdiem_amount, dec("10.75"));
        assert_eq!(sum.total_amount, dec("21.50"));
        assert!(sum.is_consistent());
    }

    #[test]
    fn test_addition_saturates_instead_of_panicking() {
        let huge = PayTotals::from_buckets(Decimal::MAX, Decimal::MAX, dec("1"), dec("0"), dec("0"));
        assert_eq!(huge.total_amount, Decimal::MAX);
        let sum = huge + huge;
        assert_eq!(sum.hourly_amount, Decimal::MAX);
        assert_eq!(sum.total_amount, Decimal::MAX);
    }

    #[test]
    fn test_totals_serialize_camel_case_flattened() {
        let division = DivisionReport {
            division: "Ops".to_string(),
            totals: totals("1", "2"),
            check_ids: vec!["c1".to_string()],
            clients: vec![],
        };
        let value = serde_json::to_value(&division).unwrap();
        assert_eq!(value["division"], "Ops");
        assert_eq!(value["hourlyAmount"], "1");
        assert_eq!(value["totalAmount"], "3");
        assert_eq!(value["checkIds"][0], "c1");
    }
}
