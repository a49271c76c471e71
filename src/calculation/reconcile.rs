//! Reconciliation of stored check totals against computed pay.
//!
//! A check's stored `amount` is the ground truth for what was paid, but the
//! report always aggregates computed values. When the two disagree by more
//! than the configured tolerance a [`ReportWarning`] is raised for triage.
//! Checks whose pay had to drop an out-of-range component are flagged too.

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::PtoPolicy;
use crate::models::{Check, PayTotals, ReportWarning};

use super::pay::{PayBreakdown, compute_unit_pay, max_component_amount};

/// Warning code for a stored amount that disagrees with the computed total.
pub const INCONSISTENT_TOTAL: &str = "INCONSISTENT_TOTAL";

/// Warning code for a check with a pay component counted as zero because
/// it was out of range.
pub const AMOUNT_OUT_OF_RANGE: &str = "AMOUNT_OUT_OF_RANGE";

/// Compares a check's stored amount with its computed total.
///
/// A missing stored amount is compared as zero. Returns `None` when the
/// difference is within `tolerance`.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::reconcile_check;
/// use payroll_engine::models::Check;
/// use rust_decimal::Decimal;
///
/// let check = Check {
///     id: "chk_001".to_string(),
///     amount: Some(Decimal::new(100, 0)),
///     ..Check::default()
/// };
/// let warning = reconcile_check(&check, Decimal::new(90, 0), Decimal::new(1, 2)).unwrap();
/// assert_eq!(warning.code, "INCONSISTENT_TOTAL");
/// ```
pub fn reconcile_check(
    check: &Check,
    computed: Decimal,
    tolerance: Decimal,
) -> Option<ReportWarning> {
    let stored = check.amount.unwrap_or(Decimal::ZERO);
    let difference = stored.checked_sub(computed).map(|d| d.abs());
    if difference.is_some_and(|d| d <= tolerance) {
        return None;
    }

    let within_ten_percent = difference
        .and_then(|d| d.checked_mul(Decimal::TEN))
        .is_some_and(|scaled| scaled <= stored.abs());
    let severity = if stored.is_zero() || !within_ten_percent {
        "high"
    } else {
        "medium"
    };

    let difference = match difference {
        Some(d) => format!("${}", d.normalize()),
        None => "an unrepresentable amount".to_string(),
    };

    Some(ReportWarning {
        code: INCONSISTENT_TOTAL.to_string(),
        check_id: check.id.clone(),
        message: format!(
            "Stored amount ${} differs from computed total ${} by {}",
            stored.normalize(),
            computed.normalize(),
            difference
        ),
        severity: severity.to_string(),
        stored: check.amount,
        computed,
    })
}

fn out_of_range_warning(check: &Check, computed: Decimal) -> ReportWarning {
    ReportWarning {
        code: AMOUNT_OUT_OF_RANGE.to_string(),
        check_id: check.id.clone(),
        message: format!(
            "A pay component exceeded ${} and was counted as zero",
            max_component_amount()
        ),
        severity: "high".to_string(),
        stored: check.amount,
        computed,
    }
}

/// Reconciles every check, logging and collecting the warnings.
pub fn reconcile_checks<'a, I>(checks: I, policy: PtoPolicy, tolerance: Decimal) -> Vec<ReportWarning>
where
    I: IntoIterator<Item = &'a Check>,
{
    let mut warnings = Vec::new();
    for check in checks {
        let units = compute_unit_pay(check, policy);
        let computed = units
            .iter()
            .map(PayBreakdown::to_totals)
            .sum::<PayTotals>()
            .total_amount;

        if units.iter().any(|unit| unit.overflowed) {
            warn!(
                check_id = %check.id,
                computed = %computed,
                "Check has an out-of-range pay component"
            );
            warnings.push(out_of_range_warning(check, computed));
        }

        if let Some(warning) = reconcile_check(check, computed, tolerance) {
            warn!(
                check_id = %warning.check_id,
                stored = ?warning.stored,
                computed = %warning.computed,
                severity = %warning.severity,
                "Check total does not reconcile"
            );
            warnings.push(warning);
        }
    }
    warnings
}
