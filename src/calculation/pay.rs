//! Pay calculation for a check or one of its relationships.
//!
//! Every numeric field resolves independently: the relationship's value when
//! present (zero included), else the check's value, else zero. Results are
//! split into the report buckets (hourly, per-diem, PTO, other-pay, expense).
//!
//! Arithmetic is checked. A component that overflows or exceeds
//! [`max_component_amount`] counts as zero and marks the result as
//! `overflowed`, so report totals stay representable.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PtoPolicy;
use crate::models::{Check, PayTotals, PayType, RelationshipDetail};

/// Returns the default overtime multiplier (time and a half).
pub fn overtime_multiplier() -> Decimal {
    Decimal::new(15, 1)
}

/// Returns the default holiday multiplier (double time).
pub fn holiday_multiplier() -> Decimal {
    Decimal::new(20, 1)
}

/// Returns the largest magnitude a single pay component may take.
pub fn max_component_amount() -> Decimal {
    Decimal::new(1_000_000_000_000_000, 0)
}

/// The hourly components of a pay calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyPay {
    /// `hours * rate`.
    pub regular: Decimal,
    /// `ot_hours * ot_rate`.
    pub overtime: Decimal,
    /// `holiday_hours * holiday_rate`.
    pub holiday: Decimal,
    /// True when a component was out of range and counted as zero.
    #[serde(default)]
    pub overflowed: bool,
}

impl HourlyPay {
    /// Sum of regular, overtime, and holiday pay.
    pub fn total(&self) -> Decimal {
        self.regular + self.overtime + self.holiday
    }
}

/// The result of calculating pay for one check or relationship.
///
/// All buckets are non-negative and bounded by [`max_component_amount`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayBreakdown {
    /// Hourly detail; `hourly` is derived from it.
    pub hourly_detail: HourlyPay,
    /// Hourly subtotal reported in the hourly bucket.
    pub hourly: Decimal,
    /// Per-diem subtotal.
    pub perdiem: Decimal,
    /// Paid time off.
    pub pto: Decimal,
    /// Other-pay subtotal.
    pub other_pay: Decimal,
    /// Expense amount.
    pub expense: Decimal,
    /// True when any component was out of range and counted as zero.
    #[serde(default)]
    pub overflowed: bool,
}

impl PayBreakdown {
    /// Sum of all buckets.
    pub fn total(&self) -> Decimal {
        self.hourly + self.perdiem + self.pto + self.other_pay + self.expense
    }

    /// Converts the breakdown into report totals.
    pub fn to_totals(&self) -> PayTotals {
        PayTotals::from_buckets(
            self.hourly,
            self.perdiem,
            self.pto,
            self.other_pay,
            self.expense,
        )
    }
}

fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

fn pick(relationship: Option<Decimal>, check: Option<Decimal>) -> Option<Decimal> {
    relationship.or(check)
}

fn in_range(value: Decimal) -> Option<Decimal> {
    (value.abs() <= max_component_amount()).then_some(value)
}

fn checked_sum<I: IntoIterator<Item = Decimal>>(values: I) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |sum, value| sum.checked_add(value))
        .and_then(in_range)
}

/// `hours * rate`; zero hours pay nothing whatever the rate. `None` when
/// the rate or the product is out of range.
fn hours_pay(hours: Decimal, rate: Option<Decimal>) -> Option<Decimal> {
    if hours.is_zero() {
        return Some(Decimal::ZERO);
    }
    rate.and_then(|rate| hours.checked_mul(rate)).and_then(in_range)
}

/// Resolves the effective pay type of a relationship or check.
pub fn effective_pay_type(check: &Check, relationship: Option<&RelationshipDetail>) -> PayType {
    relationship
        .and_then(|r| r.pay_type)
        .or(check.pay_type)
        .unwrap_or(PayType::Unknown)
}

/// Calculates regular, overtime, and holiday pay.
///
/// Overtime defaults to 1.5x and holiday to 2.0x the resolved base rate
/// when no explicit rate is present.
pub fn calculate_hourly(check: &Check, relationship: Option<&RelationshipDetail>) -> HourlyPay {
    let zero = Decimal::ZERO;
    let hours = pick(relationship.and_then(|r| r.hours), check.hours).unwrap_or(zero);
    let rate = pick(relationship.and_then(|r| r.rate), check.rate).unwrap_or(zero);
    let ot_hours = pick(relationship.and_then(|r| r.ot_hours), check.ot_hours).unwrap_or(zero);
    let ot_rate = match pick(relationship.and_then(|r| r.ot_rate), check.ot_rate) {
        Some(ot_rate) => Some(ot_rate),
        None => rate.checked_mul(overtime_multiplier()),
    };
    let holiday_hours =
        pick(relationship.and_then(|r| r.holiday_hours), check.holiday_hours).unwrap_or(zero);
    let holiday_rate = match pick(relationship.and_then(|r| r.holiday_rate), check.holiday_rate) {
        Some(holiday_rate) => Some(holiday_rate),
        None => rate.checked_mul(holiday_multiplier()),
    };

    let regular = hours_pay(hours, Some(rate));
    let overtime = hours_pay(ot_hours, ot_rate);
    let holiday = hours_pay(holiday_hours, holiday_rate);

    HourlyPay {
        regular: non_negative(regular.unwrap_or(zero)),
        overtime: non_negative(overtime.unwrap_or(zero)),
        holiday: non_negative(holiday.unwrap_or(zero)),
        overflowed: regular.is_none() || overtime.is_none() || holiday.is_none(),
    }
}

/// Calculates per-diem pay.
///
/// With the breakdown flag set the seven weekday amounts are summed (each
/// day falling back independently); otherwise the flat amount is used.
/// Returns `None` when the amount is out of range.
pub fn calculate_perdiem(
    check: &Check,
    relationship: Option<&RelationshipDetail>,
) -> Option<Decimal> {
    let breakdown = relationship
        .and_then(|r| r.perdiem_breakdown)
        .or(check.perdiem_breakdown)
        .unwrap_or(false);

    let amount = if breakdown {
        let check_days = check.perdiem_days();
        match relationship {
            Some(r) => r.perdiem_days().overlay(&check_days).total(),
            None => check_days.total(),
        }
    } else {
        Some(
            pick(
                relationship.and_then(|r| r.perdiem_amount),
                check.perdiem_amount,
            )
            .unwrap_or(Decimal::ZERO),
        )
    };

    amount.and_then(in_range).map(non_negative)
}

/// Sums the relevant other-pay list.
///
/// A relationship's list replaces the check's list when present, even if
/// empty. Returns `None` when the sum is out of range.
pub fn calculate_other_pay(
    check: &Check,
    relationship: Option<&RelationshipDetail>,
) -> Option<Decimal> {
    let items = relationship
        .and_then(|r| r.other_pay.as_deref())
        .unwrap_or(&check.other_pay);
    checked_sum(items.iter().map(|item| item.amount.unwrap_or(Decimal::ZERO))).map(non_negative)
}

/// Calculates every pay bucket for a check or one of its relationships.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::compute_pay;
/// use payroll_engine::config::PtoPolicy;
/// use payroll_engine::models::{Check, PayType};
/// use rust_decimal::Decimal;
///
/// let check = Check {
///     id: "chk_001".to_string(),
///     pay_type: Some(PayType::Hourly),
///     hours: Some(Decimal::new(40, 0)),
///     rate: Some(Decimal::new(20, 0)),
///     ot_hours: Some(Decimal::new(5, 0)),
///     ..Check::default()
/// };
/// let pay = compute_pay(&check, None, PtoPolicy::Separate);
/// assert_eq!(pay.hourly, Decimal::new(950, 0));
/// assert!(!pay.overflowed);
/// ```
pub fn compute_pay(
    check: &Check,
    relationship: Option<&RelationshipDetail>,
    policy: PtoPolicy,
) -> PayBreakdown {
    if check.is_expense_check() {
        let expense = in_range(check.amount.unwrap_or(Decimal::ZERO));
        return PayBreakdown {
            expense: non_negative(expense.unwrap_or(Decimal::ZERO)),
            overflowed: expense.is_none(),
            ..PayBreakdown::default()
        };
    }

    let pay_type = effective_pay_type(check, relationship);
    let other_pay = calculate_other_pay(check, relationship);
    let mut breakdown = PayBreakdown {
        other_pay: other_pay.unwrap_or(Decimal::ZERO),
        overflowed: other_pay.is_none(),
        ..PayBreakdown::default()
    };

    if pay_type.includes_hourly() {
        let detail = calculate_hourly(check, relationship);
        breakdown.hourly_detail = detail;
        breakdown.overflowed |= detail.overflowed;
        match policy {
            PtoPolicy::Separate => breakdown.hourly = detail.total(),
            PtoPolicy::HolidayAsPto => {
                breakdown.hourly = detail.regular + detail.overtime;
                breakdown.pto += detail.holiday;
            }
        }
    }

    if pay_type.includes_perdiem() {
        let perdiem = calculate_perdiem(check, relationship);
        let pto = in_range(
            relationship
                .and_then(|r| r.pto_amount)
                .unwrap_or(Decimal::ZERO),
        );
        breakdown.perdiem = perdiem.unwrap_or(Decimal::ZERO);
        breakdown.pto += non_negative(pto.unwrap_or(Decimal::ZERO));
        breakdown.overflowed |= perdiem.is_none() || pto.is_none();
    }

    breakdown
}

/// Returns the pay units of a check: one per relationship, or a single
/// implicit unit for checks without relationships and for expense checks.
pub fn pay_units(check: &Check) -> Vec<Option<&RelationshipDetail>> {
    let relationships = check.relationships();
    if check.is_expense_check() || relationships.is_empty() {
        vec![None]
    } else {
        relationships.iter().map(Some).collect()
    }
}

/// Calculates the pay of every unit of a check.
pub fn compute_unit_pay(check: &Check, policy: PtoPolicy) -> Vec<PayBreakdown> {
    pay_units(check)
        .into_iter()
        .map(|unit| compute_pay(check, unit, policy))
        .collect()
}

/// Calculates the total computed pay of a whole check across its units.
pub fn compute_check_pay(check: &Check, policy: PtoPolicy) -> PayTotals {
    compute_unit_pay(check, policy)
        .iter()
        .map(PayBreakdown::to_totals)
        .sum()
}
