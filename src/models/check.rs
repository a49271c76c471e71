//! Check model and its client-scoped relationship details.
//!
//! A [`Check`] is one payroll payment. When a payment spans several clients
//! it carries a list of [`RelationshipDetail`] entries, each holding the pay
//! fields for one client. Relationship fields override the check's fields one
//! at a time; an absent relationship field falls back to the check's value.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::numeric::{
    lenient_bool, lenient_datetime, lenient_decimal, lenient_opt_bool, nullable_vec,
};

/// The pay type tag carried by checks and relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayType {
    /// Paid by the hour, with overtime and holiday hours.
    Hourly,
    /// Paid a daily allowance, flat or broken down by weekday.
    Perdiem,
    /// Both hourly and per-diem pay.
    Mixed,
    /// A reimbursement, not wages.
    Expense,
    /// Any tag this engine does not recognise.
    #[serde(other)]
    Unknown,
}

impl PayType {
    /// Returns true when hourly pay applies.
    pub fn includes_hourly(self) -> bool {
        matches!(self, PayType::Hourly | PayType::Mixed | PayType::Unknown)
    }

    /// Returns true when per-diem pay (and its flat PTO) applies.
    pub fn includes_perdiem(self) -> bool {
        matches!(self, PayType::Perdiem | PayType::Mixed | PayType::Unknown)
    }
}

/// One "other pay" line, such as a bonus or a reimbursement adjustment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherPayItem {
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// The amount; absent or malformed amounts count as zero.
    #[serde(
        default,
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Decimal>,
}

/// Per-diem amounts for each day of the week.
///
/// Serialized inline on the owning record as `perdiemMonday` ... `perdiemSunday`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerDiemDays {
    /// Monday through Sunday, in that order.
    pub days: [Option<Decimal>; 7],
}

impl PerDiemDays {
    /// Returns the per-day value, falling back to `fallback` for absent days.
    pub fn overlay(&self, fallback: &PerDiemDays) -> PerDiemDays {
        let mut days = self.days;
        for (day, base) in days.iter_mut().zip(fallback.days.iter()) {
            if day.is_none() {
                *day = *base;
            }
        }
        PerDiemDays { days }
    }

    /// Sums all days, treating absent days as zero. Returns `None` when the
    /// sum overflows.
    pub fn total(&self) -> Option<Decimal> {
        self.days.iter().try_fold(Decimal::ZERO, |sum, day| {
            sum.checked_add(day.unwrap_or(Decimal::ZERO))
        })
    }
}

/// A client-scoped slice of pay data within a multi-client check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDetail {
    /// Unique identifier of the relationship.
    #[serde(default)]
    pub id: String,
    /// The client this slice of pay belongs to.
    #[serde(default)]
    pub client_id: String,
    /// The client's display name at the time of entry.
    #[serde(default)]
    pub client_name: String,
    /// Explicit division override for this relationship.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    /// Pay type override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_type: Option<PayType>,
    /// Regular hours.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub hours: Option<Decimal>,
    /// Regular hourly rate.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
    /// Overtime hours.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub ot_hours: Option<Decimal>,
    /// Overtime rate.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub ot_rate: Option<Decimal>,
    /// Holiday hours.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub holiday_hours: Option<Decimal>,
    /// Holiday rate.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub holiday_rate: Option<Decimal>,
    /// Whether per-diem is broken down by weekday.
    #[serde(default, deserialize_with = "lenient_opt_bool", skip_serializing_if = "Option::is_none")]
    pub perdiem_breakdown: Option<bool>,
    /// Flat per-diem amount.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_amount: Option<Decimal>,
    /// Monday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_monday: Option<Decimal>,
    /// Tuesday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_tuesday: Option<Decimal>,
    /// Wednesday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_wednesday: Option<Decimal>,
    /// Thursday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_thursday: Option<Decimal>,
    /// Friday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_friday: Option<Decimal>,
    /// Saturday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_saturday: Option<Decimal>,
    /// Sunday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_sunday: Option<Decimal>,
    /// Other-pay lines for this relationship.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_pay: Option<Vec<OtherPayItem>>,
    /// Flat PTO dollar amount.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub pto_amount: Option<Decimal>,
}

impl RelationshipDetail {
    /// Creates a relationship for a client with every pay field absent.
    pub fn for_client(
        id: impl Into<String>,
        client_id: impl Into<String>,
        client_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            client_name: client_name.into(),
            ..Self::default()
        }
    }

    /// Returns the weekday per-diem values of this relationship.
    pub fn perdiem_days(&self) -> PerDiemDays {
        PerDiemDays {
            days: [
                self.perdiem_monday,
                self.perdiem_tuesday,
                self.perdiem_wednesday,
                self.perdiem_thursday,
                self.perdiem_friday,
                self.perdiem_saturday,
                self.perdiem_sunday,
            ],
        }
    }
}

/// One payroll payment record.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{Check, PayType};
///
/// let check: Check = serde_json::from_str(r#"{
///     "id": "chk_001",
///     "companyId": "co_1",
///     "clientId": "cl_1",
///     "payType": "hourly",
///     "hours": 40,
///     "rate": "20.00",
///     "amount": 800
/// }"#).unwrap();
/// assert_eq!(check.pay_type, Some(PayType::Hourly));
/// assert!(!check.is_expense_check());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    /// Unique identifier for the check.
    pub id: String,
    /// Owning company.
    #[serde(default)]
    pub company_id: String,
    /// Direct client, for single-client checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Direct client display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// The paid employee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    /// The paid employee's display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_name: Option<String>,
    /// Printed check number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_number: Option<String>,
    /// Client-scoped pay slices when the check spans several clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_details: Option<Vec<RelationshipDetail>>,
    /// Pay type tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_type: Option<PayType>,
    /// Regular hours.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub hours: Option<Decimal>,
    /// Regular hourly rate.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
    /// Overtime hours.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub ot_hours: Option<Decimal>,
    /// Overtime rate.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub ot_rate: Option<Decimal>,
    /// Holiday hours.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub holiday_hours: Option<Decimal>,
    /// Holiday rate.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub holiday_rate: Option<Decimal>,
    /// Whether per-diem is broken down by weekday.
    #[serde(default, deserialize_with = "lenient_opt_bool", skip_serializing_if = "Option::is_none")]
    pub perdiem_breakdown: Option<bool>,
    /// Flat per-diem amount.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_amount: Option<Decimal>,
    /// Monday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_monday: Option<Decimal>,
    /// Tuesday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_tuesday: Option<Decimal>,
    /// Wednesday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_wednesday: Option<Decimal>,
    /// Thursday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_thursday: Option<Decimal>,
    /// Friday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_friday: Option<Decimal>,
    /// Saturday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_saturday: Option<Decimal>,
    /// Sunday per-diem.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub perdiem_sunday: Option<Decimal>,
    /// Other-pay lines.
    #[serde(default, deserialize_with = "nullable_vec")]
    pub other_pay: Vec<OtherPayItem>,
    /// The stored total. Authoritative, but always reconciled.
    #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    /// Whether the check has been paid.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub paid: bool,
    /// Whether the check has been reviewed.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub reviewed: bool,
    /// When the check was created. Unreadable timestamps read as absent.
    #[serde(default, deserialize_with = "lenient_datetime", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Expense flag, independent of the pay type tag.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_expense: bool,
    /// Expense name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_name: Option<String>,
    /// Expense description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_description: Option<String>,
}

impl Check {
    /// Returns true for checks that are expenses rather than wages.
    pub fn is_expense_check(&self) -> bool {
        self.is_expense || self.pay_type == Some(PayType::Expense)
    }

    /// Returns the relationship list, empty when the check has none.
    pub fn relationships(&self) -> &[RelationshipDetail] {
        self.relationship_details.as_deref().unwrap_or(&[])
    }

    /// Iterates every client id the check references, direct client first.
    pub fn client_ids(&self) -> impl Iterator<Item = &str> {
        self.client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .into_iter()
            .chain(
                self.relationships()
                    .iter()
                    .map(|r| r.client_id.as_str())
                    .filter(|id| !id.is_empty()),
            )
    }

    /// Returns true when the check references `client_id` directly or
    /// through a relationship.
    pub fn references_client(&self, client_id: &str) -> bool {
        self.client_ids().any(|id| id == client_id)
    }

    /// Returns the weekday per-diem values of the check.
    pub fn perdiem_days(&self) -> PerDiemDays {
        PerDiemDays {
            days: [
                self.perdiem_monday,
                self.perdiem_tuesday,
                self.perdiem_wednesday,
                self.perdiem_thursday,
                self.perdiem_friday,
                self.perdiem_saturday,
                self.perdiem_sunday,
            ],
        }
    }
}
