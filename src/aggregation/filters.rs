//! Report filter state.
//!
//! Company and client selections are linked: choosing a company drops a
//! client that does not bill through it, and choosing a client that belongs
//! to exactly one company selects that company. Everything else is derived
//! from this one struct.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::models::{Check, Client};
use crate::sync::QuerySpec;

/// Collection holding check documents.
pub const CHECKS_COLLECTION: &str = "checks";

/// Check fields that tie a check to a client.
pub const CLIENT_FIELDS: [&str; 2] = ["clientId", "relationshipDetails.clientId"];

/// Filters applied to the checks feeding a report.
///
/// # Example
///
/// ```
/// use payroll_engine::aggregation::ReportFilters;
/// use payroll_engine::models::Client;
///
/// let clients = vec![Client {
///     id: "cl_1".to_string(),
///     name: "Acme".to_string(),
///     division: None,
///     active: true,
///     company_ids: vec!["co_1".to_string()],
/// }];
///
/// let mut filters = ReportFilters::default();
/// filters.select_client(Some("cl_1".to_string()), &clients);
/// assert_eq!(filters.company_id.as_deref(), Some("co_1"));
///
/// filters.select_company(Some("co_2".to_string()), &clients);
/// assert_eq!(filters.client_id, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilters {
    /// Selected company.
    #[serde(default)]
    pub company_id: Option<String>,
    /// Selected client.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Earliest creation time, inclusive.
    #[serde(default)]
    pub created_from: Option<DateTime<Utc>>,
    /// Latest creation time, inclusive.
    #[serde(default)]
    pub created_to: Option<DateTime<Utc>>,
    /// Required paid flag.
    #[serde(default)]
    pub paid: Option<bool>,
    /// Required reviewed flag.
    #[serde(default)]
    pub reviewed: Option<bool>,
}

impl ReportFilters {
    /// Rejects an inverted date range.
    pub fn validate(&self) -> EngineResult<()> {
        if let (Some(from), Some(to)) = (self.created_from, self.created_to) {
            if from > to {
                return Err(EngineError::InvalidQuery {
                    message: format!("createdFrom {} is after createdTo {}", from, to),
                });
            }
        }
        Ok(())
    }

    /// Selects a company, clearing a client that does not belong to it.
    pub fn select_company(&mut self, company_id: Option<String>, clients: &[Client]) {
        if let (Some(company), Some(client)) = (&company_id, &self.client_id) {
            let compatible = clients
                .iter()
                .find(|c| &c.id == client)
                .is_some_and(|c| c.belongs_to(company));
            if !compatible {
                self.client_id = None;
            }
        }
        self.company_id = company_id;
    }

    /// Selects a client, deriving the company when the client belongs to
    /// exactly one.
    pub fn select_client(&mut self, client_id: Option<String>, clients: &[Client]) {
        if let Some(client) = client_id
            .as_deref()
            .and_then(|id| clients.iter().find(|c| c.id == id))
        {
            if let [only] = client.company_ids.as_slice() {
                self.company_id = Some(only.clone());
            }
        }
        self.client_id = client_id;
    }

    /// Active clients of the selected company, or every active client when
    /// no company is selected.
    pub fn visible_clients<'a>(&self, clients: &'a [Client]) -> Vec<&'a Client> {
        clients
            .iter()
            .filter(|c| c.active)
            .filter(|c| match &self.company_id {
                Some(company) => c.belongs_to(company),
                None => true,
            })
            .collect()
    }

    /// Returns true when a check passes every filter.
    pub fn matches(&self, check: &Check) -> bool {
        if let Some(company) = &self.company_id {
            if &check.company_id != company {
                return false;
            }
        }
        if let Some(client) = &self.client_id {
            if !check.references_client(client) {
                return false;
            }
        }
        if self.created_from.is_some() || self.created_to.is_some() {
            let Some(created) = check.created_at else {
                return false;
            };
            if self.created_from.is_some_and(|from| created < from) {
                return false;
            }
            if self.created_to.is_some_and(|to| created > to) {
                return false;
            }
        }
        if self.paid.is_some_and(|paid| check.paid != paid) {
            return false;
        }
        if self.reviewed.is_some_and(|reviewed| check.reviewed != reviewed) {
            return false;
        }
        true
    }

    /// Keeps the checks that pass every filter, in input order.
    pub fn apply(&self, checks: &[Check]) -> Vec<Check> {
        checks.iter().filter(|c| self.matches(c)).cloned().collect()
    }

    /// Builds the store query for this filter state.
    ///
    /// Company and status flags become equality filters. A selected client,
    /// or else `client_ids` when non-empty, becomes a membership filter that
    /// either `clientId` or any relationship's client may satisfy. Date
    /// bounds are applied afterwards with [`apply`].
    ///
    /// [`apply`]: ReportFilters::apply
    pub fn check_query(&self, client_ids: &[String]) -> QuerySpec {
        let mut query = QuerySpec::new(CHECKS_COLLECTION);
        if let Some(company) = &self.company_id {
            query = query.where_eq("companyId", company.as_str());
        }
        if let Some(paid) = self.paid {
            query = query.where_eq("paid", paid);
        }
        if let Some(reviewed) = self.reviewed {
            query = query.where_eq("reviewed", reviewed);
        }
        match &self.client_id {
            Some(client) => query.where_in_any(CLIENT_FIELDS, [Value::from(client.as_str())]),
            None if !client_ids.is_empty() => {
                query.where_in_any(CLIENT_FIELDS, client_ids.iter().map(String::as_str))
            }
            None => query,
        }
    }
}
