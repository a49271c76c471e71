//! Company, client, and employee reference records.
//!
//! These records change rarely compared to checks. The aggregator receives
//! them as plain slices; [`ClientDirectory`] indexes clients by id for the
//! division classifier.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::numeric::{lenient_bool, nullable_vec};

fn active_by_default() -> bool {
    true
}

/// A client billed through one or more companies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique identifier for the client.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// The division this client reports under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    /// Whether the client is active.
    #[serde(default = "active_by_default")]
    pub active: bool,
    /// Companies this client is associated with.
    #[serde(default, deserialize_with = "nullable_vec")]
    pub company_ids: Vec<String>,
}

impl Client {
    /// Returns the configured division, ignoring blank labels.
    pub fn division_label(&self) -> Option<&str> {
        self.division
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Returns true when the client is associated with `company_id`.
    pub fn belongs_to(&self, company_id: &str) -> bool {
        self.company_ids.iter().any(|id| id == company_id)
    }
}

/// A payroll company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    /// Unique identifier for the company.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Whether the company is active.
    #[serde(default = "active_by_default")]
    pub active: bool,
}

/// An employee paid through a company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: String,
    /// The employing company.
    #[serde(default)]
    pub company_id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the employee is active.
    #[serde(default = "active_by_default", deserialize_with = "lenient_bool")]
    pub active: bool,
    /// Role or position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// Clients indexed by id.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{Client, ClientDirectory};
///
/// let clients = vec![Client {
///     id: "cl_1".to_string(),
///     name: "Acme".to_string(),
///     division: Some("Ops".to_string()),
///     active: true,
///     company_ids: vec!["co_1".to_string()],
/// }];
/// let directory = ClientDirectory::new(&clients);
/// assert_eq!(directory.division_of("cl_1"), Some("Ops"));
/// assert_eq!(directory.division_of("missing"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientDirectory<'a> {
    by_id: HashMap<&'a str, &'a Client>,
}

impl<'a> ClientDirectory<'a> {
    /// Indexes the given clients. Later duplicates of an id win.
    pub fn new(clients: &'a [Client]) -> Self {
        let by_id = clients.iter().map(|c| (c.id.as_str(), c)).collect();
        Self { by_id }
    }

    /// Looks up a client by id.
    pub fn get(&self, client_id: &str) -> Option<&'a Client> {
        self.by_id.get(client_id).copied()
    }

    /// Returns the client's configured division.
    pub fn division_of(&self, client_id: &str) -> Option<&'a str> {
        self.get(client_id).and_then(Client::division_label)
    }

    /// Returns the client's display name.
    pub fn name_of(&self, client_id: &str) -> Option<&'a str> {
        self.get(client_id)
            .map(|c| c.name.as_str())
            .filter(|n| !n.is_empty())
    }

    /// Number of indexed clients.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true when no clients are indexed.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_defaults_to_active() {
        let client: Client = serde_json::from_value(json!({"id": "cl_1", "name": "Acme"})).unwrap();
        assert!(client.active);
        assert!(client.company_ids.is_empty());
        assert_eq!(client.division_label(), None);
    }

    #[test]
    fn test_blank_division_is_absent() {
        let client = Client {
            id: "cl_1".to_string(),
            division: Some("  ".to_string()),
            ..Client::default()
        };
        assert_eq!(client.division_label(), None);
    }

    #[test]
    fn test_belongs_to() {
        let client: Client = serde_json::from_value(
            json!({"id": "cl_1", "companyIds": ["co_1", "co_2"], "active": false}),
        )
        .unwrap();
        assert!(client.belongs_to("co_2"));
        assert!(!client.belongs_to("co_3"));
        assert!(!client.active);
    }

    #[test]
    fn test_directory_lookup() {
        let clients = vec![
            Client {
                id: "a".to_string(),
                name: "Alpha".to_string(),
                division: Some("Field".to_string()),
                ..Client::default()
            },
            Client {
                id: "b".to_string(),
                ..Client::default()
            },
        ];
        let directory = ClientDirectory::new(&clients);
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.division_of("a"), Some("Field"));
        assert_eq!(directory.division_of("b"), None);
        assert_eq!(directory.name_of("a"), Some("Alpha"));
        assert_eq!(directory.name_of("b"), None);
    }

    #[test]
    fn test_employee_deserialize() {
        let employee: Employee = serde_json::from_value(
            json!({"id": "e1", "companyId": "co_1", "position": "Driver"}),
        )
        .unwrap();
        assert!(employee.active);
        assert_eq!(employee.position.as_deref(), Some("Driver"));
    }
}
