//! Client-scoped visibility of checks.
//!
//! Non-admin users see only checks that reference at least one of their
//! visible clients. Scoping runs before classification so the aggregator
//! never sees out-of-scope data.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::Check;

/// The caller's role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sees every check.
    Admin,
    /// Any other role; restricted to visible clients.
    #[default]
    #[serde(other)]
    Member,
}

/// The caller's role and the clients they may see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScope {
    /// The caller's role.
    #[serde(default)]
    pub role: Role,
    /// Client ids visible to a non-admin caller.
    #[serde(default)]
    pub visible_client_ids: Vec<String>,
}

impl SecurityScope {
    /// A scope that sees everything.
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            visible_client_ids: Vec::new(),
        }
    }

    /// A restricted scope over the given clients.
    pub fn member<I, S>(visible_client_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role: Role::Member,
            visible_client_ids: visible_client_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Applies this scope to a set of checks.
    pub fn filter(&self, checks: &[Check]) -> Vec<Check> {
        filter_visible(checks, self.role, &self.visible_client_ids)
    }
}

/// Returns the checks visible to a caller.
///
/// Admins see all checks unchanged. Anyone else sees a check when its direct
/// client, or any relationship client, is in `visible_client_ids`. Visible
/// checks are returned whole, in input order.
///
/// # Examples
///
/// ```
/// use payroll_engine::aggregation::{Role, filter_visible};
/// use payroll_engine::models::Check;
///
/// let checks = vec![
///     Check { id: "a".to_string(), client_id: Some("c1".to_string()), ..Check::default() },
///     Check { id: "b".to_string(), client_id: Some("c2".to_string()), ..Check::default() },
/// ];
/// let visible = filter_visible(&checks, Role::Member, &["c1".to_string()]);
/// assert_eq!(visible.len(), 1);
/// assert_eq!(visible[0].id, "a");
/// ```
pub fn filter_visible(checks: &[Check], role: Role, visible_client_ids: &[String]) -> Vec<Check> {
    if role == Role::Admin {
        return checks.to_vec();
    }

    let visible: HashSet<&str> = visible_client_ids.iter().map(String::as_str).collect();
    checks
        .iter()
        .filter(|check| check.client_ids().any(|id| visible.contains(id)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelationshipDetail;
    use serde_json::json;

    fn direct(id: &str, client: &str) -> Check {
        Check {
            id: id.to_string(),
            client_id: Some(client.to_string()),
            ..Check::default()
        }
    }

    fn multi(id: &str, clients: &[&str]) -> Check {
        Check {
            id: id.to_string(),
            relationship_details: Some(
                clients
                    .iter()
                    .enumerate()
                    .map(|(i, c)| RelationshipDetail::for_client(format!("r{}", i), *c, *c))
                    .collect(),
            ),
            ..Check::default()
        }
    }

    /// SF-001: admins see everything
    #[test]
    fn test_admin_sees_all() {
        let checks = vec![direct("a", "c1"), direct("b", "c2"), Check::default()];
        assert_eq!(filter_visible(&checks, Role::Admin, &[]), checks);
    }

    /// SF-002: members see only their clients
    #[test]
    fn test_member_restricted_to_visible_clients() {
        let checks = vec![direct("a", "c1"), direct("b", "c2"), multi("c", &["c3", "c1"])];
        let visible = filter_visible(&checks, Role::Member, &["c1".to_string()]);
        let ids: Vec<&str> = visible.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    /// SF-003: no visible clients means nothing is visible
    #[test]
    fn test_member_without_clients_sees_nothing() {
        let checks = vec![direct("a", "c1"), multi("b", &["c2"])];
        assert!(filter_visible(&checks, Role::Member, &[]).is_empty());
    }

    /// SF-004: checks without any client are hidden from members
    #[test]
    fn test_clientless_check_hidden() {
        let checks = vec![Check {
            id: "x".to_string(),
            ..Check::default()
        }];
        assert!(filter_visible(&checks, Role::Member, &["c1".to_string()]).is_empty());
    }

    #[test]
    fn test_role_deserialization() {
        let scope: SecurityScope =
            serde_json::from_value(json!({"role": "admin", "visibleClientIds": []})).unwrap();
        assert_eq!(scope.role, Role::Admin);
        let scope: SecurityScope =
            serde_json::from_value(json!({"role": "manager", "visibleClientIds": ["c1"]}))
                .unwrap();
        assert_eq!(scope.role, Role::Member);
        assert_eq!(scope, SecurityScope::member(["c1"]));
    }
}
