//! Division classification.
//!
//! Maps a check (and optionally one of its relationships) to the division
//! label the report groups it under. Classification is pure: the same check
//! and client data always produce the same label.

use crate::models::{Check, ClientDirectory, EXPENSES_DIVISION, NO_DIVISION, RelationshipDetail};

/// Division label used when a check has both "Container" and "Projects"
/// relationships.
pub const CONTAINER_DIVISION: &str = "Container";

/// Client name that is merged into [`CONTAINER_DIVISION`].
pub const PROJECTS_CLIENT_NAME: &str = "Projects";

/// Returns true when the check carries relationships named exactly
/// "Container" and "Projects".
///
/// Data entry sometimes splits one container job across both clients; such
/// checks report entirely under "Container".
pub fn has_container_projects_pair(check: &Check) -> bool {
    let relationships = check.relationships();
    let has_container = relationships
        .iter()
        .any(|r| r.client_name == CONTAINER_DIVISION);
    let has_projects = relationships
        .iter()
        .any(|r| r.client_name == PROJECTS_CLIENT_NAME);
    has_container && has_projects
}

/// Classifies a check, or one of its relationships, into a division.
///
/// Rules, first match wins:
/// 1. Expense checks are always [`EXPENSES_DIVISION`].
/// 2. Checks with both "Container" and "Projects" relationships are
///    [`CONTAINER_DIVISION`].
/// 3. A non-blank division override on the relationship.
/// 4. The division configured on the relationship's client (or the check's
///    direct client), else [`NO_DIVISION`].
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::classify;
/// use payroll_engine::models::{Check, Client, ClientDirectory};
///
/// let clients = vec![Client {
///     id: "cl_1".to_string(),
///     division: Some("Ops".to_string()),
///     ..Client::default()
/// }];
/// let check = Check {
///     id: "chk_1".to_string(),
///     client_id: Some("cl_1".to_string()),
///     ..Check::default()
/// };
/// assert_eq!(classify(&check, None, &ClientDirectory::new(&clients)), "Ops");
/// ```
pub fn classify(
    check: &Check,
    relationship: Option<&RelationshipDetail>,
    clients: &ClientDirectory<'_>,
) -> String {
    if check.is_expense_check() {
        return EXPENSES_DIVISION.to_string();
    }

    if has_container_projects_pair(check) {
        return CONTAINER_DIVISION.to_string();
    }

    if let Some(label) = relationship
        .and_then(|r| r.division.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        return label.to_string();
    }

    let client_id = match relationship {
        Some(r) if !r.client_id.is_empty() => Some(r.client_id.as_str()),
        _ => check.client_id.as_deref(),
    };

    client_id
        .and_then(|id| clients.division_of(id))
        .unwrap_or(NO_DIVISION)
        .to_string()
}
