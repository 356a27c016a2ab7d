//! Role-to-route map for the portal screens.

use crate::session::SessionState;
use crate::types::{RoutePath, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: &'static str,
    pub path: &'static str,
}

const fn entry(label: &'static str, path: &'static str) -> MenuEntry {
    MenuEntry { label, path }
}

const CUSTOMER_MENU: &[MenuEntry] = &[
    entry("Dashboard", "/customer/dashboard"),
    entry("My Policies", "/customer/policies"),
    entry("Pending Proposals", "/customer/proposals"),
];

const AGENT_MENU: &[MenuEntry] = &[
    entry("Dashboard", "/agent/dashboard"),
    entry("Pipeline", "/agent/pipeline"),
    entry("Documents", "/agent/documents"),
];

const MANAGER_MENU: &[MenuEntry] = &[
    entry("Dashboard", "/manager/dashboard"),
    entry("Approvals", "/manager/approvals"),
    entry("Overdue Premiums", "/manager/overdue"),
];

const ADMIN_MENU: &[MenuEntry] = &[
    entry("Funds", "/admin/funds"),
    entry("Users", "/admin/users"),
];

/// Where a freshly authenticated user of `role` lands.
pub fn landing_route(role: UserRole) -> RoutePath {
    RoutePath::new(menu(role)[0].path)
}

pub fn menu(role: UserRole) -> &'static [MenuEntry] {
    match role {
        UserRole::Customer => CUSTOMER_MENU,
        UserRole::Agent => AGENT_MENU,
        UserRole::Manager => MANAGER_MENU,
        UserRole::Admin => ADMIN_MENU,
    }
}

/// Redirect target for a screen restricted to `allowed`, or `None` when the
/// current session may view it.
///
/// A session without a known role is sent to `login_route` like an
/// anonymous one.
pub fn guard(state: &SessionState, allowed: &[UserRole], login_route: &RoutePath) -> Option<RoutePath> {
    let Some(role) = state.session().and_then(|s| s.role()) else {
        return Some(login_route.clone());
    };

    if allowed.contains(&role) {
        None
    } else {
        Some(landing_route(role))
    }
}
