//! Access Guard
//! Mission: One rule for what renders, applied to routes and nav links alike

use crate::session::models::{Role, Session, SessionStatus};

/// What a view demands before it may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPolicy {
    Public,
    SignedIn,
    Role(Role),
}

/// Per-view decision. `Deny` (signed in, wrong role) is deliberately
/// distinct from `RedirectToLogin` (not signed in at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Render,
    /// Resolution still in flight: show a loading affordance, decide later.
    Wait,
    RedirectToLogin,
    Deny,
}

/// Pure decision function, no side effects. The router applies the result;
/// the guard does not own navigation.
pub fn decide(session: &Session, policy: ViewPolicy) -> Access {
    match (session.status, policy) {
        (_, ViewPolicy::Public) => Access::Render,
        (SessionStatus::Resolving, _) => Access::Wait,
        (SessionStatus::Anonymous, _) => Access::RedirectToLogin,
        (SessionStatus::Authenticated, ViewPolicy::SignedIn) => Access::Render,
        (SessionStatus::Authenticated, ViewPolicy::Role(required)) => match &session.identity {
            Some(identity) if identity.role.satisfies(required) => Access::Render,
            _ => Access::Deny,
        },
    }
}

/// Whether a role-gated UI affordance (e.g. the admin nav entry) is shown.
///
/// Defined in terms of [`decide`] so "link is shown" and "view is reachable"
/// can never diverge.
pub fn nav_visible(session: &Session, policy: ViewPolicy) -> bool {
    matches!(decide(session, policy), Access::Render)
}
