//! Session Models
//! Mission: Define the identity, role, and session snapshot types

use serde::{Deserialize, Serialize};

/// Authorization tiers for RBAC
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin, // Full access including user administration
    #[serde(rename = "user")]
    User, // Regular console access
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }

    /// Whether this role meets a required role. Admin satisfies everything.
    pub fn satisfies(&self, required: Role) -> bool {
        *self == required || *self == Role::Admin
    }
}

/// Server-confirmed identity backing an authenticated session.
///
/// Only ever produced from a successful `/api/auth/me` response; the role
/// here is authoritative and overrides whatever was cached locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

/// Token plus the role hint the server returned alongside it at login.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub token: String,
    pub role: Role,
}

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// A token exists but has not been confirmed by the server yet.
    Resolving,
    Authenticated,
    Anonymous,
}

/// Consistent read-only snapshot of the session, consumed by the access
/// guard and by anything that needs to attach the bearer token to a request.
///
/// `identity` is present if and only if `status` is `Authenticated`.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Option<String>,
    pub identity: Option<Identity>,
    pub status: SessionStatus,
}
