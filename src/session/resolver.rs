//! Identity Resolution
//! Mission: Seam between the session machine and the auth API

use crate::session::errors::AuthError;
use crate::session::models::{Identity, TokenGrant};
use async_trait::async_trait;

/// Outbound auth operations the session state machine depends on.
///
/// `resolve` performs exactly one "who am I" request per invocation and
/// reports every failure mode — expired token, bad token, unreachable
/// server — as the single `AuthError::Resolution` outcome. Retrying, and
/// deciding what a failure means for session state, is the caller's job.
///
/// Implemented over HTTP by [`crate::api::ApiClient`]; tests substitute
/// scripted implementations.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange a username/password for a bearer token (`POST login`).
    async fn acquire_token(&self, username: &str, password: &str)
        -> Result<TokenGrant, AuthError>;

    /// Create a new account (`POST register`). Does not sign in.
    async fn register(&self, username: &str, password: &str) -> Result<(), AuthError>;

    /// Confirm a token and materialize the identity behind it (`GET me`).
    /// The returned role is authoritative over anything cached locally.
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError>;
}
