//! Opportunity Console Client Library
//!
//! Session-managed client for the opportunity console API: a credential
//! store that survives restarts, a session state machine that validates the
//! stored token against the server before trusting it, an access guard that
//! gates views and nav affordances on the resolved role, and a typed HTTP
//! client for the auth and admin endpoints.

pub mod api;
pub mod models;
pub mod session;
