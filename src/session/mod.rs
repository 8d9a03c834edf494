//! Session Core
//! Mission: Own the bearer credential lifecycle and gate every protected view on it

pub mod errors;
pub mod guard;
pub mod manager;
pub mod models;
pub mod resolver;
pub mod store;

pub use errors::AuthError;
pub use guard::{decide, nav_visible, Access, ViewPolicy};
pub use manager::SessionManager;
pub use models::{Identity, Role, Session, SessionStatus, TokenGrant};
pub use resolver::AuthBackend;
pub use store::CredentialStore;
