//! Session Errors
//! Mission: One failure kind per credential operation, nothing silent

/// Failure taxonomy for credential operations.
///
/// Resolution deliberately collapses "token rejected" and "server
/// unreachable" into one outcome: the client cannot tell a dead server from
/// a dead token, so both invalidate the session (fail-closed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Credential acquisition rejected: bad username/password or the login
    /// request itself failed.
    Authentication,
    /// Registration rejected: duplicate username or invalid input.
    Registration(String),
    /// An existing token could not be confirmed by the server.
    Resolution,
    /// A newer credential operation replaced this one before its resolution
    /// completed; the result was discarded.
    Superseded,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Authentication => write!(f, "Invalid username or password"),
            AuthError::Registration(reason) => write!(f, "Registration failed: {}", reason),
            AuthError::Resolution => write!(f, "Session could not be validated"),
            AuthError::Superseded => write!(f, "Superseded by a newer sign-in"),
        }
    }
}

impl std::error::Error for AuthError {}
