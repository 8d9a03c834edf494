//! Credential Store
//! Mission: Keep token and role on disk so a session survives restarts

use crate::session::models::Role;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

const TOKEN_FILE: &str = "token";
const ROLE_FILE: &str = "role";

/// Durable key/value persistence for the bearer token and the last known
/// role, scoped to a per-user state directory.
///
/// Purely mechanical: no validation, no expiry. The API is infallible from
/// the caller's perspective (the original storage layer cannot fail);
/// filesystem problems are logged and degrade to "nothing stored".
#[derive(Debug)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist both entries. Token is written first so a crash between the
    /// two writes can only leave a role-less token, never a token-less role
    /// that `load` would have to trust.
    pub fn save(&self, token: &str, role: Role) {
        if !self.write_entry(TOKEN_FILE, token) {
            return;
        }
        self.write_entry(ROLE_FILE, role.as_str());
        debug!(role = role.as_str(), "credential saved");
    }

    /// Read back whatever was last saved. A role without a token is not a
    /// session: both come back absent in that case.
    pub fn load(&self) -> (Option<String>, Option<Role>) {
        let token = self.read_entry(TOKEN_FILE);
        if token.is_none() {
            return (None, None);
        }
        let role = self
            .read_entry(ROLE_FILE)
            .and_then(|s| Role::from_str(&s));
        (token, role)
    }

    /// Remove both entries. Safe to call when nothing is stored.
    pub fn clear(&self) {
        self.remove_entry(TOKEN_FILE);
        self.remove_entry(ROLE_FILE);
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn write_entry(&self, name: &str, value: &str) -> bool {
        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %err, "cannot create state directory");
            return false;
        }
        match fs::write(self.path(name), value) {
            Ok(()) => true,
            Err(err) => {
                warn!(entry = name, error = %err, "failed to persist credential entry");
                false
            }
        }
    }

    fn read_entry(&self, name: &str) -> Option<String> {
        match fs::read_to_string(self.path(name)) {
            Ok(value) => {
                let value = value.trim().to_string();
                if value.is_empty() {
                    None
                } else {
                    Some(value)
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(entry = name, error = %err, "failed to read credential entry");
                None
            }
        }
    }

    fn remove_entry(&self, name: &str) {
        match fs::remove_file(self.path(name)) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(entry = name, error = %err, "failed to remove credential entry");
            }
        }
    }
}
