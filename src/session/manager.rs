//! Session State Machine
//! Mission: One consistent answer, at all times, to "who is signed in"

use crate::session::errors::AuthError;
use crate::session::models::{Identity, Session, SessionStatus};
use crate::session::resolver::AuthBackend;
use crate::session::store::CredentialStore;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Internal state. Identity lives only inside the `Authenticated` variant,
/// so "identity present iff authenticated" holds by construction.
enum State {
    Anonymous,
    Resolving { token: String },
    Authenticated { token: String, identity: Identity },
}

impl State {
    fn snapshot(&self) -> Session {
        match self {
            State::Anonymous => Session {
                token: None,
                identity: None,
                status: SessionStatus::Anonymous,
            },
            State::Resolving { token } => Session {
                token: Some(token.clone()),
                identity: None,
                status: SessionStatus::Resolving,
            },
            State::Authenticated { token, identity } => Session {
                token: Some(token.clone()),
                identity: Some(identity.clone()),
                status: SessionStatus::Authenticated,
            },
        }
    }
}

struct Inner {
    state: State,
    // Bumped on every token mutation. A resolution carries the generation it
    // was issued under and its result is discarded if the counter has moved,
    // so a slow response can never overwrite a newer token's state.
    generation: u64,
}

/// Orchestrates token acquisition, validation, and invalidation, and exposes
/// the current session to the rest of the application.
///
/// Constructed once at application start and passed explicitly to whatever
/// needs it; the session is never ambient state. Policy throughout is
/// fail-closed with no automatic retry: any resolution failure lands in
/// `Anonymous` with the credential store cleared.
pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    store: CredentialStore,
    inner: RwLock<Inner>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn AuthBackend>, store: CredentialStore) -> Self {
        Self {
            backend,
            store,
            inner: RwLock::new(Inner {
                state: State::Anonymous,
                generation: 0,
            }),
        }
    }

    /// Consistent snapshot of the current session. Never a half-updated
    /// combination: every transition happens under one write lock.
    pub fn session(&self) -> Session {
        self.inner.read().state.snapshot()
    }

    /// Validate whatever credential survived the last run.
    ///
    /// No stored token means `Anonymous` immediately, with zero network
    /// calls. A stored token is never trusted on its own — it goes through
    /// one resolution, and a rejection silently downgrades to `Anonymous`
    /// (an expired-session redirect is the expected experience, not an
    /// error worth surfacing).
    pub async fn bootstrap(&self) {
        let (token, role_hint) = self.store.load();
        let Some(token) = token else {
            debug!("no stored credential, starting anonymous");
            return;
        };
        if let Some(role) = role_hint {
            // Hint only; the authoritative role comes from the server.
            debug!(role = role.as_str(), "found stored credential");
        }

        let generation = self.begin_resolving(token.clone());
        match self.finish_resolving(generation, token).await {
            Ok(identity) => {
                info!(username = %identity.username, role = identity.role.as_str(), "session restored");
            }
            Err(AuthError::Superseded) => {}
            Err(_) => {
                info!("stored session rejected, starting anonymous");
            }
        }
    }

    /// Acquire a fresh token and confirm the identity behind it.
    ///
    /// Two sequential requests: acquire-credential, then confirm-identity.
    /// Acquisition failure leaves state and store untouched. A confirmation
    /// failure after a successful acquisition fails closed like any other
    /// resolution failure.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        let grant = self.backend.acquire_token(username, password).await?;

        let generation = {
            let mut inner = self.inner.write();
            inner.generation += 1;
            // Durably stored before the confirmation step begins
            self.store.save(&grant.token, grant.role);
            inner.state = State::Resolving {
                token: grant.token.clone(),
            };
            inner.generation
        };

        let identity = self.finish_resolving(generation, grant.token).await?;
        info!(username = %identity.username, role = identity.role.as_str(), "login successful");
        Ok(identity)
    }

    /// Register a new account, then sign in with the same credentials.
    ///
    /// A registration success followed by a login failure surfaces the login
    /// failure; it is never masked as a signup success.
    pub async fn signup(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        self.backend.register(username, password).await?;
        debug!(username, "registration accepted, signing in");
        self.login(username, password).await
    }

    /// Drop the session. Synchronous, idempotent, and infallible: store and
    /// in-memory state are cleared in one atomic update with no network call
    /// and no observable intermediate.
    pub fn logout(&self) {
        let mut inner = self.inner.write();
        inner.generation += 1;
        self.store.clear();
        inner.state = State::Anonymous;
        info!("logged out");
    }

    fn begin_resolving(&self, token: String) -> u64 {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.state = State::Resolving { token };
        inner.generation
    }

    /// Run one resolution and commit its outcome, unless a newer token
    /// mutation happened while the request was in flight (last-initiated
    /// wins; stale results are discarded without touching state).
    async fn finish_resolving(
        &self,
        generation: u64,
        token: String,
    ) -> Result<Identity, AuthError> {
        let outcome = self.backend.resolve(&token).await;

        let mut inner = self.inner.write();
        if inner.generation != generation {
            debug!("discarding resolution result for a superseded token");
            return Err(AuthError::Superseded);
        }

        match outcome {
            Ok(identity) => {
                self.store.save(&token, identity.role);
                inner.state = State::Authenticated {
                    token,
                    identity: identity.clone(),
                };
                Ok(identity)
            }
            Err(err) => {
                warn!("token validation failed, failing closed");
                self.store.clear();
                inner.state = State::Anonymous;
                Err(err)
            }
        }
    }
}
