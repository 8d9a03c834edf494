//! Console API Client
//! Mission: Speak the backend's auth and admin contract over HTTP

use crate::models::Config;
use crate::session::errors::AuthError;
use crate::session::models::{Identity, Role, TokenGrant};
use crate::session::resolver::AuthBackend;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the console backend.
///
/// Auth operations map failures into the session error taxonomy (the caller
/// never sees transport detail, only the collapsed outcome); admin and
/// password-reset operations report failures with full context since they
/// are surfaced directly to the operator.
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("oppconsole/0.1")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.api_base_url,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Reset a user's password. Consumed by the reset form flow, not by the
    /// session machine.
    pub async fn reset_password(&self, username: &str, new_password: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.url("/api/auth/reset_password"))
            .json(&ResetPasswordBody {
                username,
                new_password,
            })
            .send()
            .await
            .context("Password reset request failed")?;
        expect_success(resp, "Password reset").await?;
        Ok(())
    }

    // Admin endpoints. The bearer token comes from the caller's session; the
    // server enforces the admin role and answers 403 otherwise.

    pub async fn list_users(&self, token: &str) -> Result<Vec<UserRecord>> {
        let resp = self
            .http
            .get(self.url("/api/auth/admin/users"))
            .bearer_auth(token)
            .send()
            .await
            .context("User list request failed")?;
        let resp = expect_success(resp, "User list").await?;
        resp.json::<Vec<UserRecord>>()
            .await
            .context("Failed to parse user list response")
    }

    pub async fn create_user(
        &self,
        token: &str,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<()> {
        let resp = self
            .http
            .post(self.url("/api/auth/admin/create_user"))
            .bearer_auth(token)
            .json(&CreateUserBody {
                username,
                password,
                role,
            })
            .send()
            .await
            .context("User creation request failed")?;
        expect_success(resp, "User creation").await?;
        debug!(username, "user created");
        Ok(())
    }

    pub async fn set_role(&self, token: &str, username: &str, role: Role) -> Result<()> {
        let resp = self
            .http
            .put(self.url(&format!("/api/auth/admin/users/{}/role", username)))
            .bearer_auth(token)
            .json(&RoleBody { role })
            .send()
            .await
            .context("Role update request failed")?;
        expect_success(resp, "Role update").await?;
        Ok(())
    }

    pub async fn delete_user(&self, token: &str, username: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/auth/admin/users/{}", username)))
            .bearer_auth(token)
            .send()
            .await
            .context("User deletion request failed")?;
        expect_success(resp, "User deletion").await?;
        Ok(())
    }

    pub async fn bulk_set_role(&self, token: &str, usernames: &[String], role: Role) -> Result<()> {
        let resp = self
            .http
            .put(self.url("/api/auth/admin/users/bulk_role"))
            .bearer_auth(token)
            .json(&BulkRoleBody { usernames, role })
            .send()
            .await
            .context("Bulk role update request failed")?;
        expect_success(resp, "Bulk role update").await?;
        Ok(())
    }

    pub async fn bulk_delete(&self, token: &str, usernames: &[String]) -> Result<()> {
        let resp = self
            .http
            .delete(self.url("/api/auth/admin/users/bulk_delete"))
            .bearer_auth(token)
            .json(&BulkDeleteBody { usernames })
            .send()
            .await
            .context("Bulk deletion request failed")?;
        expect_success(resp, "Bulk deletion").await?;
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn acquire_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenGrant, AuthError> {
        let resp = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&CredentialsBody { username, password })
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => match resp.json::<LoginResponse>().await {
                Ok(body) => Ok(TokenGrant {
                    token: body.access_token,
                    role: body.role,
                }),
                Err(err) => {
                    warn!(error = %err, "malformed login response");
                    Err(AuthError::Authentication)
                }
            },
            Ok(resp) => {
                warn!(status = %resp.status(), username, "login rejected");
                Err(AuthError::Authentication)
            }
            Err(err) => {
                warn!(error = %err, "login request failed");
                Err(AuthError::Authentication)
            }
        }
    }

    async fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let resp = self
            .http
            .post(self.url("/api/auth/register"))
            .json(&CredentialsBody { username, password })
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => {
                let status = resp.status();
                let reason = resp
                    .json::<ApiErrorBody>()
                    .await
                    .map(|body| body.error)
                    .unwrap_or_else(|_| format!("rejected with status {}", status));
                warn!(%status, username, "registration rejected");
                Err(AuthError::Registration(reason))
            }
            Err(err) => {
                warn!(error = %err, "registration request failed");
                Err(AuthError::Registration(
                    "registration request failed".to_string(),
                ))
            }
        }
    }

    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        let resp = self
            .http
            .get(self.url("/api/auth/me"))
            .bearer_auth(token)
            .send()
            .await;

        // Every failure mode collapses to one outcome: an unconfirmable
        // token invalidates the session whether the server said 401 or
        // never answered at all.
        match resp {
            Ok(resp) if resp.status().is_success() => {
                resp.json::<Identity>().await.map_err(|err| {
                    warn!(error = %err, "malformed identity response");
                    AuthError::Resolution
                })
            }
            Ok(resp) => {
                debug!(status = %resp.status(), "token validation rejected");
                Err(AuthError::Resolution)
            }
            Err(err) => {
                warn!(error = %err, "identity request failed");
                Err(AuthError::Resolution)
            }
        }
    }
}

async fn expect_success(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    bail!("{} failed ({}): {}", what, status, text)
}

// Wire types

#[derive(Debug, Serialize)]
struct CredentialsBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    role: Role,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct ResetPasswordBody<'a> {
    username: &'a str,
    new_password: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateUserBody<'a> {
    username: &'a str,
    password: &'a str,
    role: Role,
}

#[derive(Debug, Serialize)]
struct RoleBody {
    role: Role,
}

#[derive(Debug, Serialize)]
struct BulkRoleBody<'a> {
    usernames: &'a [String],
    role: Role,
}

#[derive(Debug, Serialize)]
struct BulkDeleteBody<'a> {
    usernames: &'a [String],
}

/// Row in the admin user listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub role: Role,
    pub created_at: Option<String>,
    pub last_signin: Option<String>,
}
