//! Integration tests for the session core and API client.
//!
//! Each test spins an in-process stub of the console auth API and drives the
//! real `ApiClient`/`SessionManager` against it over HTTP, so the wire
//! contract (paths, bodies, bearer header, status codes) is exercised
//! end to end.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use oppconsole::api::ApiClient;
use oppconsole::session::{
    decide, Access, AuthError, CredentialStore, Role, SessionManager, SessionStatus, ViewPolicy,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Clone)]
struct StubState(Arc<Mutex<StubInner>>);

#[derive(Default)]
struct StubInner {
    users: HashMap<String, StubUser>,
    tokens: HashMap<String, String>,
    next_id: i64,
    token_counter: u64,
}

struct StubUser {
    id: i64,
    password: String,
    role: String,
}

#[derive(Deserialize)]
struct Creds {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct CreateUserBody {
    username: String,
    password: String,
    role: String,
}

#[derive(Deserialize)]
struct RoleBody {
    role: String,
}

#[derive(Deserialize)]
struct BulkRoleBody {
    usernames: Vec<String>,
    role: String,
}

#[derive(Deserialize)]
struct BulkDeleteBody {
    usernames: Vec<String>,
}

#[derive(Deserialize)]
struct ResetBody {
    username: String,
    new_password: String,
}

fn authed_role(inner: &StubInner, headers: &HeaderMap) -> Option<(String, String)> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?;
    let username = inner.tokens.get(token)?;
    let user = inner.users.get(username)?;
    Some((username.clone(), user.role.clone()))
}

fn forbidden() -> (StatusCode, Json<Value>) {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"error": "Admin access required"})),
    )
}

async fn login(
    State(state): State<StubState>,
    Json(body): Json<Creds>,
) -> (StatusCode, Json<Value>) {
    let mut inner = state.0.lock().unwrap();
    let role = match inner.users.get(&body.username) {
        Some(user) if user.password == body.password => user.role.clone(),
        Some(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid password"})),
            )
        }
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "User not found"})),
            )
        }
    };
    inner.token_counter += 1;
    let token = format!("tok-{}", inner.token_counter);
    inner.tokens.insert(token.clone(), body.username.clone());
    (
        StatusCode::OK,
        Json(json!({"access_token": token, "role": role})),
    )
}

async fn register(
    State(state): State<StubState>,
    Json(body): Json<Creds>,
) -> (StatusCode, Json<Value>) {
    let mut inner = state.0.lock().unwrap();
    if inner.users.contains_key(&body.username) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "username already exists"})),
        );
    }
    inner.next_id += 1;
    let id = inner.next_id;
    inner.users.insert(
        body.username,
        StubUser {
            id,
            password: body.password,
            role: "user".to_string(),
        },
    );
    (StatusCode::OK, Json(json!({"message": "User signed up"})))
}

async fn me(State(state): State<StubState>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let inner = state.0.lock().unwrap();
    match authed_role(&inner, &headers) {
        Some((username, role)) => {
            let user = inner.users.get(&username).unwrap();
            (
                StatusCode::OK,
                Json(json!({"id": user.id, "username": username, "role": role})),
            )
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid token"})),
        ),
    }
}

async fn reset_password(
    State(state): State<StubState>,
    Json(body): Json<ResetBody>,
) -> (StatusCode, Json<Value>) {
    let mut inner = state.0.lock().unwrap();
    match inner.users.get_mut(&body.username) {
        Some(user) => {
            user.password = body.new_password;
            (
                StatusCode::OK,
                Json(json!({"message": "Password reset successful"})),
            )
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "User not found"})),
        ),
    }
}

async fn list_users(
    State(state): State<StubState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let inner = state.0.lock().unwrap();
    match authed_role(&inner, &headers) {
        Some((_, role)) if role == "admin" => {}
        _ => return forbidden(),
    }
    let users: Vec<Value> = inner
        .users
        .iter()
        .map(|(username, user)| {
            json!({
                "username": username,
                "role": user.role,
                "created_at": null,
                "last_signin": null,
            })
        })
        .collect();
    (StatusCode::OK, Json(Value::Array(users)))
}

async fn create_user(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<CreateUserBody>,
) -> (StatusCode, Json<Value>) {
    let mut inner = state.0.lock().unwrap();
    match authed_role(&inner, &headers) {
        Some((_, role)) if role == "admin" => {}
        _ => return forbidden(),
    }
    if inner.users.contains_key(&body.username) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "username already exists"})),
        );
    }
    inner.next_id += 1;
    let id = inner.next_id;
    inner.users.insert(
        body.username,
        StubUser {
            id,
            password: body.password,
            role: body.role,
        },
    );
    (StatusCode::OK, Json(json!({"message": "User created"})))
}

async fn set_role(
    State(state): State<StubState>,
    Path(username): Path<String>,
    headers: HeaderMap,
    Json(body): Json<RoleBody>,
) -> (StatusCode, Json<Value>) {
    let mut inner = state.0.lock().unwrap();
    match authed_role(&inner, &headers) {
        Some((_, role)) if role == "admin" => {}
        _ => return forbidden(),
    }
    match inner.users.get_mut(&username) {
        Some(user) => {
            user.role = body.role;
            (StatusCode::OK, Json(json!({"message": "Role updated"})))
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "User not found"})),
        ),
    }
}

async fn delete_user(
    State(state): State<StubState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let mut inner = state.0.lock().unwrap();
    match authed_role(&inner, &headers) {
        Some((_, role)) if role == "admin" => {}
        _ => return forbidden(),
    }
    match inner.users.remove(&username) {
        Some(_) => (StatusCode::OK, Json(json!({"message": "User deleted"}))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "User not found"})),
        ),
    }
}

async fn bulk_role(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<BulkRoleBody>,
) -> (StatusCode, Json<Value>) {
    let mut inner = state.0.lock().unwrap();
    match authed_role(&inner, &headers) {
        Some((_, role)) if role == "admin" => {}
        _ => return forbidden(),
    }
    let mut updated = 0;
    for username in &body.usernames {
        if let Some(user) = inner.users.get_mut(username) {
            user.role = body.role.clone();
            updated += 1;
        }
    }
    (
        StatusCode::OK,
        Json(json!({"message": format!("{} users updated", updated)})),
    )
}

async fn bulk_delete(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<BulkDeleteBody>,
) -> (StatusCode, Json<Value>) {
    let mut inner = state.0.lock().unwrap();
    match authed_role(&inner, &headers) {
        Some((_, role)) if role == "admin" => {}
        _ => return forbidden(),
    }
    let mut deleted = 0;
    for username in &body.usernames {
        if inner.users.remove(username).is_some() {
            deleted += 1;
        }
    }
    (
        StatusCode::OK,
        Json(json!({"message": format!("{} users deleted", deleted)})),
    )
}

async fn start_stub() -> (String, StubState) {
    let state = StubState(Arc::new(Mutex::new(StubInner::default())));
    seed_user(&state, "admin", "admin123", "admin");

    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/me", get(me))
        .route("/api/auth/reset_password", post(reset_password))
        .route("/api/auth/admin/users", get(list_users))
        .route("/api/auth/admin/create_user", post(create_user))
        .route("/api/auth/admin/users/bulk_role", put(bulk_role))
        .route("/api/auth/admin/users/bulk_delete", delete(bulk_delete))
        .route("/api/auth/admin/users/:username/role", put(set_role))
        .route("/api/auth/admin/users/:username", delete(delete_user))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

fn seed_user(state: &StubState, username: &str, password: &str, role: &str) {
    let mut inner = state.0.lock().unwrap();
    inner.next_id += 1;
    let id = inner.next_id;
    inner.users.insert(
        username.to_string(),
        StubUser {
            id,
            password: password.to_string(),
            role: role.to_string(),
        },
    );
}

fn revoke_all_tokens(state: &StubState) {
    state.0.lock().unwrap().tokens.clear();
}

fn build_manager(base_url: &str, dir: &std::path::Path) -> (Arc<ApiClient>, SessionManager) {
    let client = Arc::new(ApiClient::new(base_url, Duration::from_secs(5)));
    let manager = SessionManager::new(client.clone(), CredentialStore::new(dir));
    (client, manager)
}

#[tokio::test]
async fn signup_then_restart_then_revocation() {
    let (base_url, stub) = start_stub().await;
    let temp = TempDir::new().unwrap();

    // Fresh account signs up and lands authenticated
    let (_, manager) = build_manager(&base_url, temp.path());
    let identity = manager.signup("carol", "pw").await.unwrap();
    assert_eq!(identity.username, "carol");
    assert_eq!(identity.role, Role::User);
    assert_eq!(manager.session().status, SessionStatus::Authenticated);

    // A new process over the same state dir restores the session
    let (_, restarted) = build_manager(&base_url, temp.path());
    restarted.bootstrap().await;
    let session = restarted.session();
    assert_eq!(session.status, SessionStatus::Authenticated);
    assert_eq!(session.identity.unwrap().username, "carol");

    // Server-side revocation downgrades the next start to anonymous and
    // clears the stored credential
    revoke_all_tokens(&stub);
    let (_, revoked) = build_manager(&base_url, temp.path());
    revoked.bootstrap().await;
    assert_eq!(revoked.session().status, SessionStatus::Anonymous);
    assert_eq!(CredentialStore::new(temp.path()).load(), (None, None));
    assert_eq!(
        decide(&revoked.session(), ViewPolicy::SignedIn),
        Access::RedirectToLogin
    );
}

#[tokio::test]
async fn bad_password_is_rejected_without_session_mutation() {
    let (base_url, _stub) = start_stub().await;
    let temp = TempDir::new().unwrap();
    let (_, manager) = build_manager(&base_url, temp.path());

    let err = manager.login("admin", "wrong").await.unwrap_err();
    assert_eq!(err, AuthError::Authentication);
    assert_eq!(manager.session().status, SessionStatus::Anonymous);
    assert_eq!(CredentialStore::new(temp.path()).load(), (None, None));
}

#[tokio::test]
async fn duplicate_registration_surfaces_the_server_reason() {
    let (base_url, _stub) = start_stub().await;
    let temp = TempDir::new().unwrap();
    let (_, manager) = build_manager(&base_url, temp.path());

    manager.signup("carol", "pw").await.unwrap();
    manager.logout();

    let err = manager.signup("carol", "other").await.unwrap_err();
    match err {
        AuthError::Registration(reason) => assert!(reason.contains("already exists")),
        other => panic!("expected Registration, got {:?}", other),
    }
}

#[tokio::test]
async fn admin_session_can_manage_users() {
    let (base_url, _stub) = start_stub().await;
    let temp = TempDir::new().unwrap();
    let (client, manager) = build_manager(&base_url, temp.path());

    let identity = manager.login("admin", "admin123").await.unwrap();
    assert_eq!(identity.role, Role::Admin);
    let session = manager.session();
    assert_eq!(
        decide(&session, ViewPolicy::Role(Role::Admin)),
        Access::Render
    );
    let token = session.token.unwrap();

    client
        .create_user(&token, "dave", "pw", Role::User)
        .await
        .unwrap();
    client
        .create_user(&token, "erin", "pw", Role::User)
        .await
        .unwrap();

    let users = client.list_users(&token).await.unwrap();
    assert_eq!(users.len(), 3);

    client.set_role(&token, "dave", Role::Admin).await.unwrap();
    let users = client.list_users(&token).await.unwrap();
    let dave = users.iter().find(|u| u.username == "dave").unwrap();
    assert_eq!(dave.role, Role::Admin);

    client
        .bulk_set_role(
            &token,
            &["dave".to_string(), "erin".to_string()],
            Role::User,
        )
        .await
        .unwrap();
    client.delete_user(&token, "erin").await.unwrap();
    client
        .bulk_delete(&token, &["dave".to_string()])
        .await
        .unwrap();

    let users = client.list_users(&token).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "admin");
}

#[tokio::test]
async fn non_admin_session_is_refused_by_admin_endpoints() {
    let (base_url, _stub) = start_stub().await;
    let temp = TempDir::new().unwrap();
    let (client, manager) = build_manager(&base_url, temp.path());

    manager.signup("carol", "pw").await.unwrap();
    let session = manager.session();
    // Guard and server agree: the view is denied and the endpoint refuses
    assert_eq!(
        decide(&session, ViewPolicy::Role(Role::Admin)),
        Access::Deny
    );
    let token = session.token.unwrap();
    let err = client.list_users(&token).await.unwrap_err();
    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn password_reset_takes_effect_on_next_login() {
    let (base_url, _stub) = start_stub().await;
    let temp = TempDir::new().unwrap();
    let (client, manager) = build_manager(&base_url, temp.path());

    manager.signup("carol", "old-pw").await.unwrap();
    manager.logout();

    client.reset_password("carol", "new-pw").await.unwrap();

    assert_eq!(
        manager.login("carol", "old-pw").await.unwrap_err(),
        AuthError::Authentication
    );
    let identity = manager.login("carol", "new-pw").await.unwrap();
    assert_eq!(identity.username, "carol");
}
