//! Tests for `AuthService` gRPC implementation.

use std::sync::Arc;
use std::time::Duration;

use tonic::{Code, Request};

use pcbook_proto::v1::LoginRequest;
use pcbook_proto::v1::auth_service_server::AuthService;

use super::auth_svc::AuthServiceImpl;
use crate::auth::{Role, TokenManager};
use crate::storage::{InMemoryUserStore, StoreError, User, UserStore};

fn setup() -> (AuthServiceImpl, Arc<TokenManager>) {
    let users = InMemoryUserStore::new();
    users
        .save(&User::new("user1", "123456", Role::Admin).unwrap())
        .unwrap();
    users
        .save(&User::new("user2", "123456", Role::User).unwrap())
        .unwrap();
    let jwt = Arc::new(TokenManager::new(b"test-secret", Duration::from_secs(900)));
    let svc = AuthServiceImpl::new(Arc::new(users), Arc::clone(&jwt));
    (svc, jwt)
}

fn login_request(username: &str, password: &str) -> Request<LoginRequest> {
    Request::new(LoginRequest {
        username: username.into(),
        password: password.into(),
    })
}

struct BrokenUserStore;

impl UserStore for BrokenUserStore {
    fn save(&self, _user: &User) -> Result<(), StoreError> {
        Err(StoreError::Poisoned)
    }

    fn find(&self, _username: &str) -> Result<Option<User>, StoreError> {
        Err(StoreError::Poisoned)
    }
}

#[tokio::test]
async fn login_issues_token_with_role() {
    let (svc, jwt) = setup();

    let resp = svc
        .login(login_request("user1", "123456"))
        .await
        .unwrap()
        .into_inner();

    let claims = jwt.verify(&resp.access_token).unwrap();
    assert_eq!(claims.username, "user1");
    assert_eq!(claims.role, Role::Admin);
}

#[tokio::test]
async fn standard_user_gets_user_role() {
    let (svc, jwt) = setup();
    let token = svc
        .login(login_request("user2", "123456"))
        .await
        .unwrap()
        .into_inner()
        .access_token;
    assert_eq!(jwt.verify(&token).unwrap().role, Role::User);
}

#[tokio::test]
async fn login_wrong_password() {
    let (svc, _jwt) = setup();

    let err = svc
        .login(login_request("user1", "654321"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Code::NotFound);
    assert_eq!(err.message(), "incorrect username/password");
}

#[tokio::test]
async fn unknown_user_looks_like_wrong_password() {
    let (svc, _jwt) = setup();

    let unknown = svc.login(login_request("nobody", "123456")).await.unwrap_err();
    let wrong = svc.login(login_request("user1", "nope")).await.unwrap_err();

    assert_eq!(unknown.code(), wrong.code());
    assert_eq!(unknown.message(), wrong.message());
}

#[tokio::test]
async fn empty_credentials_are_rejected() {
    let (svc, _jwt) = setup();
    let err = svc.login(login_request("", "")).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn store_failure_is_internal() {
    let jwt = Arc::new(TokenManager::new(b"test-secret", Duration::from_secs(900)));
    let svc = AuthServiceImpl::new(Arc::new(BrokenUserStore), jwt);

    let err = svc
        .login(login_request("user1", "123456"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Internal);
}
