//! AuthService gRPC implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{Span, error, info, instrument, warn};

use pcbook_proto::v1::auth_service_server::AuthService;
use pcbook_proto::v1::{LoginRequest, LoginResponse};

use crate::auth::{TokenManager, password};
use crate::storage::UserStore;

const BAD_CREDENTIALS: &str = "incorrect username/password";

#[derive(Clone)]
pub struct AuthServiceImpl {
    users: Arc<dyn UserStore>,
    jwt: Arc<TokenManager>,
}

impl AuthServiceImpl {
    pub fn new(users: Arc<dyn UserStore>, jwt: Arc<TokenManager>) -> Self {
        Self { users, jwt }
    }

    /// Check credentials and issue an access token.
    ///
    /// Unknown users and wrong passwords are indistinguishable to the caller.
    pub(crate) fn login_user(&self, username: &str, password: &str) -> Result<String, Status> {
        let user = self.users.find(username).map_err(|e| {
            error!(error = %e, "User lookup failed");
            Status::internal(format!("cannot find user: {e}"))
        })?;

        let user = match user {
            Some(user) if user.is_correct_password(password) => user,
            found => {
                if found.is_none() {
                    let _ = password::verify_decoy(password);
                }
                warn!(username, "Failed login attempt");
                return Err(Status::not_found(BAD_CREDENTIALS));
            }
        };

        let token = self.jwt.issue(&user).map_err(|e| {
            error!(error = %e, "Token creation failed");
            Status::internal(format!("cannot generate access token: {e}"))
        })?;

        info!(username = %user.username, role = %user.role, "User logged in");
        Ok(token)
    }
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "Login"))]
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();
        let svc = self.clone();
        let span = Span::current();
        let access_token = tokio::task::spawn_blocking(move || {
            span.in_scope(|| svc.login_user(&req.username, &req.password))
        })
        .await
        .map_err(|e| Status::internal(format!("login task failed: {e}")))??;
        Ok(Response::new(LoginResponse { access_token }))
    }
}
