//! Login, token refresh and the bearer-token interceptor.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tonic::metadata::MetadataValue;
use tonic::service::Interceptor;
use tonic::transport::Channel;
use tonic::{Request, Status};
use tracing::{debug, info, warn};

use pcbook_proto::v1::LoginRequest;
use pcbook_proto::v1::auth_service_client::AuthServiceClient;

use crate::error::ClientError;

/// Delay before retrying a failed refresh.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Logs in with a fixed username and password.
#[derive(Clone)]
pub struct AuthClient {
    client: AuthServiceClient<Channel>,
    username: String,
    password: String,
    request_timeout: Duration,
}

impl AuthClient {
    pub fn new(channel: Channel, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client: AuthServiceClient::new(channel),
            username: username.into(),
            password: password.into(),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Fetch a fresh access token.
    pub async fn login(&self) -> Result<String, ClientError> {
        let mut request = Request::new(LoginRequest {
            username: self.username.clone(),
            password: self.password.clone(),
        });
        request.set_timeout(self.request_timeout);

        let response = self.client.clone().login(request).await?;
        debug!(username = %self.username, "Logged in");
        Ok(response.into_inner().access_token)
    }
}

/// Shared, swappable access token.
#[derive(Debug, Clone, Default)]
pub struct TokenSource {
    token: Arc<RwLock<String>>,
}

impl TokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token.into())),
        }
    }

    /// Current token; empty if none has been obtained yet.
    pub fn get(&self) -> String {
        self.token
            .read()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    pub fn set(&self, token: String) {
        if let Ok(mut current) = self.token.write() {
            *current = token;
        }
    }
}

/// Stops the refresh task when dropped.
#[derive(Debug)]
pub struct RefreshHandle(JoinHandle<()>);

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Re-login every `interval`, storing each new token in `tokens`.
///
/// A failed attempt is retried after one second.
pub fn spawn_refresh(auth: AuthClient, tokens: TokenSource, interval: Duration) -> RefreshHandle {
    RefreshHandle(tokio::spawn(async move {
        let mut wait = interval;
        loop {
            tokio::time::sleep(wait).await;
            match auth.login().await {
                Ok(token) => {
                    tokens.set(token);
                    info!(next_in = ?interval, "Access token refreshed");
                    wait = interval;
                }
                Err(e) => {
                    warn!(error = %e, "Token refresh failed, retrying");
                    wait = RETRY_DELAY;
                }
            }
        }
    }))
}

/// Attaches `authorization: Bearer <token>` to every outgoing call.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    tokens: TokenSource,
}

impl BearerAuth {
    pub const fn new(tokens: TokenSource) -> Self {
        Self { tokens }
    }
}

impl Interceptor for BearerAuth {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let token = self.tokens.get();
        if !token.is_empty() {
            let value = MetadataValue::try_from(format!("Bearer {token}"))
                .map_err(|_| Status::unauthenticated("access token is not valid metadata"))?;
            request.metadata_mut().insert("authorization", value);
        }
        Ok(request)
    }
}
