//! Method-level role policy.
//!
//! Every call runs through [`AuthInterceptor::authorize`] before its handler:
//!
//! 1. methods absent from the [`RolePolicy`] are open to anyone;
//! 2. otherwise metadata must be present and carry an `authorization` token;
//! 3. the token must verify;
//! 4. the token's role must be in the method's allowed set.
//!
//! Streams are authorized once, before the handler starts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use pcbook_proto::methods;
use tonic::Status;
use tonic::metadata::MetadataMap;
use tracing::{debug, warn};

use super::claims::{Claims, Role};
use super::jwt::{TokenError, TokenVerifier};

pub const AUTHORIZATION_KEY: &str = "authorization";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("metadata is not provided")]
    MissingMetadata,

    #[error("authorization token is not provided")]
    MissingToken,

    #[error("access token is invalid: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("no permission to access this RPC")]
    PermissionDenied,

    #[error("request carries no method tag")]
    UntaggedMethod,
}

impl From<AuthError> for Status {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingMetadata | AuthError::MissingToken | AuthError::InvalidToken(_) => {
                Status::unauthenticated(e.to_string())
            }
            AuthError::PermissionDenied => Status::permission_denied(e.to_string()),
            AuthError::UntaggedMethod => Status::internal(e.to_string()),
        }
    }
}

/// Fully qualified method path to the roles allowed to call it.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    rules: HashMap<String, HashSet<Role>>,
}

impl RolePolicy {
    /// A policy with no rules: every method is open.
    pub fn open() -> Self {
        Self::default()
    }

    /// Admins create laptops and upload images; admins and users rate.
    /// Search and login stay open.
    pub fn standard() -> Self {
        Self::open()
            .allow(methods::METHOD_CREATE_LAPTOP, &[Role::Admin])
            .allow(methods::METHOD_UPLOAD_IMAGE, &[Role::Admin])
            .allow(methods::METHOD_RATE_LAPTOP, &[Role::Admin, Role::User])
    }

    /// Restrict `method` to `roles`, replacing any earlier rule.
    #[must_use]
    pub fn allow(mut self, method: &str, roles: &[Role]) -> Self {
        self.rules
            .insert(method.to_string(), roles.iter().copied().collect());
        self
    }

    /// Allowed roles for `method`, or `None` if it is open.
    pub fn roles_for(&self, method: &str) -> Option<&HashSet<Role>> {
        self.rules.get(method)
    }
}

/// Verifies bearer tokens against a [`RolePolicy`].
#[derive(Clone)]
pub struct AuthInterceptor {
    verifier: Arc<dyn TokenVerifier>,
    policy: RolePolicy,
}

impl AuthInterceptor {
    pub fn new(verifier: Arc<dyn TokenVerifier>, policy: RolePolicy) -> Self {
        Self { verifier, policy }
    }

    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    /// Decide whether a call to `method` may proceed.
    ///
    /// Returns `Ok(None)` for open methods and `Ok(Some(claims))` once a
    /// protected method has been authorized.
    pub fn authorize(&self, method: &str, metadata: &MetadataMap) -> Result<Option<Claims>, AuthError> {
        let Some(allowed) = self.policy.roles_for(method) else {
            debug!(method, "Open method, skipping auth");
            return Ok(None);
        };

        let result = self.check(allowed, metadata);
        match &result {
            Ok(claims) => debug!(method, username = %claims.username, role = %claims.role, "Authorized"),
            Err(e) => warn!(method, error = %e, "Rejected call"),
        }
        result.map(Some)
    }

    fn check(&self, allowed: &HashSet<Role>, metadata: &MetadataMap) -> Result<Claims, AuthError> {
        if metadata.is_empty() {
            return Err(AuthError::MissingMetadata);
        }
        let token = bearer_token(metadata).ok_or(AuthError::MissingToken)?;
        let claims = self.verifier.verify(token)?;
        if !allowed.contains(&claims.role) {
            return Err(AuthError::PermissionDenied);
        }
        Ok(claims)
    }
}

/// The `authorization` value, with an optional `Bearer ` prefix stripped.
fn bearer_token(metadata: &MetadataMap) -> Option<&str> {
    let raw = metadata.get(AUTHORIZATION_KEY)?.to_str().ok()?.trim();
    let token = match raw.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => raw,
    };
    (!token.is_empty()).then_some(token)
}
