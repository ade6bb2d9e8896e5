//! Auth interceptor wiring for gRPC services.
//!
//! A tonic interceptor only sees metadata and extensions, not the request
//! path. [`RpcMethodTagged`] sits outside the intercepted service and copies
//! the path into an [`RpcMethod`] extension so the policy can be keyed on it.

use tonic::codegen::{Context, Poll, Service, http};
use tonic::server::NamedService;
use tonic::{Request, Status};

use crate::auth::{AuthError, AuthInterceptor, Claims};

/// Fully qualified path of the RPC being called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcMethod(pub String);

impl RpcMethod {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Pass-through service that tags every request with its [`RpcMethod`].
#[derive(Debug, Clone)]
pub struct RpcMethodTagged<S> {
    inner: S,
}

impl<S> RpcMethodTagged<S> {
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S, B> Service<http::Request<B>> for RpcMethodTagged<S>
where
    S: Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let method = RpcMethod(req.uri().path().to_string());
        req.extensions_mut().insert(method);
        self.inner.call(req)
    }
}

impl<S: NamedService> NamedService for RpcMethodTagged<S> {
    const NAME: &'static str = S::NAME;
}

/// Build the interceptor closure that enforces `auth` on tagged requests.
///
/// Untagged requests are refused. Claims of an authorized caller are stored
/// in the request extensions for the handler.
pub fn auth_interceptor(
    auth: AuthInterceptor,
) -> impl Fn(Request<()>) -> Result<Request<()>, Status> + Clone {
    move |mut req: Request<()>| {
        let claims = {
            let method = req
                .extensions()
                .get::<RpcMethod>()
                .ok_or(AuthError::UntaggedMethod)?;
            auth.authorize(method.as_str(), req.metadata())?
        };
        if let Some(claims) = claims {
            req.extensions_mut().insert(claims);
        }
        Ok(req)
    }
}

/// Claims of the authorized caller, if the method required any.
pub fn caller<T>(req: &Request<T>) -> Option<&Claims> {
    req.extensions().get::<Claims>()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::time::Duration;

    use pcbook_proto::methods;
    use tonic::Code;
    use tonic::metadata::MetadataValue;

    use super::*;
    use crate::auth::{Role, RolePolicy, TokenManager, TokenVerifier};
    use crate::storage::User;

    /// Replies with the method tag it was handed.
    #[derive(Clone)]
    struct EchoTag;

    impl Service<http::Request<()>> for EchoTag {
        type Response = Option<String>;
        type Error = Infallible;
        type Future = std::future::Ready<Result<Option<String>, Infallible>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<()>) -> Self::Future {
            std::future::ready(Ok(req
                .extensions()
                .get::<RpcMethod>()
                .map(|m| m.0.clone())))
        }
    }

    fn jwt() -> Arc<TokenManager> {
        Arc::new(TokenManager::new(b"interceptor-secret", Duration::from_secs(60)))
    }

    fn closure(
        jwt: &Arc<TokenManager>,
    ) -> impl Fn(Request<()>) -> Result<Request<()>, Status> + Clone {
        auth_interceptor(AuthInterceptor::new(
            Arc::clone(jwt) as Arc<dyn TokenVerifier>,
            RolePolicy::standard(),
        ))
    }

    fn tagged(method: &str) -> Request<()> {
        let mut req = Request::new(());
        req.extensions_mut().insert(RpcMethod(method.to_string()));
        req
    }

    #[tokio::test]
    async fn tagger_records_request_path() {
        let mut svc = RpcMethodTagged::new(EchoTag);
        let req = http::Request::builder()
            .uri(format!("http://localhost{}", methods::METHOD_RATE_LAPTOP))
            .body(())
            .unwrap();

        let tag = svc.call(req).await.unwrap();
        assert_eq!(tag.as_deref(), Some(methods::METHOD_RATE_LAPTOP));
    }

    #[test]
    fn untagged_request_fails_closed() {
        let err = closure(&jwt())(Request::new(())).unwrap_err();
        assert_eq!(err.code(), Code::Internal);
    }

    #[test]
    fn open_method_passes_without_claims() {
        let req = closure(&jwt())(tagged(methods::METHOD_SEARCH_LAPTOP)).unwrap();
        assert!(caller(&req).is_none());
    }

    #[test]
    fn protected_method_without_token_is_rejected() {
        let mut req = tagged(methods::METHOD_UPLOAD_IMAGE);
        req.metadata_mut()
            .insert("x-trace", MetadataValue::from_static("1"));
        let err = closure(&jwt())(req).unwrap_err();
        assert_eq!(err.code(), Code::Unauthenticated);
    }

    #[test]
    fn authorized_claims_reach_the_handler() {
        let jwt = jwt();
        let token = jwt
            .issue(&User {
                username: "user2".into(),
                password_hash: String::new(),
                role: Role::User,
            })
            .unwrap();

        let mut req = tagged(methods::METHOD_RATE_LAPTOP);
        req.metadata_mut().insert(
            "authorization",
            MetadataValue::try_from(format!("Bearer {token}")).unwrap(),
        );

        let req = closure(&jwt)(req).unwrap();
        let claims = caller(&req).unwrap();
        assert_eq!(claims.username, "user2");
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn user_cannot_upload() {
        let jwt = jwt();
        let token = jwt
            .issue(&User {
                username: "user2".into(),
                password_hash: String::new(),
                role: Role::User,
            })
            .unwrap();

        let mut req = tagged(methods::METHOD_UPLOAD_IMAGE);
        req.metadata_mut()
            .insert("authorization", MetadataValue::try_from(token).unwrap());

        let err = closure(&jwt)(req).unwrap_err();
        assert_eq!(err.code(), Code::PermissionDenied);
    }
}
