//! gRPC server implementations for the PC Book catalog.

pub mod auth_svc;
pub mod interceptor;
pub mod laptop_svc;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod auth_svc_tests;

use std::sync::Arc;

use tonic::transport::Server;
use tonic::transport::server::Router;
use tracing::info;

use pcbook_proto::v1::auth_service_server::AuthServiceServer;
use pcbook_proto::v1::laptop_service_server::LaptopServiceServer;

pub use auth_svc::AuthServiceImpl;
pub use interceptor::{RpcMethod, RpcMethodTagged, auth_interceptor, caller};
pub use laptop_svc::LaptopServiceImpl;

use crate::auth::{AuthInterceptor, RolePolicy, TokenManager, TokenVerifier};
use crate::config::{ConfigError, ServerConfig, seed_users};
use crate::storage::{
    DiskImageStore, ImageStore, InMemoryLaptopStore, InMemoryRatingStore, InMemoryUserStore,
    LaptopStore, RatingStore, StoreError, UserStore,
};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to open image store: {0}")]
    ImageStore(#[from] StoreError),
}

/// Both services plus the interceptor guarding them, ready to be mounted.
pub struct PcbookServer {
    laptop: LaptopServiceImpl,
    auth_svc: AuthServiceImpl,
    auth: AuthInterceptor,
}

impl PcbookServer {
    /// Build stores, seed accounts and wire services from `config`.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let users = Arc::new(InMemoryUserStore::new());
        seed_users(users.as_ref(), &config.seed_users)?;

        let laptops: Arc<dyn LaptopStore> = Arc::new(InMemoryLaptopStore::new());
        let ratings: Arc<dyn RatingStore> = Arc::new(InMemoryRatingStore::new());
        let images: Arc<dyn ImageStore> = Arc::new(DiskImageStore::open(&config.image_dir)?);
        let jwt = Arc::new(TokenManager::new(
            config.jwt_secret.as_bytes(),
            config.token_ttl(),
        ));

        let laptop = LaptopServiceImpl::new(laptops, images, ratings)
            .with_max_image_bytes(config.max_image_bytes)
            .with_score_range(config.score_range);
        let auth_svc = AuthServiceImpl::new(users as Arc<dyn UserStore>, Arc::clone(&jwt));
        let auth = AuthInterceptor::new(jwt as Arc<dyn TokenVerifier>, RolePolicy::standard());

        info!(
            seeded = config.seed_users.len(),
            image_dir = %config.image_dir.display(),
            max_image_bytes = config.max_image_bytes,
            "PC Book services ready"
        );
        Ok(Self {
            laptop,
            auth_svc,
            auth,
        })
    }

    /// Mount both services on `builder`, each behind the method tagger and
    /// the auth interceptor.
    pub fn into_router(self, builder: &mut Server) -> Router {
        let check = auth_interceptor(self.auth);
        builder
            .add_service(RpcMethodTagged::new(AuthServiceServer::with_interceptor(
                self.auth_svc,
                check.clone(),
            )))
            .add_service(RpcMethodTagged::new(LaptopServiceServer::with_interceptor(
                self.laptop,
                check,
            )))
    }
}
